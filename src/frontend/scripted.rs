//! Frontend that replays a fixed input script
//!
//! Each [`FrameInput`] is consumed by one `flip`. Once the script runs out
//! the last stick/trigger state is held. Blocking waits, ratings, choices and texts
//! come from their own queues and fall back to a neutral answer when empty,
//! so a test only scripts what it asserts on.

use std::collections::VecDeque;

use super::{Background, Drawable, Frontend, Key};
use crate::core::error::{AatError, Result};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameInput {
    pub y: f32,
    pub trigger: bool,
    pub keys: Vec<Key>,
}

impl FrameInput {
    pub fn at(y: f32) -> Self {
        Self {
            y,
            trigger: false,
            keys: Vec::new(),
        }
    }

    pub fn pressed(mut self) -> Self {
        self.trigger = true;
        self
    }

    pub fn with_keys(mut self, keys: Vec<Key>) -> Self {
        self.keys = keys;
        self
    }
}

#[derive(Debug)]
pub struct ScriptedFrontend {
    fps: f64,
    frames: VecDeque<FrameInput>,
    current: FrameInput,
    pending_keys: Vec<Key>,
    frame_count: u64,
    max_frames: u64,
    keys: VecDeque<Key>,
    ratings: VecDeque<u8>,
    choices: VecDeque<usize>,
    texts: VecDeque<String>,
    drawn: Vec<Drawable>,
    prompts: Vec<String>,
}

impl ScriptedFrontend {
    /// Frames beyond the script before the run is treated as stuck
    pub const DEFAULT_MAX_FRAMES: u64 = 2_000_000;

    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            frames: VecDeque::new(),
            current: FrameInput::default(),
            pending_keys: Vec::new(),
            frame_count: 0,
            max_frames: Self::DEFAULT_MAX_FRAMES,
            keys: VecDeque::new(),
            ratings: VecDeque::new(),
            choices: VecDeque::new(),
            texts: VecDeque::new(),
            drawn: Vec::new(),
            prompts: Vec::new(),
        }
    }

    pub fn with_frames(mut self, frames: Vec<FrameInput>) -> Self {
        self.frames.extend(frames);
        self
    }

    pub fn with_keys(mut self, keys: Vec<Key>) -> Self {
        self.keys.extend(keys);
        self
    }

    pub fn with_ratings(mut self, ratings: Vec<u8>) -> Self {
        self.ratings.extend(ratings);
        self
    }

    pub fn with_choices(mut self, choices: Vec<usize>) -> Self {
        self.choices.extend(choices);
        self
    }

    pub fn with_texts(mut self, texts: Vec<String>) -> Self {
        self.texts.extend(texts);
        self
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Append more frames to the script
    pub fn push_frames(&mut self, frames: impl IntoIterator<Item = FrameInput>) {
        self.frames.extend(frames);
    }

    pub fn frames_presented(&self) -> u64 {
        self.frame_count
    }

    pub fn drawn(&self) -> &[Drawable] {
        &self.drawn
    }

    /// Prompts shown through `rate`, `choose` and `enter_text`, in order
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn texts_containing(&self, needle: &str) -> usize {
        self.drawn
            .iter()
            .filter(|d| matches!(d, Drawable::Text { text, .. } if text.contains(needle)))
            .count()
    }

    pub fn error_backgrounds(&self) -> usize {
        self.drawn
            .iter()
            .filter(|d| matches!(d, Drawable::Background(Background::Error)))
            .count()
    }
}

impl Frontend for ScriptedFrontend {
    fn stick_y(&mut self) -> f32 {
        self.current.y
    }

    fn trigger_pressed(&mut self) -> bool {
        self.current.trigger
    }

    fn poll_keys(&mut self) -> Vec<Key> {
        std::mem::take(&mut self.pending_keys)
    }

    fn draw(&mut self, item: Drawable) {
        self.drawn.push(item);
    }

    fn flip(&mut self) -> Result<()> {
        self.frame_count += 1;
        match self.frames.pop_front() {
            Some(next) => {
                self.pending_keys.extend(next.keys.iter().copied());
                self.current = next;
            }
            None => {
                if self.frame_count > self.max_frames {
                    tracing::warn!("Input script exhausted after {} frames", self.frame_count);
                    return Err(AatError::Aborted);
                }
                self.current.keys.clear();
            }
        }
        Ok(())
    }

    fn wait_for_key(&mut self, accepted: &[Key]) -> Result<Key> {
        let Some(default) = accepted.first().copied() else {
            return Err(AatError::Config("wait_for_key needs at least one key".into()));
        };
        while let Some(key) = self.keys.pop_front() {
            if accepted.contains(&key) {
                return Ok(key);
            }
        }
        Ok(default)
    }

    fn now(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }

    fn rate(&mut self, prompt: &str, min: u8, _max: u8) -> Result<u8> {
        self.prompts.push(prompt.to_string());
        Ok(self.ratings.pop_front().unwrap_or(min))
    }

    fn choose(&mut self, prompt: &str, _options: &[String]) -> Result<usize> {
        self.prompts.push(prompt.to_string());
        Ok(self.choices.pop_front().unwrap_or(0))
    }

    fn enter_text(&mut self, prompt: &str, _max_chars: usize) -> Result<String> {
        self.prompts.push(prompt.to_string());
        Ok(self.texts.pop_front().unwrap_or_default())
    }
}
