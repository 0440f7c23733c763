//! Boundary to whatever presents the experiment
//!
//! The engine needs four primitives from a display/input library: the
//! current stick position, the keys pressed since the last poll, drawing,
//! and a blocking wait for a key. Rating, choice and free-text prompts are
//! the dialog widgets intake and the session layout need on top of that.
//! Invalid answers are asked again; only escape leaves a prompt early.
//!
//! Screens are driven frame by frame through [`next_frame`], which is the
//! only place escape is checked. Escape unwinds as [`AatError::Aborted`].

pub mod scripted;
pub mod simulated;

pub use scripted::{FrameInput, ScriptedFrontend};
pub use simulated::SimulatedFrontend;

use crate::core::error::{AatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    Return,
    Escape,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    /// Window colour from the settings document
    #[default]
    Normal,
    /// Wrong-direction feedback
    Error,
}

/// Anchor on the vertical screen axis, in normalized units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub f32);

impl Position {
    pub const TOP: Position = Position(0.5);
    pub const CENTER: Position = Position(0.0);
    pub const BOTTOM: Position = Position(-0.5);
    pub const HINT_UPPER: Position = Position(0.1);
    pub const HINT_LOWER: Position = Position(-0.1);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    Background(Background),
    Text {
        text: String,
        at: Position,
        /// Highlighted text (e.g. a satisfied joystick hint)
        emphasis: bool,
    },
    /// Stimulus image; `scale` is relative to the native size
    Image {
        path: String,
        scale: f32,
        rotation: f32,
    },
    /// Plain rectangle used in place of an image during practice
    Rect { scale: f32, rotation: f32 },
    /// Progress meter filled to `fraction` in [0, 1]
    Meter {
        fraction: f32,
        label: Option<String>,
    },
}

impl Drawable {
    pub fn text(text: impl Into<String>, at: Position) -> Self {
        Drawable::Text {
            text: text.into(),
            at,
            emphasis: false,
        }
    }

    pub fn emphasized(text: impl Into<String>, at: Position) -> Self {
        Drawable::Text {
            text: text.into(),
            at,
            emphasis: true,
        }
    }

    /// Rotation of a stimulus drawable, if this is one
    pub fn stimulus_rotation(&self) -> Option<f32> {
        match self {
            Drawable::Image { rotation, .. } | Drawable::Rect { rotation, .. } => Some(*rotation),
            _ => None,
        }
    }
}

pub trait Frontend {
    /// Vertical stick position in [-1, 1]; negative is push
    fn stick_y(&mut self) -> f32;

    fn trigger_pressed(&mut self) -> bool;

    /// Keys pressed since the previous poll
    fn poll_keys(&mut self) -> Vec<Key>;

    /// Queue a drawable for the current frame
    fn draw(&mut self, item: Drawable);

    /// Present the current frame and start the next one
    fn flip(&mut self) -> Result<()>;

    /// Block until one of `accepted` is pressed
    fn wait_for_key(&mut self, accepted: &[Key]) -> Result<Key>;

    /// Seconds since the frontend was created
    fn now(&self) -> f64;

    /// Ask for an integer rating in `min..=max`
    fn rate(&mut self, prompt: &str, min: u8, max: u8) -> Result<u8>;

    /// Ask for one of `options`; returns its index
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<usize>;

    /// Ask for a free-text answer; an empty answer means none
    fn enter_text(&mut self, prompt: &str, max_chars: usize) -> Result<String>;
}

/// Present the frame and poll input; escape aborts
pub fn next_frame<F: Frontend + ?Sized>(frontend: &mut F) -> Result<Vec<Key>> {
    frontend.flip()?;
    let keys = frontend.poll_keys();
    if keys.contains(&Key::Escape) {
        tracing::warn!("Escape pressed, aborting");
        return Err(AatError::Aborted);
    }
    Ok(keys)
}

/// Show `lines` until the continue key is pressed
pub fn show_until_continue<F: Frontend + ?Sized>(frontend: &mut F, lines: &[Drawable]) -> Result<()> {
    for line in lines {
        frontend.draw(line.clone());
    }
    frontend.flip()?;
    match frontend.wait_for_key(&[Key::Space, Key::Escape])? {
        Key::Escape => {
            tracing::warn!("Escape pressed, aborting");
            Err(AatError::Aborted)
        }
        _ => Ok(()),
    }
}

/// Redraw `lines` every frame for `secs` seconds
pub fn show_for<F: Frontend + ?Sized>(frontend: &mut F, lines: &[Drawable], secs: f64) -> Result<()> {
    let started = frontend.now();
    while frontend.now() - started < secs {
        for line in lines {
            frontend.draw(line.clone());
        }
        next_frame(frontend)?;
    }
    Ok(())
}

/// Ask for a rating until the answer lies in `min..=max`
pub fn ask_rating<F: Frontend + ?Sized>(frontend: &mut F, prompt: &str, min: u8, max: u8) -> Result<u8> {
    loop {
        let value = frontend.rate(prompt, min, max)?;
        if (min..=max).contains(&value) {
            return Ok(value);
        }
        tracing::warn!("Rating {} for '{}' is outside {}..={}, asking again", value, prompt, min, max);
    }
}

/// Ask for a choice among `options` until a valid one is picked
pub fn ask_choice<F: Frontend + ?Sized>(frontend: &mut F, prompt: &str, options: &[String]) -> Result<String> {
    if options.is_empty() {
        return Err(AatError::InvalidSelection(format!("nothing to choose for '{}'", prompt)));
    }
    loop {
        let index = frontend.choose(prompt, options)?;
        if let Some(choice) = options.get(index) {
            return Ok(choice.clone());
        }
        tracing::warn!("Choice {} out of {} options for '{}', asking again", index, options.len(), prompt);
    }
}

/// Ask for free text of at most `max_chars` characters, trimmed
pub fn ask_text<F: Frontend + ?Sized>(frontend: &mut F, prompt: &str, max_chars: usize) -> Result<String> {
    loop {
        let text = frontend.enter_text(prompt, max_chars)?;
        let text = text.trim();
        if text.chars().count() <= max_chars {
            return Ok(text.to_string());
        }
        tracing::warn!("Answer to '{}' is longer than {} characters, asking again", prompt, max_chars);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_aborts_frame_loop() {
        let mut frontend = ScriptedFrontend::new(60.0).with_frames(vec![
            FrameInput::at(0.0),
            FrameInput::at(0.0).with_keys(vec![Key::Escape]),
        ]);
        assert!(next_frame(&mut frontend).is_ok());
        assert!(matches!(next_frame(&mut frontend), Err(AatError::Aborted)));
    }

    #[test]
    fn test_show_for_runs_whole_duration() {
        let mut frontend = ScriptedFrontend::new(60.0);
        show_for(&mut frontend, &[Drawable::text("hello", Position::CENTER)], 0.5).unwrap();
        assert_eq!(frontend.frames_presented(), 30);
        assert_eq!(frontend.texts_containing("hello"), 30);
    }

    #[test]
    fn test_continue_screen_escape() {
        let mut frontend = ScriptedFrontend::new(60.0).with_keys(vec![Key::Escape]);
        let result = show_until_continue(&mut frontend, &[Drawable::text("x", Position::CENTER)]);
        assert!(matches!(result, Err(AatError::Aborted)));
    }

    #[test]
    fn test_choice_out_of_range_asked_again() {
        let mut frontend = ScriptedFrontend::new(60.0).with_choices(vec![5, 1]);
        let options = vec!["a".to_string(), "b".to_string()];
        assert_eq!(ask_choice(&mut frontend, "pick", &options).unwrap(), "b");
        assert_eq!(frontend.prompts().len(), 2);
    }

    #[test]
    fn test_choice_without_options_is_error() {
        let mut frontend = ScriptedFrontend::new(60.0);
        let result = ask_choice(&mut frontend, "pick", &[]);
        assert!(matches!(result, Err(AatError::InvalidSelection(_))));
    }

    #[test]
    fn test_rating_out_of_range_asked_again() {
        let mut frontend = ScriptedFrontend::new(60.0).with_ratings(vec![11, 42, 4]);
        assert_eq!(ask_rating(&mut frontend, "rate", 0, 10).unwrap(), 4);
        assert_eq!(frontend.prompts().len(), 3);
    }

    #[test]
    fn test_text_too_long_asked_again() {
        let mut frontend = ScriptedFrontend::new(60.0)
            .with_texts(vec!["x".repeat(20), "  short  ".to_string()]);
        assert_eq!(ask_text(&mut frontend, "own words", 10).unwrap(), "short");
    }
}
