//! A simulated participant for pilot runs without hardware
//!
//! The simulated participant rests with the stick centered, clicks the
//! trigger every few frames until a trial starts, and once a stimulus is on screen moves the stick in the
//! direction the stimulus is tilted (tilted left means push). With
//! probability `error_rate` a trial starts with a short move in the wrong
//! direction. Time is virtual: one `flip` advances the clock by one frame.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{Drawable, Frontend, Key};
use crate::core::error::Result;

const PRESS_AFTER_FRAMES: u32 = 3;
/// Resting click cycle: released for `PRESS_AFTER_FRAMES`, then held
const CLICK_CYCLE_FRAMES: u32 = 6;
const WRONG_DIRECTION_FRAMES: u32 = 12;
const WRONG_DIRECTION_LIMIT: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Resting { frames: u32 },
    Responding { direction: f32, wrong_frames: u32 },
}

#[derive(Debug)]
pub struct SimulatedFrontend {
    fps: f64,
    rng: ChaCha8Rng,
    error_rate: f64,
    /// Stick travel per frame while responding
    speed: f32,
    phase: Phase,
    y: f32,
    trigger: bool,
    frame_count: u64,
    stimulus_rotation: Option<f32>,
    trials_seen: u64,
}

impl SimulatedFrontend {
    pub fn new(fps: f64, seed: u64) -> Self {
        Self {
            fps,
            rng: ChaCha8Rng::seed_from_u64(seed),
            error_rate: 0.1,
            speed: 0.08,
            phase: Phase::Resting { frames: 0 },
            y: 0.0,
            trigger: false,
            frame_count: 0,
            stimulus_rotation: None,
            trials_seen: 0,
        }
    }

    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = error_rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.max(0.001);
        self
    }

    pub fn trials_seen(&self) -> u64 {
        self.trials_seen
    }

    fn step(&mut self, stimulus: Option<f32>) {
        self.phase = match (self.phase, stimulus) {
            (Phase::Resting { frames }, None) => {
                self.y = 0.0;
                self.trigger = (frames + 1) % CLICK_CYCLE_FRAMES >= PRESS_AFTER_FRAMES;
                Phase::Resting { frames: frames + 1 }
            }
            (Phase::Resting { .. }, Some(rotation)) => {
                self.trials_seen += 1;
                let direction = if rotation < 0.0 { -1.0 } else { 1.0 };
                let wrong_frames = if self.rng.gen_bool(self.error_rate) {
                    WRONG_DIRECTION_FRAMES
                } else {
                    0
                };
                Phase::Responding {
                    direction,
                    wrong_frames,
                }
            }
            (Phase::Responding { .. }, None) => {
                self.y = 0.0;
                self.trigger = false;
                Phase::Resting { frames: 0 }
            }
            (
                Phase::Responding {
                    direction,
                    wrong_frames,
                },
                Some(_),
            ) => {
                if wrong_frames > 0 {
                    self.y = (self.y - direction * self.speed)
                        .clamp(-WRONG_DIRECTION_LIMIT, WRONG_DIRECTION_LIMIT);
                    Phase::Responding {
                        direction,
                        wrong_frames: wrong_frames - 1,
                    }
                } else {
                    self.y = (self.y + direction * self.speed).clamp(-1.0, 1.0);
                    Phase::Responding {
                        direction,
                        wrong_frames: 0,
                    }
                }
            }
        };
    }
}

impl Frontend for SimulatedFrontend {
    fn stick_y(&mut self) -> f32 {
        self.y
    }

    fn trigger_pressed(&mut self) -> bool {
        self.trigger
    }

    fn poll_keys(&mut self) -> Vec<Key> {
        Vec::new()
    }

    fn draw(&mut self, item: Drawable) {
        if let Some(rotation) = item.stimulus_rotation() {
            self.stimulus_rotation = Some(rotation);
        }
    }

    fn flip(&mut self) -> Result<()> {
        self.frame_count += 1;
        let stimulus = self.stimulus_rotation.take();
        self.step(stimulus);
        Ok(())
    }

    fn wait_for_key(&mut self, accepted: &[Key]) -> Result<Key> {
        // Reading takes a moment
        self.frame_count += self.fps as u64;
        Ok(accepted.first().copied().unwrap_or(Key::Space))
    }

    fn now(&self) -> f64 {
        self.frame_count as f64 / self.fps
    }

    fn rate(&mut self, _prompt: &str, min: u8, max: u8) -> Result<u8> {
        Ok(self.rng.gen_range(min..=max))
    }

    fn choose(&mut self, _prompt: &str, options: &[String]) -> Result<usize> {
        if options.is_empty() {
            return Ok(0);
        }
        Ok(self.rng.gen_range(0..options.len()))
    }

    fn enter_text(&mut self, _prompt: &str, _max_chars: usize) -> Result<String> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_terminal(f: &mut SimulatedFrontend, rotation: f32) -> f32 {
        for _ in 0..200 {
            f.draw(Drawable::Rect { scale: 1.0, rotation });
            f.flip().unwrap();
            if f.stick_y().abs() >= 0.95 {
                break;
            }
        }
        f.stick_y()
    }

    #[test]
    fn test_rests_then_presses_trigger() {
        let mut f = SimulatedFrontend::new(60.0, 1);
        f.flip().unwrap();
        assert!(!f.trigger_pressed());
        f.flip().unwrap();
        f.flip().unwrap();
        assert!(f.trigger_pressed());
        assert_eq!(f.stick_y(), 0.0);
    }

    #[test]
    fn test_resting_trigger_is_released_again() {
        let mut f = SimulatedFrontend::new(60.0, 1);
        let states: Vec<bool> = (0..12)
            .map(|_| {
                f.flip().unwrap();
                f.trigger_pressed()
            })
            .collect();
        assert!(states.windows(2).any(|w| w[0] && !w[1]));
        assert!(states.windows(2).filter(|w| !w[0] && w[1]).count() >= 2);
    }

    #[test]
    fn test_follows_rotation_cue() {
        let mut f = SimulatedFrontend::new(60.0, 2).with_error_rate(0.0);
        assert!(run_until_terminal(&mut f, -3.0) <= -0.95);

        // stimulus gone: back to rest
        f.flip().unwrap();
        assert_eq!(f.stick_y(), 0.0);

        assert!(run_until_terminal(&mut f, 3.0) >= 0.95);
        assert_eq!(f.trials_seen(), 2);
    }

    #[test]
    fn test_errors_start_in_wrong_direction() {
        let mut f = SimulatedFrontend::new(60.0, 3).with_error_rate(1.0);
        f.draw(Drawable::Rect { scale: 1.0, rotation: 3.0 });
        f.flip().unwrap();
        f.draw(Drawable::Rect { scale: 1.0, rotation: 3.0 });
        f.flip().unwrap();
        assert!(f.stick_y() < 0.0);
        assert!(run_until_terminal(&mut f, 3.0) >= 0.95);
    }
}
