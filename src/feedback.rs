//! Progress meter feedback
//!
//! Correct and incorrect trials are counted over a feedback interval. At the
//! end of every interval the meter moves by `increment` per correct trial and
//! back by `increment` per incorrect one, clamped to [0, 1], and the counts
//! start over.

use crate::frontend::{next_frame, Drawable, Frontend};
use crate::core::error::Result;

/// Shrink factor of the meter animation as the meter fills
const FRAME_SHRINK: f32 = 10.285_714;

#[derive(Debug, Clone, PartialEq)]
pub struct MeterFeedback {
    /// Current fill in [0, 1]
    pub perc: f32,
    pub increment: f32,
    pub correct: u32,
    pub incorrect: u32,
    /// Texts shown with the meter; the first one labels it
    pub consequences: Vec<String>,
}

impl MeterFeedback {
    pub fn new(perc: f32, increment: f32) -> Self {
        Self {
            perc: perc.clamp(0.0, 1.0),
            increment,
            correct: 0,
            incorrect: 0,
            consequences: Vec::new(),
        }
    }

    pub fn with_consequences(mut self, consequences: Vec<String>) -> Self {
        self.consequences = consequences;
        self
    }

    pub fn record_correct(&mut self) {
        self.correct += 1;
    }

    pub fn record_incorrect(&mut self) {
        self.incorrect += 1;
    }

    /// The fill the meter moves to at the end of the interval
    pub fn target(&self) -> f32 {
        let delta = self.increment * self.correct as f32 - self.increment * self.incorrect as f32;
        (self.perc + delta).clamp(0.0, 1.0)
    }

    /// Animation length; fuller meters move faster
    pub fn frame_budget(&self, base_frames: u32) -> u32 {
        let frames = (base_frames as f32 / (1.0 + FRAME_SHRINK * self.perc)) as u32;
        frames.max(1)
    }

    pub fn reset(&mut self) {
        self.correct = 0;
        self.incorrect = 0;
    }

    /// Apply the interval without drawing; returns the new fill
    pub fn conclude(&mut self) -> f32 {
        self.perc = self.target();
        self.reset();
        self.perc
    }

    /// Animate towards the new fill over the frame budget, then apply it
    pub fn present<F: Frontend + ?Sized>(&mut self, frontend: &mut F, base_frames: u32) -> Result<f32> {
        let old = self.perc;
        let new = self.target();

        if new != old {
            let frames = self.frame_budget(base_frames);
            let step = (new - old) / frames as f32;
            let label = self.consequences.first().filter(|c| !c.is_empty()).cloned();
            for i in 1..=frames {
                frontend.draw(Drawable::Meter {
                    fraction: (old + step * i as f32).clamp(0.0, 1.0),
                    label: label.clone(),
                });
                next_frame(frontend)?;
            }
        }

        tracing::debug!(
            "Meter {:.3} -> {:.3} ({} correct, {} incorrect)",
            old,
            new,
            self.correct,
            self.incorrect
        );
        Ok(self.conclude())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ScriptedFrontend;

    #[test]
    fn test_target_clamps_at_one() {
        let mut meter = MeterFeedback::new(0.98, 0.05);
        for _ in 0..3 {
            meter.record_correct();
        }
        assert_eq!(meter.target(), 1.0);
    }

    #[test]
    fn test_target_clamps_at_zero() {
        let mut meter = MeterFeedback::new(0.02, 0.05);
        meter.record_incorrect();
        assert_eq!(meter.target(), 0.0);
    }

    #[test]
    fn test_frame_budget_shrinks_as_meter_fills() {
        assert_eq!(MeterFeedback::new(0.0, 0.1).frame_budget(50), 50);
        assert_eq!(MeterFeedback::new(0.5, 0.1).frame_budget(50), 8);
        assert_eq!(MeterFeedback::new(1.0, 0.1).frame_budget(50), 4);
        assert_eq!(MeterFeedback::new(1.0, 0.1).frame_budget(5), 1);
    }

    #[test]
    fn test_conclude_resets_counts() {
        let mut meter = MeterFeedback::new(0.5, 0.1);
        meter.record_correct();
        meter.record_correct();
        meter.record_incorrect();
        let perc = meter.conclude();
        assert!((perc - 0.6).abs() < 1e-6);
        assert_eq!((meter.correct, meter.incorrect), (0, 0));
    }

    #[test]
    fn test_present_animates_and_lands_on_target() {
        let mut frontend = ScriptedFrontend::new(60.0);
        let mut meter = MeterFeedback::new(0.0, 0.5).with_consequences(vec!["Health".into()]);
        meter.record_correct();

        let perc = meter.present(&mut frontend, 50).unwrap();
        assert_eq!(perc, 0.5);
        assert_eq!(frontend.frames_presented(), 50);
        match frontend.drawn().last() {
            Some(Drawable::Meter { fraction, label }) => {
                assert!((fraction - 0.5).abs() < 1e-6);
                assert_eq!(label.as_deref(), Some("Health"));
            }
            other => panic!("expected meter, got {:?}", other),
        }
    }

    #[test]
    fn test_present_without_change_draws_nothing() {
        let mut frontend = ScriptedFrontend::new(60.0);
        let mut meter = MeterFeedback::new(1.0, 0.1);
        meter.record_correct();
        meter.present(&mut frontend, 50).unwrap();
        assert_eq!(frontend.frames_presented(), 0);
        assert_eq!(meter.correct, 0);
    }
}
