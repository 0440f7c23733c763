//! Single trial execution
//!
//! A trial waits for the participant to center the stick and click the
//! trigger, holds an empty screen for the trial's delay, then shows the
//! tilted stimulus and follows the stick until it
//! crosses the terminal threshold in the required direction. Every stage
//! entry and the final position are written to the trial log.

pub mod log;
pub mod stage;

pub use log::{TrialLog, TrialRow};
pub use stage::{Stage, StageEntry, StageTracker};

use chrono::Local;
use std::fmt;

use crate::core::config::ExperimentConfig;
use crate::core::error::Result;
use crate::core::types::{ParticipantId, StudyPart, TrialType};
use crate::frontend::{next_frame, show_for, Background, Drawable, Frontend, Position};
use crate::language::JoystickHints;
use crate::session::TrialDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Congruency {
    Congruent,
    Incongruent,
}

impl Congruency {
    /// Read off the trial code: `POS_PULL` and `NEG_PUSH` are congruent
    pub fn of_code(code: &str) -> Self {
        if code.contains("POS_PULL") || code.contains("NEG_PUSH") {
            Congruency::Congruent
        } else {
            Congruency::Incongruent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Congruency::Congruent => "congruent",
            Congruency::Incongruent => "incongruent",
        }
    }
}

impl fmt::Display for Congruency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `y` lies at or beyond `threshold` in the required direction
pub fn is_correct(trialtype: TrialType, y: f32, threshold: f32) -> bool {
    y * trialtype.direction() >= threshold
}

/// Stimulus geometry for the current stick position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PictureTransform {
    /// Size relative to the native image size at rest
    pub base_scale: f32,
    /// Degrees; negative tilts left (push), positive right (pull)
    pub rotation: f32,
}

impl PictureTransform {
    pub fn new(trialtype: TrialType, rotation_degrees: f32, scale_divisor: f32) -> Self {
        Self {
            base_scale: 1.0 / scale_divisor,
            rotation: rotation_degrees * trialtype.direction(),
        }
    }

    /// Pulling enlarges, pushing shrinks
    pub fn scale_at(&self, y: f32) -> f32 {
        self.base_scale * (1.0 + y)
    }

    fn drawable(&self, prime: &str, y: f32, as_rect: bool) -> Drawable {
        if as_rect {
            Drawable::Rect {
                scale: self.scale_at(y),
                rotation: self.rotation,
            }
        } else {
            Drawable::Image {
                path: prime.to_string(),
                scale: self.scale_at(y),
                rotation: self.rotation,
            }
        }
    }
}

/// How a block of trials presents itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialMode {
    pub part: StudyPart,
    pub give_feedback: bool,
    /// Only the meter; no colour or consequence feedback during trials
    pub only_progress: bool,
    /// Draw a plain rectangle instead of the image
    pub draw_as_rect: bool,
}

impl TrialMode {
    fn full_feedback(&self) -> bool {
        self.give_feedback && !self.only_progress
    }
}

/// Per-session values repeated on every log row
#[derive(Debug, Clone, PartialEq)]
pub struct RowContext {
    pub id: ParticipantId,
    pub condition: String,
    pub scenario: String,
    pub session: u32,
    pub consequence: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    pub trial_number: u32,
    pub congruency: Congruency,
    pub correct: bool,
    pub final_y: f32,
    /// Seconds from stimulus onset to the terminal crossing
    pub rt: f64,
    pub rows: u32,
}

/// Runs trials and logs them; one per session, shared by all trial blocks
pub struct TrialRunner<'a> {
    config: &'a ExperimentConfig,
    hints: &'a JoystickHints,
    consequence_label: &'a str,
    rotation_degrees: f32,
    log: &'a mut TrialLog,
    context: RowContext,
    trial_number: u32,
}

impl<'a> TrialRunner<'a> {
    pub fn new(
        config: &'a ExperimentConfig,
        hints: &'a JoystickHints,
        consequence_label: &'a str,
        rotation_degrees: f32,
        log: &'a mut TrialLog,
        context: RowContext,
    ) -> Self {
        Self {
            config,
            hints,
            consequence_label,
            rotation_degrees,
            log,
            context,
            trial_number: 0,
        }
    }

    /// Trials run so far in this session
    pub fn trial_number(&self) -> u32 {
        self.trial_number
    }

    pub fn context(&self) -> &RowContext {
        &self.context
    }

    pub fn run<F: Frontend + ?Sized>(
        &mut self,
        frontend: &mut F,
        trial: &TrialDescriptor,
        mode: TrialMode,
    ) -> Result<TrialOutcome> {
        self.trial_number += 1;
        let congruency = Congruency::of_code(&trial.code);
        let transform =
            PictureTransform::new(trial.trialtype, self.rotation_degrees, self.config.stimulus_scale_divisor);

        self.wait_for_click(frontend)?;
        if trial.delay > 0 {
            show_for(frontend, &[Drawable::Background(Background::Normal)], trial.delay as f64)?;
        }

        let current_time = Local::now().format(log::ROW_TIMESTAMP).to_string();
        let direction = trial.trialtype.direction();
        let mut tracker = StageTracker::new(self.config);
        let mut background = Background::Normal;
        let mut rows = 0;
        let started = frontend.now();

        let final_y = loop {
            let y = frontend.stick_y();
            if y * direction >= self.config.terminal_threshold {
                break y;
            }

            if mode.give_feedback {
                let signed = y * direction;
                if signed < -self.config.wrong_direction_threshold && !mode.only_progress {
                    background = Background::Error;
                } else if signed > self.config.wrong_direction_threshold {
                    background = Background::Normal;
                }
            }

            if let Some(entry) = tracker.observe(y) {
                let rt = frontend.now() - started;
                self.log_row(trial, mode.part, congruency, &current_time, entry, y, rt)?;
                rows += 1;
            }

            frontend.draw(Drawable::Background(background));
            frontend.draw(transform.drawable(&trial.prime, y, mode.draw_as_rect));
            next_frame(frontend)?;
        };

        let rt = frontend.now() - started;
        let correct = is_correct(trial.trialtype, final_y, self.config.terminal_threshold);
        self.log_row(trial, mode.part, congruency, &current_time, tracker.finish(), final_y, rt)?;
        rows += 1;

        if correct && mode.full_feedback() {
            self.flash_consequence(frontend)?;
        }

        tracing::debug!(
            "Trial {} {} {} ({}): {} rows, rt {:.3}s",
            self.trial_number,
            trial.code,
            trial.trialtype,
            congruency,
            rows,
            rt
        );

        Ok(TrialOutcome {
            trial_number: self.trial_number,
            congruency,
            correct,
            final_y,
            rt,
            rows,
        })
    }

    /// Block until the stick is centered and the trigger goes down
    ///
    /// A trigger already held when the wait starts does not count; it has to
    /// be released first. After the hint delay the joystick hints are drawn.
    fn wait_for_click<F: Frontend + ?Sized>(&mut self, frontend: &mut F) -> Result<()> {
        let started = frontend.now();
        let mut was_pressed = true;

        loop {
            next_frame(frontend)?;
            let y = frontend.stick_y();
            let pressed = frontend.trigger_pressed();
            let centered = y.abs() < self.config.centered_radius;

            if centered {
                if !pressed {
                    was_pressed = false;
                } else if !was_pressed {
                    return Ok(());
                }
            }

            if frontend.now() - started > self.config.hint_delay_secs as f64 {
                let stick = if centered {
                    Drawable::emphasized(&self.hints.centered, Position::HINT_UPPER)
                } else {
                    Drawable::text(&self.hints.center_stick, Position::HINT_UPPER)
                };
                let trigger = if pressed {
                    Drawable::emphasized(&self.hints.trigger_pressed, Position::HINT_LOWER)
                } else {
                    Drawable::text(&self.hints.press_trigger, Position::HINT_LOWER)
                };
                frontend.draw(stick);
                frontend.draw(trigger);
            }
        }
    }

    fn flash_consequence<F: Frontend + ?Sized>(&mut self, frontend: &mut F) -> Result<()> {
        if self.context.consequence.is_empty() {
            return Ok(());
        }
        let frames = (self.config.consequence_flash_secs * self.config.frames_per_second).ceil() as u32;
        for _ in 0..frames.max(1) {
            frontend.draw(Drawable::text(self.consequence_label, Position::TOP));
            frontend.draw(Drawable::emphasized(&self.context.consequence, Position::CENTER));
            next_frame(frontend)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn log_row(
        &mut self,
        trial: &TrialDescriptor,
        part: StudyPart,
        congruency: Congruency,
        current_time: &str,
        entry: StageEntry,
        y: f32,
        rt: f64,
    ) -> Result<()> {
        let row = TrialRow {
            id: self.context.id.clone(),
            condition: self.context.condition.clone(),
            scenario: self.context.scenario.clone(),
            current_time: current_time.to_string(),
            study_part: part,
            code: trial.code.clone(),
            trial_type: trial.trialtype,
            delay: trial.delay,
            picture: trial.prime.clone(),
            trial_number: self.trial_number,
            rt,
            stage_number: entry.number,
            stage: entry.stage.to_string(),
            y,
            correct: is_correct(trial.trialtype, y, self.config.terminal_threshold),
            congruency: congruency.to_string(),
            session: self.context.session,
            consequence: self.context.consequence.clone(),
        };
        self.log.append(&row)
    }
}
