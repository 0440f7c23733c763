//! Session sections and the pipeline that runs them
//!
//! A session is an ordered list of [`Section`]s. Trial sections additionally
//! carry "inbetween" sections keyed by trial count: key `k` runs once `k`
//! trials of the block are done, so key 0 runs before the first trial.
//! Every section is validated before the session starts.

pub mod layout;

pub use layout::{standard_session, SessionEffects};

use std::collections::BTreeMap;

use crate::core::config::ExperimentConfig;
use crate::core::error::{AatError, Result};
use crate::core::types::{StudyPart, TrialType};
use crate::feedback::MeterFeedback;
use crate::frontend::{ask_rating, show_for, show_until_continue, Drawable, Frontend, Position};
use crate::participant::ratings::MAX_RATING;
use crate::session::TrialDescriptor;
use crate::trial::{Congruency, TrialMode, TrialOutcome, TrialRunner};

/// Per-session ratings a section can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingTarget {
    Expectation,
    Vividness,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingPrompt {
    pub prompt: String,
    pub target: RatingTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstructionSection {
    pub name: String,
    pub enabled: bool,
    pub text: String,
    pub continue_text: String,
    pub rating: Option<RatingPrompt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSection {
    pub name: String,
    pub enabled: bool,
    pub title: String,
    pub text: String,
    pub continue_text: String,
    /// Seconds the scenario stays up before it can be dismissed
    pub duration_secs: f32,
    pub rating: Option<RatingPrompt>,
}

#[derive(Debug, Clone)]
pub struct TrialSection {
    pub name: String,
    pub enabled: bool,
    pub part: StudyPart,
    pub trials: Vec<TrialDescriptor>,
    pub give_feedback: bool,
    pub only_progress: bool,
    pub draw_as_rect: bool,
    pub feedback_interval: usize,
    pub meter: Option<MeterFeedback>,
    pub inbetween: BTreeMap<usize, Vec<Section>>,
}

impl TrialSection {
    pub fn new(name: impl Into<String>, part: StudyPart, trials: Vec<TrialDescriptor>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            part,
            trials,
            give_feedback: false,
            only_progress: false,
            draw_as_rect: false,
            feedback_interval: 1,
            meter: None,
            inbetween: BTreeMap::new(),
        }
    }

    pub fn with_inbetween(mut self, after: usize, sections: Vec<Section>) -> Self {
        self.inbetween.entry(after).or_default().extend(sections);
        self
    }

    fn mode(&self) -> TrialMode {
        TrialMode {
            part: self.part,
            give_feedback: self.give_feedback,
            only_progress: self.only_progress,
            draw_as_rect: self.draw_as_rect,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Section {
    Instruction(InstructionSection),
    Scenario(ScenarioSection),
    Trial(TrialSection),
}

/// What a session produced besides its log rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOutcome {
    pub expectation: Option<u8>,
    pub vividness: Option<u8>,
    pub trials: Vec<TrialOutcome>,
    /// Final meter fill of every trial block that has one, by section name
    pub meters: Vec<(String, f32)>,
}

impl SessionOutcome {
    fn record_rating(&mut self, target: RatingTarget, value: u8) {
        // The first vividness rating of a session is the one kept
        match target {
            RatingTarget::Expectation => self.expectation = Some(value),
            RatingTarget::Vividness => {
                self.vividness.get_or_insert(value);
            }
        }
    }
}

fn require(section: &str, field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AatError::MissingText {
            section: section.to_string(),
            field,
        });
    }
    Ok(())
}

impl Section {
    pub fn name(&self) -> &str {
        match self {
            Section::Instruction(s) => &s.name,
            Section::Scenario(s) => &s.name,
            Section::Trial(s) => &s.name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Section::Instruction(s) => s.enabled,
            Section::Scenario(s) => s.enabled,
            Section::Trial(s) => s.enabled,
        }
    }

    /// Check everything that would otherwise fail mid-session
    pub fn validate(&self) -> Result<()> {
        match self {
            Section::Instruction(s) => {
                require(&s.name, "text", &s.text)?;
                require(&s.name, "continue_text", &s.continue_text)?;
                if let Some(rating) = &s.rating {
                    require(&s.name, "rating prompt", &rating.prompt)?;
                }
            }
            Section::Scenario(s) => {
                require(&s.name, "title", &s.title)?;
                require(&s.name, "text", &s.text)?;
                require(&s.name, "continue_text", &s.continue_text)?;
                if s.duration_secs.is_nan() || s.duration_secs < 0.0 {
                    return Err(AatError::Config(format!(
                        "{}: duration must be non-negative",
                        s.name
                    )));
                }
                if let Some(rating) = &s.rating {
                    require(&s.name, "rating prompt", &rating.prompt)?;
                }
            }
            Section::Trial(s) => {
                if s.enabled && s.trials.is_empty() {
                    return Err(AatError::Config(format!("{}: no trials", s.name)));
                }
                if s.feedback_interval == 0 {
                    return Err(AatError::Config(format!(
                        "{}: feedback interval must be at least 1",
                        s.name
                    )));
                }
                for (&after, sections) in &s.inbetween {
                    if after > s.trials.len() {
                        return Err(AatError::Config(format!(
                            "{}: inbetween key {} exceeds {} trials",
                            s.name,
                            after,
                            s.trials.len()
                        )));
                    }
                    for section in sections {
                        if matches!(section, Section::Trial(_)) {
                            return Err(AatError::Config(format!(
                                "{}: trial blocks cannot be nested in {}",
                                section.name(),
                                s.name
                            )));
                        }
                        section.validate()?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// An ordered, validated list of sections
#[derive(Debug, Clone)]
pub struct SectionPipeline {
    sections: Vec<Section>,
}

impl SectionPipeline {
    /// Validate every section up front
    pub fn new(sections: Vec<Section>) -> Result<Self> {
        for section in &sections {
            section.validate()?;
        }
        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn run<F: Frontend + ?Sized>(
        &mut self,
        frontend: &mut F,
        runner: &mut TrialRunner<'_>,
        config: &ExperimentConfig,
    ) -> Result<SessionOutcome> {
        let mut outcome = SessionOutcome::default();
        for section in &mut self.sections {
            run_section(section, frontend, runner, config, &mut outcome)?;
        }
        Ok(outcome)
    }
}

fn run_section<F: Frontend + ?Sized>(
    section: &mut Section,
    frontend: &mut F,
    runner: &mut TrialRunner<'_>,
    config: &ExperimentConfig,
    outcome: &mut SessionOutcome,
) -> Result<()> {
    if !section.enabled() {
        tracing::debug!("Skipping disabled section {}", section.name());
        return Ok(());
    }
    tracing::info!("Running section {}", section.name());

    match section {
        Section::Instruction(s) => {
            show_until_continue(
                frontend,
                &[
                    Drawable::text(&s.text, Position::CENTER),
                    Drawable::emphasized(&s.continue_text, Position::BOTTOM),
                ],
            )?;
            ask_for_rating(frontend, s.rating.as_ref(), outcome)?;
        }
        Section::Scenario(s) => {
            let lines = [
                Drawable::text(&s.title, Position::TOP),
                Drawable::text(&s.text, Position::CENTER),
            ];
            show_for(frontend, &lines, s.duration_secs as f64)?;

            let mut with_continue = lines.to_vec();
            with_continue.push(Drawable::emphasized(&s.continue_text, Position::BOTTOM));
            show_until_continue(frontend, &with_continue)?;
            ask_for_rating(frontend, s.rating.as_ref(), outcome)?;
        }
        Section::Trial(s) => run_trials(s, frontend, runner, config, outcome)?,
    }
    Ok(())
}

fn ask_for_rating<F: Frontend + ?Sized>(
    frontend: &mut F,
    rating: Option<&RatingPrompt>,
    outcome: &mut SessionOutcome,
) -> Result<()> {
    if let Some(rating) = rating {
        let value = ask_rating(frontend, &rating.prompt, 0, MAX_RATING)?;
        outcome.record_rating(rating.target, value);
    }
    Ok(())
}

fn run_inbetween<F: Frontend + ?Sized>(
    section: &mut TrialSection,
    completed: usize,
    frontend: &mut F,
    runner: &mut TrialRunner<'_>,
    config: &ExperimentConfig,
    outcome: &mut SessionOutcome,
) -> Result<()> {
    if let Some(sections) = section.inbetween.get_mut(&completed) {
        for inner in sections {
            run_section(inner, frontend, runner, config, outcome)?;
        }
    }
    Ok(())
}

/// Drive one trial block
///
/// Meter accounting follows the trial code: a congruent trial counts as
/// correct, an incongruent pull (approaching alcohol) as incorrect, and an
/// incongruent push counts for neither. Blocks without feedback leave the
/// meter where it is; otherwise it is presented every `feedback_interval`
/// trials.
fn run_trials<F: Frontend + ?Sized>(
    section: &mut TrialSection,
    frontend: &mut F,
    runner: &mut TrialRunner<'_>,
    config: &ExperimentConfig,
    outcome: &mut SessionOutcome,
) -> Result<()> {
    let mode = section.mode();
    let give_feedback = section.give_feedback;
    let trials = section.trials.clone();
    let mut since_feedback = 0;

    for (completed, trial) in trials.iter().enumerate() {
        run_inbetween(section, completed, frontend, runner, config, outcome)?;

        let result = runner.run(frontend, trial, mode)?;
        since_feedback += 1;

        if let Some(meter) = section.meter.as_mut().filter(|_| give_feedback) {
            match (result.congruency, trial.trialtype) {
                (Congruency::Congruent, _) => meter.record_correct(),
                (Congruency::Incongruent, TrialType::Pull) => meter.record_incorrect(),
                (Congruency::Incongruent, TrialType::Push) => {}
            }

            if since_feedback == section.feedback_interval {
                meter.present(frontend, config.meter_base_frames)?;
            }
        }
        if since_feedback == section.feedback_interval {
            since_feedback = 0;
        }
        outcome.trials.push(result);
    }

    run_inbetween(section, trials.len(), frontend, runner, config, outcome)?;

    if let Some(meter) = &section.meter {
        outcome.meters.push((section.name.clone(), meter.perc));
    }
    tracing::info!("{}: {} trials done", section.name, trials.len());
    Ok(())
}
