//! The section layout every session follows
//!
//! ```text
//! Welcome
//! Practice     2 trials, instruction first
//! Assessment   meter from 0.5, break after 60 trials
//! Training     meter from 0; instruction + 120 s scenario first,
//!              30 s scenarios after 60, 120 (with a break) and 180 trials
//! End          expectation rating
//! ```

use super::{InstructionSection, RatingPrompt, RatingTarget, ScenarioSection, Section, TrialSection};
use crate::condition::ConditionFactors;
use crate::core::config::ExperimentConfig;
use crate::core::error::Result;
use crate::core::types::StudyPart;
use crate::feedback::MeterFeedback;
use crate::language::Language;
use crate::session::SessionConfig;

/// Condition-dependent inputs of the layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionEffects {
    pub factors: ConditionFactors,
    /// Scenario picked by the participant (condition `A`)
    pub scenario: Option<String>,
    /// Consequences picked for this session (condition `C`)
    pub consequences: Vec<String>,
}

impl SessionEffects {
    /// Text logged in the `Scenario` column
    pub fn scenario_text<'a>(&'a self, language: &'a Language) -> &'a str {
        match (&self.scenario, self.factors.scenario_imagery) {
            (Some(scenario), true) => scenario,
            _ => &language.imagine_scenario.neutral_text,
        }
    }

    /// Text logged in the `Consequence` column and flashed after correct trials
    pub fn consequence_text(&self) -> String {
        if self.factors.consequence_feedback {
            self.consequences.first().cloned().unwrap_or_default()
        } else {
            String::new()
        }
    }
}

fn instruction(name: &str, text: &str, language: &Language) -> Section {
    Section::Instruction(InstructionSection {
        name: name.to_string(),
        enabled: true,
        text: text.to_string(),
        continue_text: language.instructions.continue_text.clone(),
        rating: None,
    })
}

fn scenario(name: &str, secs: f32, effects: &SessionEffects, language: &Language) -> Section {
    let texts = &language.imagine_scenario;
    let (title, continue_text) = if effects.factors.scenario_imagery && effects.scenario.is_some() {
        (&texts.title, &texts.continue_text)
    } else {
        (&texts.neutral_title, &texts.neutral_continue)
    };
    Section::Scenario(ScenarioSection {
        name: name.to_string(),
        enabled: true,
        title: title.clone(),
        text: effects.scenario_text(language).to_string(),
        continue_text: continue_text.clone(),
        duration_secs: secs,
        rating: None,
    })
}

/// Attach `sections` after `after` trials, unless the block is shorter
fn add_inbetween(block: &mut TrialSection, after: usize, sections: Vec<Section>) {
    if after > block.trials.len() {
        tracing::warn!(
            "{} has {} trials; dropping sections planned after trial {}",
            block.name,
            block.trials.len(),
            after
        );
        return;
    }
    block.inbetween.entry(after).or_default().extend(sections);
}

/// Build the sections of one session
pub fn standard_session(
    session: &SessionConfig,
    language: &Language,
    config: &ExperimentConfig,
    effects: &SessionEffects,
) -> Result<Vec<Section>> {
    let instructions = &language.instructions;
    let with_consequence = effects.factors.consequence_feedback;
    let meter_consequences = if with_consequence {
        effects.consequences.clone()
    } else {
        vec![String::new(), String::new()]
    };

    let mut practice = TrialSection::new("Practice", StudyPart::Practice, session.practice_trials()?);
    practice.draw_as_rect = true;
    practice.give_feedback = with_consequence;
    practice.feedback_interval = 1;
    add_inbetween(
        &mut practice,
        0,
        vec![instruction("PracticeInstruction", &instructions.practice, language)],
    );

    let mut assessment = TrialSection::new("Assessment", StudyPart::Assessment, session.assessment.clone());
    assessment.feedback_interval = config.assessment_feedback_interval;
    assessment.meter = Some(
        MeterFeedback::new(config.assessment_meter_start, config.assessment_increment())
            .with_consequences(meter_consequences.clone()),
    );
    add_inbetween(
        &mut assessment,
        0,
        vec![instruction("AssessmentInstruction", &instructions.trial, language)],
    );
    add_inbetween(
        &mut assessment,
        config.assessment_break_after,
        vec![instruction("AssessmentBreakInstruction", &instructions.break_text, language)],
    );

    let mut training = TrialSection::new("Training", StudyPart::Training, session.training.clone());
    training.give_feedback = true;
    training.only_progress = !with_consequence;
    training.feedback_interval = config.training_feedback_interval;
    training.meter =
        Some(MeterFeedback::new(0.0, config.training_increment()).with_consequences(meter_consequences));

    let mut first_scenario = scenario("ImagineScenario1_1", config.first_scenario_secs, effects, language);
    if let Section::Scenario(s) = &mut first_scenario {
        s.rating = Some(RatingPrompt {
            prompt: language.prompts.vividness.clone(),
            target: RatingTarget::Vividness,
        });
    }
    let [first_break, second_break, third_break] = config.training_breaks;
    add_inbetween(
        &mut training,
        0,
        vec![
            instruction("TrainingInstruction", &instructions.trial, language),
            first_scenario,
        ],
    );
    add_inbetween(
        &mut training,
        first_break,
        vec![scenario("ImagineScenario1_2", config.scenario_secs, effects, language)],
    );
    add_inbetween(
        &mut training,
        second_break,
        vec![
            instruction("TrainingBreakInstruction", &instructions.break_text, language),
            scenario("ImagineScenario2_1", config.scenario_secs, effects, language),
        ],
    );
    add_inbetween(
        &mut training,
        third_break,
        vec![scenario("ImagineScenario2_2", config.scenario_secs, effects, language)],
    );

    let end = Section::Instruction(InstructionSection {
        name: "EndInstruction".to_string(),
        enabled: true,
        text: instructions.end.clone(),
        continue_text: instructions.continue_text.clone(),
        rating: Some(RatingPrompt {
            prompt: language.prompts.expectation.clone(),
            target: RatingTarget::Expectation,
        }),
    });

    Ok(vec![
        instruction("WelcomeInstruction", &instructions.welcome, language),
        Section::Trial(practice),
        Section::Trial(assessment),
        Section::Trial(training),
        end,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Category, ParticipantId, TrialType};
    use crate::sections::SectionPipeline;
    use crate::session::TrialDescriptor;

    const LANGUAGE: &str = r#"
        consequences = { Health = "Better health" }

        [instructions]
        welcome = "Welcome"
        practice = "Practice"
        trial = "Trials"
        break = "Take a break"
        end = "Done"
        continue = "Press space"

        [imagine_scenario]
        title = "Imagine"
        continue = "Press space"
        neutral_title = "Relax"
        neutral_continue = "Press space"
        neutral_text = "Think of brushing your teeth"
        scenarios = { Party = "At a party" }

        [prompts]
        expectation = "How convinced are you?"
        vividness = "How vivid was it?"
        select_scenario = "Pick a scenario"
        select_consequence = "Pick a motivation"
        custom_scenario = "Describe your own situation"
        custom_consequence = "Describe your own motivation"
        consequence_label = "Motivation:"

        [hints]
        centered = "Joystick is centered."
        center_stick = "Please center the joystick."
        trigger_pressed = "Trigger is pressed."
        press_trigger = "Please press the trigger."
    "#;

    fn session(assessment: usize, training: usize) -> SessionConfig {
        let trial = |i: usize| {
            TrialDescriptor::new("PREAAT", Category::Alcoholic, TrialType::Push, format!("{}.jpg", i))
        };
        SessionConfig {
            participant_id: ParticipantId::parse("999999").unwrap(),
            session: 1,
            assessment: (0..assessment).map(trial).collect(),
            training: (0..training).map(trial).collect(),
        }
    }

    fn trial_block<'a>(sections: &'a [Section], name: &str) -> &'a TrialSection {
        sections
            .iter()
            .find_map(|s| match s {
                Section::Trial(t) if t.name == name => Some(t),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_full_layout_shape() {
        let language = Language::from_toml(LANGUAGE).unwrap();
        let effects = SessionEffects {
            factors: ConditionFactors::from_label("AB'C"),
            scenario: Some("At a party".into()),
            consequences: vec!["Better health".into()],
        };
        let sections =
            standard_session(&session(120, 240), &language, &ExperimentConfig::default(), &effects).unwrap();

        let names: Vec<&str> = sections.iter().map(Section::name).collect();
        assert_eq!(
            names,
            vec!["WelcomeInstruction", "Practice", "Assessment", "Training", "EndInstruction"]
        );

        let practice = trial_block(&sections, "Practice");
        assert!(practice.draw_as_rect && practice.give_feedback);
        assert_eq!(practice.trials.len(), 2);

        let assessment = trial_block(&sections, "Assessment");
        assert_eq!(assessment.inbetween.keys().copied().collect::<Vec<_>>(), vec![0, 60]);
        assert!(!assessment.give_feedback);
        assert_eq!(assessment.meter.as_ref().unwrap().perc, 0.5);

        let training = trial_block(&sections, "Training");
        assert_eq!(
            training.inbetween.keys().copied().collect::<Vec<_>>(),
            vec![0, 60, 120, 180]
        );
        assert!(training.give_feedback && !training.only_progress);
        assert_eq!(training.feedback_interval, 10);

        assert!(SectionPipeline::new(sections).is_ok());
    }

    #[test]
    fn test_condition_without_a_or_c_uses_neutral_progress_only() {
        let language = Language::from_toml(LANGUAGE).unwrap();
        let effects = SessionEffects {
            factors: ConditionFactors::from_label("B"),
            scenario: None,
            consequences: Vec::new(),
        };
        let sections =
            standard_session(&session(120, 240), &language, &ExperimentConfig::default(), &effects).unwrap();

        let training = trial_block(&sections, "Training");
        assert!(training.give_feedback && training.only_progress);
        assert!(!trial_block(&sections, "Practice").give_feedback);

        match &training.inbetween[&0][1] {
            Section::Scenario(s) => {
                assert_eq!(s.title, "Relax");
                assert_eq!(s.text, "Think of brushing your teeth");
                assert_eq!(s.duration_secs, 120.0);
                assert!(s.rating.is_some());
            }
            other => panic!("expected scenario, got {:?}", other.name()),
        }
    }

    #[test]
    fn test_short_blocks_drop_unreachable_breaks() {
        let language = Language::from_toml(LANGUAGE).unwrap();
        let sections = standard_session(
            &session(24, 90),
            &language,
            &ExperimentConfig::default(),
            &SessionEffects::default(),
        )
        .unwrap();

        let assessment = trial_block(&sections, "Assessment");
        assert_eq!(assessment.inbetween.keys().copied().collect::<Vec<_>>(), vec![0]);
        let training = trial_block(&sections, "Training");
        assert_eq!(training.inbetween.keys().copied().collect::<Vec<_>>(), vec![0, 60]);
        assert!(SectionPipeline::new(sections).is_ok());
    }

    #[test]
    fn test_scenario_and_consequence_columns() {
        let language = Language::from_toml(LANGUAGE).unwrap();
        let chosen = SessionEffects {
            factors: ConditionFactors::from_label("AB'C"),
            scenario: Some("At a party".into()),
            consequences: vec!["Better health".into()],
        };
        assert_eq!(chosen.scenario_text(&language), "At a party");
        assert_eq!(chosen.consequence_text(), "Better health");

        let plain = SessionEffects {
            factors: ConditionFactors::from_label("B'"),
            ..chosen.clone()
        };
        assert_eq!(plain.scenario_text(&language), "Think of brushing your teeth");
        assert_eq!(plain.consequence_text(), "");
    }
}
