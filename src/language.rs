//! Text content shown to participants, loaded from TOML
//!
//! Every screen reads its text through a field of [`Language`], so a missing
//! key is a load-time error instead of a lookup failure in the middle of a
//! session.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{AatError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub instructions: Instructions,
    pub imagine_scenario: ImagineScenario,
    /// Consequence vocabulary: rating key -> text
    pub consequences: IndexMap<String, String>,
    pub prompts: Prompts,
    pub hints: JoystickHints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructions {
    pub welcome: String,
    pub practice: String,
    pub trial: String,
    #[serde(rename = "break")]
    pub break_text: String,
    pub end: String,
    #[serde(rename = "continue")]
    pub continue_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagineScenario {
    pub title: String,
    #[serde(rename = "continue")]
    pub continue_text: String,
    pub neutral_title: String,
    pub neutral_continue: String,
    pub neutral_text: String,
    /// Scenario vocabulary: rating key -> text
    pub scenarios: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompts {
    pub expectation: String,
    pub vividness: String,
    pub select_scenario: String,
    pub select_consequence: String,
    /// Free-text entry for a situation of the participant's own
    pub custom_scenario: String,
    pub custom_consequence: String,
    pub consequence_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoystickHints {
    pub centered: String,
    pub center_stick: String,
    pub trigger_pressed: String,
    pub press_trigger: String,
}

impl Language {
    pub fn from_toml(content: &str) -> Result<Self> {
        let language: Language = toml::from_str(content)?;
        language.validate()?;
        Ok(language)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Every string must be non-empty and both vocabularies populated
    pub fn validate(&self) -> Result<()> {
        let i = &self.instructions;
        let s = &self.imagine_scenario;
        let p = &self.prompts;
        let h = &self.hints;

        let fields: [(&str, &'static str, &str); 22] = [
            ("instructions", "welcome", &i.welcome),
            ("instructions", "practice", &i.practice),
            ("instructions", "trial", &i.trial),
            ("instructions", "break", &i.break_text),
            ("instructions", "end", &i.end),
            ("instructions", "continue", &i.continue_text),
            ("imagine_scenario", "title", &s.title),
            ("imagine_scenario", "continue", &s.continue_text),
            ("imagine_scenario", "neutral_title", &s.neutral_title),
            ("imagine_scenario", "neutral_continue", &s.neutral_continue),
            ("imagine_scenario", "neutral_text", &s.neutral_text),
            ("prompts", "expectation", &p.expectation),
            ("prompts", "vividness", &p.vividness),
            ("prompts", "select_scenario", &p.select_scenario),
            ("prompts", "select_consequence", &p.select_consequence),
            ("prompts", "custom_scenario", &p.custom_scenario),
            ("prompts", "custom_consequence", &p.custom_consequence),
            ("prompts", "consequence_label", &p.consequence_label),
            ("hints", "centered", &h.centered),
            ("hints", "center_stick", &h.center_stick),
            ("hints", "trigger_pressed", &h.trigger_pressed),
            ("hints", "press_trigger", &h.press_trigger),
        ];

        for (section, field, value) in fields {
            if value.trim().is_empty() {
                return Err(AatError::MissingText {
                    section: section.to_string(),
                    field,
                });
            }
        }

        check_vocabulary("imagine_scenario.scenarios", &s.scenarios)?;
        check_vocabulary("consequences", &self.consequences)?;
        Ok(())
    }

    pub fn scenario_text(&self, key: &str) -> Option<&str> {
        self.imagine_scenario.scenarios.get(key).map(String::as_str)
    }

    pub fn consequence_text(&self, key: &str) -> Option<&str> {
        self.consequences.get(key).map(String::as_str)
    }
}

fn check_vocabulary(section: &str, vocabulary: &IndexMap<String, String>) -> Result<()> {
    if vocabulary.is_empty() {
        return Err(AatError::Config(format!("{} must not be empty", section)));
    }
    for (key, text) in vocabulary {
        if text.trim().is_empty() {
            return Err(AatError::Config(format!("{}.{} is an empty string", section, key)));
        }
    }
    Ok(())
}
