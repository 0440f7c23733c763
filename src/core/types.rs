//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::AatError;

/// Six-digit participant identifier
///
/// Primary key of the participant record. The inner string is guaranteed to
/// be exactly six ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn parse(raw: &str) -> Result<Self, AatError> {
        let trimmed = raw.trim();
        if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(AatError::InvalidParticipantId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = AatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl FromStr for ParticipantId {
    type Err = AatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sex recorded at intake, used as the balancing stratum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sex {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Sex {
    pub const ALL: [Sex; 4] = [Sex::Male, Sex::Female, Sex::Other, Sex::PreferNotToSay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
            Sex::PreferNotToSay => "prefer-not-to-say",
        }
    }
}

impl FromStr for Sex {
    type Err = AatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sex::ALL
            .into_iter()
            .find(|sex| sex.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AatError::InvalidSelection(format!("unknown sex '{}'", s)))
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stimulus category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Alcoholic,
    NonAlcoholic,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Alcoholic, Category::NonAlcoholic];

    /// Folder / JSON key of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Alcoholic => "alcoholic",
            Category::NonAlcoholic => "non_alcoholic",
        }
    }

    /// Polarity tag baked into trial codes
    pub fn polarity(&self) -> &'static str {
        match self {
            Category::Alcoholic => "NEG",
            Category::NonAlcoholic => "POS",
        }
    }

    /// The movement that counts as the healthy response to this category
    pub fn congruent_movement(&self) -> TrialType {
        match self {
            Category::Alcoholic => TrialType::Push,
            Category::NonAlcoholic => TrialType::Pull,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Required joystick movement of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrialType {
    Push,
    Pull,
}

impl TrialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialType::Push => "PUSH",
            TrialType::Pull => "PULL",
        }
    }

    /// Sign of the joystick axis this movement heads towards
    pub fn direction(&self) -> f32 {
        match self {
            TrialType::Push => -1.0,
            TrialType::Pull => 1.0,
        }
    }

    /// Rotation tag baked into trial codes
    pub fn rotation_label(&self) -> &'static str {
        match self {
            TrialType::Push => "LEFT",
            TrialType::Pull => "RIGHT",
        }
    }
}

impl fmt::Display for TrialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part of the session a trial belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StudyPart {
    Practice,
    Assessment,
    Training,
}

impl StudyPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyPart::Practice => "PRACTICE",
            StudyPart::Assessment => "ASSESSMENT",
            StudyPart::Training => "TRAINING",
        }
    }
}

impl fmt::Display for StudyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde adapter storing `None` as an empty string
///
/// Participant records use `""` for "not assigned yet".
pub mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}
