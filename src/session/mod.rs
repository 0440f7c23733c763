//! Per-participant session configs
//!
//! Six documents are generated once, right after the condition is assigned,
//! and are read-only afterwards. Each holds the assessment and training trial
//! lists of one session.

pub mod generator;

pub use generator::generate_sessions;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::condition::ConditionFactors;
use crate::core::error::{AatError, Result};
use crate::core::persist::{read_json, write_json_new};
use crate::core::types::{Category, ParticipantId, TrialType};
use crate::participant::{ParticipantRecord, RecordStore};
use crate::stimuli::StimulusCatalog;

/// Sessions in the study
pub const SESSION_COUNT: u32 = 6;

pub const PRACTICE_PREFIX: &str = "PRACTICE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDescriptor {
    /// `<PREFIX>_<delay>_<POS|NEG>_<PUSH|PULL>_<LEFT|RIGHT>`
    pub code: String,
    pub delay: u32,
    pub trialtype: TrialType,
    /// Image path
    pub prime: String,
}

impl TrialDescriptor {
    pub fn new(prefix: &str, category: Category, trialtype: TrialType, prime: String) -> Self {
        let delay = 0;
        Self {
            code: format!(
                "{}_{}_{}_{}_{}",
                prefix,
                delay,
                category.polarity(),
                trialtype.as_str(),
                trialtype.rotation_label()
            ),
            delay,
            trialtype,
            prime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "Participant ID")]
    pub participant_id: ParticipantId,

    #[serde(rename = "Session")]
    pub session: u32,

    #[serde(rename = "Assessment")]
    pub assessment: Vec<TrialDescriptor>,

    #[serde(rename = "Training")]
    pub training: Vec<TrialDescriptor>,
}

impl SessionConfig {
    /// The two practice trials, both on the first assessment image
    pub fn practice_trials(&self) -> Result<Vec<TrialDescriptor>> {
        let prime = self
            .assessment
            .first()
            .map(|t| t.prime.clone())
            .ok_or_else(|| {
                AatError::SessionConfig(format!(
                    "session {} of {} has no assessment trials",
                    self.session, self.participant_id
                ))
            })?;

        Ok(vec![
            TrialDescriptor::new(PRACTICE_PREFIX, Category::Alcoholic, TrialType::Push, prime.clone()),
            TrialDescriptor::new(PRACTICE_PREFIX, Category::NonAlcoholic, TrialType::Pull, prime),
        ])
    }
}

/// What [`ensure_session_configs`] found on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    Generated,
    Reused,
}

/// Make sure all six session files exist for `record`
///
/// Files are never overwritten: a complete set is reused as is, a partial set
/// is an error that needs a human to look at the participant directory.
pub fn ensure_session_configs<R: Rng + ?Sized>(
    store: &RecordStore,
    record: &ParticipantRecord,
    catalog: &StimulusCatalog,
    factors: ConditionFactors,
    rng: &mut R,
) -> Result<ConfigStatus> {
    let found = (1..=SESSION_COUNT)
        .filter(|&n| store.session_path(&record.id, n).is_file())
        .count();

    if found == SESSION_COUNT as usize {
        tracing::info!("Session configs for {} already exist, reusing", record.id);
        return Ok(ConfigStatus::Reused);
    }
    if found > 0 {
        return Err(AatError::SessionConfigIncomplete {
            id: record.id.to_string(),
            found,
        });
    }

    let sessions = generate_sessions(record, catalog, factors, rng)?;
    std::fs::create_dir_all(store.participant_dir(&record.id))?;
    for config in &sessions {
        write_json_new(&store.session_path(&record.id, config.session), config)?;
    }
    Ok(ConfigStatus::Generated)
}

pub fn load_session_config(store: &RecordStore, id: &ParticipantId, session: u32) -> Result<SessionConfig> {
    let path = store.session_path(id, session);
    if !path.is_file() {
        return Err(AatError::SessionConfig(format!("{:?} does not exist", path)));
    }
    let config: SessionConfig = read_json(&path)?;
    if config.session != session || &config.participant_id != id {
        return Err(AatError::SessionConfig(format!(
            "{:?} belongs to participant {} session {}",
            path, config.participant_id, config.session
        )));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_code_format() {
        let t = TrialDescriptor::new("PREAAT", Category::Alcoholic, TrialType::Pull, "x.jpg".into());
        assert_eq!(t.code, "PREAAT_0_NEG_PULL_RIGHT");
        assert_eq!(t.delay, 0);

        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["trialtype"], "PULL");
        assert_eq!(value["prime"], "x.jpg");
    }

    #[test]
    fn test_practice_trials_use_first_prime() {
        let config = SessionConfig {
            participant_id: ParticipantId::parse("123123").unwrap(),
            session: 1,
            assessment: vec![
                TrialDescriptor::new("PREAAT", Category::NonAlcoholic, TrialType::Push, "first.jpg".into()),
                TrialDescriptor::new("PREAAT", Category::Alcoholic, TrialType::Push, "second.jpg".into()),
            ],
            training: Vec::new(),
        };

        let practice = config.practice_trials().unwrap();
        let codes: Vec<&str> = practice.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["PRACTICE_0_NEG_PUSH_LEFT", "PRACTICE_0_POS_PULL_RIGHT"]);
        assert!(practice.iter().all(|t| t.prime == "first.jpg"));
    }

    #[test]
    fn test_practice_needs_assessment() {
        let config = SessionConfig {
            participant_id: ParticipantId::parse("123123").unwrap(),
            session: 2,
            assessment: Vec::new(),
            training: Vec::new(),
        };
        assert!(config.practice_trials().is_err());
    }
}
