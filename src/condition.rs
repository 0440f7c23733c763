//! Experimental conditions and balanced assignment
//!
//! A condition label is a string of factor letters: `A` (scenario imagery),
//! `B'` (personalized training images) and `C` (consequence feedback). Plain
//! `B` means standard training images.

use serde::{Deserialize, Serialize};

use crate::core::error::{AatError, Result};
use crate::participant::ParticipantRecord;
use crate::settings::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionFactors {
    /// `A`: training breaks show the participant's own scenario
    pub scenario_imagery: bool,
    /// `B'`: training uses the personally selected images
    pub personalized_images: bool,
    /// `C`: trials give full feedback with the chosen consequence
    pub consequence_feedback: bool,
}

impl ConditionFactors {
    /// Factors are detected by substring, exactly as the labels are written
    pub fn from_label(label: &str) -> Self {
        Self {
            scenario_imagery: label.contains('A'),
            personalized_images: label.contains("B'"),
            consequence_feedback: label.contains('C'),
        }
    }
}

/// Assign a condition to `record`, balancing enrollment by sex
///
/// A participant that already carries `Condition_saved` keeps it and the
/// settings document is not touched. Otherwise the condition with the lowest
/// enrollment for the participant's sex wins (first listed on ties), its
/// counter is incremented under the settings lock, and the record is updated.
/// The caller persists the record.
pub fn assign_condition(record: &mut ParticipantRecord, store: &SettingsStore) -> Result<String> {
    if let Some(saved) = record.condition_saved.clone() {
        tracing::debug!("Participant {} keeps condition {}", record.id, saved);
        record.condition = Some(saved.clone());
        return Ok(saved);
    }

    let sex = record.sex;
    let code = store.update(|settings| {
        let mut best: Option<(&String, u32)> = None;
        for (code, counts) in &settings.randomization {
            if !settings.condition_codes.contains_key(code) {
                tracing::warn!("Randomization row '{}' has no condition code, skipping", code);
                continue;
            }
            let count = counts
                .get(&sex)
                .copied()
                .ok_or_else(|| AatError::UnknownSex(sex.to_string()))?;
            if best.map_or(true, |(_, lowest)| count < lowest) {
                best = Some((code, count));
            }
        }

        let code = best
            .map(|(code, _)| code.clone())
            .ok_or_else(|| AatError::Config("No condition available for assignment".into()))?;

        if let Some(count) = settings
            .randomization
            .get_mut(&code)
            .and_then(|counts| counts.get_mut(&sex))
        {
            *count += 1;
        }
        Ok(code)
    })?;

    tracing::info!("Assigned participant {} ({}) to condition {}", record.id, sex, code);
    record.condition = Some(code.clone());
    record.condition_saved = Some(code.clone());
    Ok(code)
}

/// Take a replaced participant out of the enrollment counters
///
/// Used when an intake overwrites a record that already had a condition, so
/// the same ID is not counted twice once the new record is assigned.
pub fn release_condition(record: &ParticipantRecord, store: &SettingsStore) -> Result<()> {
    let Some(code) = record.condition_saved.as_deref() else {
        return Ok(());
    };
    let sex = record.sex;
    store.update(|settings| {
        match settings
            .randomization
            .get_mut(code)
            .and_then(|counts| counts.get_mut(&sex))
        {
            Some(count) => *count = count.saturating_sub(1),
            None => tracing::warn!("No enrollment counter for condition {} ({})", code, sex),
        }
        Ok(())
    })?;
    tracing::info!("Released participant {} ({}) from condition {}", record.id, sex, code);
    Ok(())
}
