//! Scenario and consequence ratings
//!
//! Ratings are 0-10 scores keyed by the vocabulary of the language file. The
//! key `Custom` refers to the participant's own free-text entry, which is
//! stored next to the scores under `Custom Text`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{AatError, Result};

/// Rating key that refers to the free-text entry
pub const CUSTOM_KEY: &str = "Custom";

pub const MAX_RATING: u8 = 10;

/// Longest free-text entry the intake form accepts
pub const MAX_CUSTOM_TEXT_CHARS: usize = 150;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    #[serde(rename = "Custom Text", default, skip_serializing_if = "Option::is_none")]
    pub custom_text: Option<String>,

    #[serde(flatten)]
    pub scores: IndexMap<String, u8>,
}

impl Ratings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, score: i64) -> Result<()> {
        let key = key.into();
        if !(0..=MAX_RATING as i64).contains(&score) {
            return Err(AatError::InvalidRating { key, value: score });
        }
        self.scores.insert(key, score as u8);
        Ok(())
    }

    pub fn set_custom_text(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if text.chars().count() > MAX_CUSTOM_TEXT_CHARS {
            return Err(AatError::InvalidSelection(format!(
                "custom text exceeds {} characters",
                MAX_CUSTOM_TEXT_CHARS
            )));
        }
        self.custom_text = Some(text);
        Ok(())
    }

    /// The `n` highest rated keys; ties keep rating order
    pub fn top_keys(&self, n: usize) -> Vec<&str> {
        let mut entries: Vec<(&String, &u8)> = self.scores.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1));
        entries.into_iter().take(n).map(|(k, _)| k.as_str()).collect()
    }

    /// Every key sharing the maximum score
    pub fn max_keys(&self) -> Vec<&str> {
        let Some(max) = self.scores.values().max().copied() else {
            return Vec::new();
        };
        self.scores
            .iter()
            .filter(|(_, score)| **score == max)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Resolve a key to display text through `vocabulary`
    ///
    /// `Custom` resolves to the free-text entry.
    pub fn resolve(&self, key: &str, vocabulary: &IndexMap<String, String>) -> Option<String> {
        if key == CUSTOM_KEY {
            self.custom_text.clone().filter(|t| !t.trim().is_empty())
        } else {
            vocabulary.get(key).cloned()
        }
    }

    /// Resolve several keys, dropping the ones without text
    pub fn resolve_all(&self, keys: &[&str], vocabulary: &IndexMap<String, String>) -> Vec<String> {
        keys.iter()
            .filter_map(|key| {
                let text = self.resolve(key, vocabulary);
                if text.is_none() {
                    tracing::warn!("Rating key '{}' has no text, skipping", key);
                }
                text
            })
            .collect()
    }
}
