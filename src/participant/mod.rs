//! Participant record and everything collected at intake
//!
//! The record is the single source of truth for cross-session state. It is
//! always written as a whole document (see [`store::RecordStore`]).

pub mod personalization;
pub mod ratings;
pub mod store;

pub use personalization::{FirstPicks, ImageSelections, PanelChooser, PersonalizationPlan};
pub use ratings::Ratings;
pub use store::RecordStore;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{AatError, Result};
use crate::core::types::{empty_as_none, Category, ParticipantId, Sex};
use crate::session::SESSION_COUNT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    #[serde(rename = "Participant ID")]
    pub id: ParticipantId,

    #[serde(rename = "Sex")]
    pub sex: Sex,

    /// Assigned condition code; `""` until the first session
    #[serde(rename = "Condition", with = "empty_as_none", default)]
    pub condition: Option<String>,

    /// Cached copy of the assignment that makes it idempotent across restarts
    #[serde(rename = "Condition_saved", with = "empty_as_none", default)]
    pub condition_saved: Option<String>,

    /// 0 before the first session, N while session N is pending, 7 when done
    #[serde(rename = "Current Session", default)]
    pub current_session: u32,

    #[serde(rename = "Scenario Rating", default)]
    pub scenario_rating: Ratings,

    #[serde(rename = "Consequence Rating", default)]
    pub consequence_rating: Ratings,

    #[serde(rename = "non_alcoholic", default)]
    pub non_alcoholic: ImageSelections,

    #[serde(rename = "alcoholic", default)]
    pub alcoholic: ImageSelections,

    /// Session number -> expectation rating given at the end of the session
    #[serde(rename = "Expectation", default)]
    pub expectation: IndexMap<String, u8>,

    /// Session number -> vividness of the first imagined scenario
    #[serde(rename = "Training_Vividness", default)]
    pub training_vividness: IndexMap<String, u8>,

    /// Session number -> consequence texts chosen for that session
    #[serde(rename = "Consequence", default)]
    pub consequence: IndexMap<String, Vec<String>>,

    /// Keys written by other tools; kept verbatim
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl ParticipantRecord {
    /// Fresh presession record as written at intake
    pub fn new(id: ParticipantId, sex: Sex) -> Self {
        Self {
            id,
            sex,
            condition: None,
            condition_saved: None,
            current_session: 0,
            scenario_rating: Ratings::new(),
            consequence_rating: Ratings::new(),
            non_alcoholic: ImageSelections::new(),
            alcoholic: ImageSelections::new(),
            expectation: IndexMap::new(),
            training_vividness: IndexMap::new(),
            consequence: IndexMap::new(),
            extra: IndexMap::new(),
        }
    }

    pub fn selections(&self, category: Category) -> &ImageSelections {
        match category {
            Category::Alcoholic => &self.alcoholic,
            Category::NonAlcoholic => &self.non_alcoholic,
        }
    }

    pub fn set_selections(&mut self, category: Category, selections: ImageSelections) {
        match category {
            Category::Alcoholic => self.alcoholic = selections,
            Category::NonAlcoholic => self.non_alcoholic = selections,
        }
    }

    /// Every personally selected image of a category, in rank order
    pub fn selected_images(&self, category: Category) -> Vec<String> {
        self.selections(category)
            .values()
            .flat_map(|picks| picks.values().cloned())
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.current_session > SESSION_COUNT
    }

    /// The session to run next, moving a fresh record from 0 to 1
    pub fn begin_session(&mut self) -> Result<u32> {
        if self.is_finished() {
            return Err(AatError::StudyComplete(self.id.to_string()));
        }
        if self.current_session == 0 {
            self.current_session = 1;
        }
        Ok(self.current_session)
    }

    /// Advance the counter past `session`
    pub fn complete_session(&mut self, session: u32) -> Result<()> {
        if session != self.current_session {
            return Err(AatError::SessionConfig(format!(
                "participant {} is at session {}, cannot complete session {}",
                self.id, self.current_session, session
            )));
        }
        self.current_session = session + 1;
        Ok(())
    }

    pub fn record_expectation(&mut self, session: u32, rating: u8) {
        self.expectation.insert(session.to_string(), rating);
    }

    pub fn record_vividness(&mut self, session: u32, rating: u8) {
        self.training_vividness.insert(session.to_string(), rating);
    }

    pub fn record_consequence(&mut self, session: u32, texts: Vec<String>) {
        self.consequence.insert(session.to_string(), texts);
    }
}
