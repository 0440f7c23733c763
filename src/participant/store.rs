//! On-disk layout of participant documents
//!
//! ```text
//! <config_path>/<id>/<prefix>_presession_<id>.json
//! <config_path>/<id>/<prefix>_session<N>_<id>.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use super::ParticipantRecord;
use crate::core::error::{AatError, Result};
use crate::core::persist::{read_json, write_json_atomic};
use crate::core::types::ParticipantId;
use crate::session::SESSION_COUNT;

#[derive(Debug, Clone)]
pub struct RecordStore {
    config_path: PathBuf,
    prefix: String,
}

impl RecordStore {
    pub fn new(config_path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            config_path: config_path.into(),
            prefix: prefix.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn participant_dir(&self, id: &ParticipantId) -> PathBuf {
        self.config_path.join(id.as_str())
    }

    pub fn presession_path(&self, id: &ParticipantId) -> PathBuf {
        self.participant_dir(id)
            .join(format!("{}_presession_{}.json", self.prefix, id))
    }

    pub fn session_path(&self, id: &ParticipantId, session: u32) -> PathBuf {
        self.participant_dir(id)
            .join(format!("{}_session{}_{}.json", self.prefix, session, id))
    }

    pub fn exists(&self, id: &ParticipantId) -> bool {
        self.presession_path(id).is_file()
    }

    pub fn load(&self, id: &ParticipantId) -> Result<ParticipantRecord> {
        let path = self.presession_path(id);
        if !path.is_file() {
            return Err(AatError::ParticipantNotFound(id.to_string()));
        }
        read_json(&path)
    }

    /// Overwrite the record with the full document
    pub fn save(&self, record: &ParticipantRecord) -> Result<()> {
        fs::create_dir_all(self.participant_dir(&record.id))?;
        write_json_atomic(&self.presession_path(&record.id), record)
    }

    /// Write a record produced at intake
    ///
    /// An existing record is only replaced when `overwrite` is set. Session
    /// configs generated for the replaced record are removed with it.
    pub fn create(&self, record: &ParticipantRecord, overwrite: bool) -> Result<()> {
        if self.exists(&record.id) {
            if !overwrite {
                return Err(AatError::ParticipantExists(record.id.to_string()));
            }
            tracing::warn!("Overwriting presession record of participant {}", record.id);
            self.remove_session_configs(&record.id)?;
        }
        self.save(record)?;
        tracing::info!(
            "Created presession record {:?}",
            self.presession_path(&record.id)
        );
        Ok(())
    }

    /// Delete every session config of `id`; returns how many were removed
    pub fn remove_session_configs(&self, id: &ParticipantId) -> Result<usize> {
        let mut removed = 0;
        for session in 1..=SESSION_COUNT {
            let path = self.session_path(id, session);
            if path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!("Removed {} session configs of participant {}", removed, id);
        }
        Ok(removed)
    }
}
