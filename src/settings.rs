//! Shared settings document (`settings.json`)
//!
//! Holds display parameters, the joystick backend, the stimulus rotation,
//! the condition codes and the per-condition, per-sex enrollment counters.
//! The counters are shared across participants, so every mutation goes
//! through [`SettingsStore::update`], which holds a file lock for the whole
//! read-modify-write cycle.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{AatError, Result};
use crate::core::persist::{read_json, write_json_atomic, FileLock};
use crate::core::types::Sex;

/// How long an update waits for another process to release the settings lock
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Joystick backends the original rig supports
pub const JOYSTICK_BACKENDS: [&str; 2] = ["pyglet", "pygame"];

fn default_n_scenarios() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "Window Size")]
    pub window_size: (f64, f64),

    #[serde(rename = "Window Color")]
    pub window_color: String,

    #[serde(rename = "Font Size")]
    pub font_size: f64,

    #[serde(rename = "Font Color")]
    pub font_color: String,

    #[serde(rename = "Joystick Backend")]
    pub joystick_backend: String,

    /// Degrees the stimulus is rotated once per trial
    #[serde(rename = "Rotation Degrees")]
    pub rotation_degrees: f32,

    /// Condition code -> label, e.g. `"3" -> "AB'"`
    #[serde(rename = "Condition Codes")]
    pub condition_codes: IndexMap<String, String>,

    /// Condition code -> sex -> number of enrolled participants
    ///
    /// Document order is significant: ties in balancing go to the first
    /// condition listed.
    #[serde(rename = "Randomization")]
    pub randomization: IndexMap<String, IndexMap<Sex, u32>>,

    /// How many top-rated scenarios are offered for selection
    #[serde(rename = "N Scenarios", default = "default_n_scenarios")]
    pub n_scenarios: usize,

    /// Keys this crate does not interpret; preserved on rewrite
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate eagerly; every failure here is a fatal configuration error
    pub fn validate(&self) -> Result<()> {
        if !JOYSTICK_BACKENDS.contains(&self.joystick_backend.as_str()) {
            return Err(AatError::Config(format!(
                "Joystick Backend must be one of {:?}, got '{}'",
                JOYSTICK_BACKENDS, self.joystick_backend
            )));
        }

        let (width, height) = self.window_size;
        if !(width > 0.0 && height > 0.0) {
            return Err(AatError::Config(format!(
                "Window Size must be two positive numbers, got ({}, {})",
                width, height
            )));
        }

        if self.condition_codes.is_empty() {
            return Err(AatError::Config("Add at least one condition".into()));
        }

        for code in self.condition_codes.keys() {
            if !self.randomization.contains_key(code) {
                return Err(AatError::Config(format!(
                    "Condition '{}' has no Randomization entry",
                    code
                )));
            }
        }

        if self.n_scenarios == 0 {
            return Err(AatError::Config("N Scenarios must be at least 1".into()));
        }

        Ok(())
    }

    /// Label of a condition code, e.g. `"AB'C"`
    pub fn condition_label(&self, code: &str) -> Result<&str> {
        self.condition_codes
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| AatError::UnknownCondition(code.to_string()))
    }

    /// Enrollment count of one condition for one sex
    pub fn enrollment(&self, code: &str, sex: Sex) -> Option<u32> {
        self.randomization.get(code)?.get(&sex).copied()
    }
}

/// Handle on the settings file used for locked read-modify-write cycles
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the current document
    pub fn load(&self) -> Result<Settings> {
        let settings: Settings = read_json(&self.path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Run `f` on the freshest document while holding the lock, then persist it
    ///
    /// The document is only written when `f` succeeds.
    pub fn update<T>(&self, f: impl FnOnce(&mut Settings) -> Result<T>) -> Result<T> {
        let _lock = FileLock::acquire(&self.path, LOCK_TIMEOUT)?;
        let mut settings = self.load()?;
        let out = f(&mut settings)?;
        settings.validate()?;
        write_json_atomic(&self.path, &settings)?;
        Ok(out)
    }
}
