pub mod config;
pub mod error;
pub mod persist;
pub mod types;

pub use config::ExperimentConfig;
pub use error::{AatError, Result};
pub use types::{Category, ParticipantId, Sex, StudyPart, TrialType};
