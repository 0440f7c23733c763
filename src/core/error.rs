use thiserror::Error;

#[derive(Error, Debug)]
pub enum AatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Section '{section}' is missing required text '{field}'")]
    MissingText { section: String, field: &'static str },

    #[error("Unknown condition code: {0}")]
    UnknownCondition(String),

    #[error("Sex '{0}' has no enrollment counter in the randomization table")]
    UnknownSex(String),

    #[error("Invalid participant ID '{0}': expected exactly 6 digits")]
    InvalidParticipantId(String),

    #[error("Invalid rating for '{key}': {value} (expected 0-10)")]
    InvalidRating { key: String, value: i64 },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("No presession record for participant {0}")]
    ParticipantNotFound(String),

    #[error("A presession record for participant {0} already exists")]
    ParticipantExists(String),

    #[error("Session configuration error: {0}")]
    SessionConfig(String),

    #[error("Session configs for participant {id} are incomplete (found {found} of 6)")]
    SessionConfigIncomplete { id: String, found: usize },

    #[error("Participant {0} has already completed all sessions")]
    StudyComplete(String),

    #[error("Settings document is locked by another process: {0}")]
    SettingsLocked(String),

    #[error("Aborted by escape key")]
    Aborted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Atomic write failed: {0}")]
    PersistError(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, AatError>;
