//! Error types for homestead-core.

use thiserror::Error;

/// Result type for homestead-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in homestead operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of range or unparsable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A persisted record is structurally valid JSON but semantically broken.
    #[error("corrupt store record: {0}")]
    CorruptRecord(String),

    /// A participant id could not be parsed.
    #[error("invalid participant id: {0}")]
    InvalidParticipant(#[from] uuid::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
