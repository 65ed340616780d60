//! Error types for ratchet-core.

use thiserror::Error;

use crate::version::Version;

/// Result type alias using ratchet-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for migration operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Version string does not match `<major>.<minor>.<patch>_<sequence>`.
    #[error("Invalid version format: {0} (expected eg. 0.0.0_0)")]
    InvalidVersionFormat(String),

    /// A migration definition was rejected at registration time.
    #[error("Invalid migration: {0}")]
    InvalidMigration(String),

    /// Bad or missing command passed to `migrate_to`.
    #[error("Cannot migrate using invalid command: {0}")]
    InvalidCommand(String),

    /// A referenced version is not present in the registry.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A migration action raised an error during a run. Carries the
    /// failing version and the underlying cause.
    #[error("Error while migrating script {version}")]
    MigrationExecutionFailed {
        version: Version,
        #[source]
        source: anyhow::Error,
    },

    /// Storage backend failure (connection, query, consistency).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
