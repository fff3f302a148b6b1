//! Error types.
//!
//! Only the layers around the diff engine fail: catalog access, snapshot
//! files, and configuration parsing. The reconcilers themselves never
//! return errors.

use std::path::PathBuf;

/// Which side of a diff an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The schema being copied from.
    Source,
    /// The schema being brought up to date.
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// Errors that can occur while loading schemas or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The schema does not exist on the server.
    #[error("{side} schema '{schema}' not found")]
    SchemaNotFound {
        /// Side the schema was requested for.
        side: Side,
        /// Schema name.
        schema: String,
    },

    /// Server address is not `user:password@host:port`.
    #[error("Invalid server address '{0}', expected user:password@host:port")]
    InvalidAddress(String),

    /// Database pair is not `source_db:target_db`.
    #[error("Invalid database pair '{0}', expected source_db:target_db")]
    InvalidDatabasePair(String),

    /// Snapshot file holds a different schema than requested.
    #[error("Snapshot file '{path}' holds schema '{found}', expected '{expected}'")]
    SnapshotMismatch {
        /// Path to the snapshot file.
        path: PathBuf,
        /// Requested schema.
        expected: String,
        /// Schema stored in the file.
        found: String,
    },

    /// Database error while reading the catalog.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading/writing snapshot or script files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for catalog and configuration operations.
pub type Result<T> = std::result::Result<T, DiffError>;
