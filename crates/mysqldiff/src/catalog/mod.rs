//! Schema catalogs.
//!
//! A catalog materializes a [`SchemaSnapshot`] before diffing starts, so
//! every I/O failure surfaces before the first table is compared.

mod mysql;

pub use mysql::{MysqlCatalog, connect};

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{DiffError, Result};
use crate::schema::SchemaSnapshot;

/// Source of schema snapshots.
pub trait Catalog: Send + Sync {
    /// Loads every table, view, column, index and (when enabled) foreign
    /// key of `schema`.
    fn load_schema(&self, schema: &str) -> impl Future<Output = Result<SchemaSnapshot>> + Send;
}

/// A snapshot stored as a JSON file.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Creates a snapshot file handle.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot.
    pub async fn read(&self) -> Result<SchemaSnapshot> {
        let json = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Writes the snapshot as pretty-printed JSON.
    pub async fn write(&self, snapshot: &SchemaSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, json).await?;
        info!(
            path = %self.path.display(),
            schema = %snapshot.schema.name,
            tables = snapshot.tables.len(),
            "Wrote snapshot"
        );
        Ok(())
    }
}

impl Catalog for SnapshotFile {
    async fn load_schema(&self, schema: &str) -> Result<SchemaSnapshot> {
        let snapshot = self.read().await?;
        if snapshot.schema.name != schema {
            return Err(DiffError::SnapshotMismatch {
                path: self.path.clone(),
                expected: schema.to_string(),
                found: snapshot.schema.name,
            });
        }
        Ok(snapshot)
    }
}
