//! Structural diff and DDL synthesis for MySQL schemas.
//!
//! `mysqldiff` compares a source schema with a target schema and renders the
//! DDL script that brings the target in line with the source:
//! - Tables and views missing from the target are created, extra ones dropped
//! - Columns are added, modified and dropped with `FIRST`/`AFTER` placement
//! - Indexes and (optionally) foreign keys are rebuilt when they differ
//!
//! Nothing is ever executed; the output is a script for review.
//!
//! # Architecture
//!
//! - **Schema** - Read-only snapshots of catalog metadata
//! - **Reconcilers** - Per-facet comparison producing [`operations::Edit`]s
//! - **Dialect** - Renders edits as MySQL or TiDB-compatible statements
//! - **Differ** - Runs one task per table and sorts the results
//! - **Catalog** - Loads snapshots from a server or a JSON file
//!
//! # Example
//!
//! ```rust
//! use mysqldiff::prelude::*;
//!
//! let source = SchemaSnapshot::new("app").table(
//!     TableSnapshot::new("app", "users")
//!         .column(Column::new("id", "bigint").not_null())
//!         .column(Column::new("email", "varchar(255)"))
//!         .primary_key(&["id"]),
//! );
//! let target = SchemaSnapshot::new("app").table(
//!     TableSnapshot::new("app", "users")
//!         .column(Column::new("id", "bigint").not_null())
//!         .primary_key(&["id"]),
//! );
//!
//! let differ = SchemaDiffer::new(DiffOptions::new());
//! let block = differ
//!     .diff_table(&source.schema, &source.tables[0], &target.schema, target.get_table("users"))
//!     .unwrap();
//! assert_eq!(
//!     block,
//!     "ALTER TABLE `users`\n  ADD COLUMN `email` varchar(255) DEFAULT NULL AFTER `id`;"
//! );
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Diff two schemas on the same server
//! mysqldiff diff --source root:secret@127.0.0.1:3306 --db staging:prod
//!
//! # Diff across servers, one statement per clause
//! mysqldiff diff --source root@staging:3306 --target root@prod:3306 --db app:app --tidb
//!
//! # Dump a snapshot and diff offline
//! mysqldiff dump --source root@prod:3306 --db app --output prod.json
//! mysqldiff diff --source-snapshot staging.json --target-snapshot prod.json
//! ```

pub mod catalog;
pub mod config;
pub mod dialect;
pub mod differ;
pub mod error;
pub mod operations;
pub mod options;
pub mod reconcile;
pub mod schema;

use std::sync::Arc;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::catalog::{Catalog, MysqlCatalog, SnapshotFile};
    pub use crate::config::{DatabasePair, ServerAddress};
    pub use crate::dialect::{DdlDialect, MysqlDialect, TidbDialect};
    pub use crate::differ::{DiffResults, DiffScript, SchemaDiffer};
    pub use crate::error::{DiffError, Result, Side};
    pub use crate::operations::{Edit, IndexDefinition, IndexKind, Placement, TablePlan};
    pub use crate::options::DiffOptions;
    pub use crate::schema::{
        Column, ForeignKey, IndexEntry, SchemaInfo, SchemaSnapshot, TableKind, TableSnapshot,
        View,
    };
}

/// Diffs two snapshots with the given options.
pub async fn diff_schemas(
    source: schema::SchemaSnapshot,
    target: schema::SchemaSnapshot,
    options: options::DiffOptions,
) -> differ::DiffScript {
    differ::SchemaDiffer::new(options)
        .diff(Arc::new(source), Arc::new(target))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    fn snapshot(name: &str) -> SchemaSnapshot {
        SchemaSnapshot::new(name).table(
            TableSnapshot::new(name, "users")
                .column(Column::new("id", "bigint").not_null().extra("auto_increment"))
                .primary_key(&["id"]),
        )
    }

    #[test]
    fn test_diff_schemas_identical() {
        let script = tokio_test::block_on(diff_schemas(
            snapshot("app"),
            snapshot("app"),
            DiffOptions::new(),
        ));
        assert!(script.is_empty());
        assert_eq!(script.to_string(), "");
    }

    #[test]
    fn test_diff_schemas_across_schema_names() {
        let script = tokio_test::block_on(diff_schemas(
            snapshot("staging"),
            snapshot("prod"),
            DiffOptions::new(),
        ));
        assert!(script.is_empty());
    }
}
