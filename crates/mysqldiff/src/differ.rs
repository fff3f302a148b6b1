//! Schema differ.
//!
//! Fans out one task per source table under a bounded admission window,
//! collects the rendered blocks in a [`DiffResults`] aggregator and sorts
//! them by table name once every task has finished. Output order never
//! depends on task completion order.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use crate::dialect::{DdlDialect, dialect_for};
use crate::options::DiffOptions;
use crate::reconcile::{ViewAction, reconcile_table, reconcile_view};
use crate::schema::{SchemaInfo, SchemaSnapshot, TableKind, TableSnapshot};

/// Rendered blocks keyed by table name.
///
/// Table names are also kept in insertion order so the final sort works on
/// a plain list.
#[derive(Debug, Default)]
pub struct DiffResults {
    keys: Vec<String>,
    blocks: HashMap<String, String>,
}

impl DiffResults {
    /// Creates an empty result store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the block for a table. A second block for the same table
    /// replaces the first.
    pub fn record(&mut self, table: impl Into<String>, block: impl Into<String>) {
        let table = table.into();
        if self.blocks.insert(table.clone(), block.into()).is_none() {
            self.keys.push(table);
        }
    }

    /// Gets the block recorded for a table.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&str> {
        self.blocks.get(table).map(String::as_str)
    }

    /// Returns the number of recorded tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Consumes the store, returning `(table, block)` pairs sorted by table
    /// name.
    #[must_use]
    pub fn into_sorted(mut self) -> Vec<(String, String)> {
        self.keys.sort();
        self.keys
            .into_iter()
            .filter_map(|key| {
                let block = self.blocks.remove(&key)?;
                Some((key, block))
            })
            .collect()
    }
}

/// The final migration script.
///
/// Displays as `SET NAMES`, the optional foreign key guards and every block
/// separated by a blank line. A script without blocks displays as nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffScript {
    charset: String,
    foreign_key_checks: bool,
    blocks: Vec<(String, String)>,
}

impl DiffScript {
    /// Creates a script from sorted blocks.
    #[must_use]
    pub fn new(
        charset: impl Into<String>,
        foreign_key_checks: bool,
        blocks: Vec<(String, String)>,
    ) -> Self {
        Self {
            charset: charset.into(),
            foreign_key_checks,
            blocks,
        }
    }

    /// Returns true if there is nothing to migrate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns `(table, block)` pairs in output order.
    #[must_use]
    pub fn blocks(&self) -> &[(String, String)] {
        &self.blocks
    }

    /// Returns the names of the affected tables in output order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|(table, _)| table.as_str())
    }
}

impl fmt::Display for DiffScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.blocks.is_empty() {
            return Ok(());
        }

        writeln!(f, "SET NAMES {};", self.charset)?;
        if self.foreign_key_checks {
            writeln!(f, "SET FOREIGN_KEY_CHECKS=0;")?;
        }
        writeln!(f)?;

        for (i, (_, block)) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{block}")?;
        }

        if self.foreign_key_checks {
            writeln!(f)?;
            writeln!(f, "SET FOREIGN_KEY_CHECKS=1;")?;
        }
        Ok(())
    }
}

/// Diffs two schema snapshots.
#[derive(Clone)]
pub struct SchemaDiffer {
    options: DiffOptions,
    dialect: Arc<dyn DdlDialect>,
}

impl fmt::Debug for SchemaDiffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDiffer")
            .field("options", &self.options)
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

impl SchemaDiffer {
    /// Creates a differ with the dialect selected by `options`.
    #[must_use]
    pub fn new(options: DiffOptions) -> Self {
        let dialect = Arc::from(dialect_for(options.tidb, options.compare_comments));
        Self { options, dialect }
    }

    /// Creates a differ with a custom dialect.
    #[must_use]
    pub fn with_dialect(options: DiffOptions, dialect: Arc<dyn DdlDialect>) -> Self {
        Self { options, dialect }
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Renders the drop statements for every target object missing from
    /// the source, as `(name, statement)` pairs in target order.
    #[must_use]
    pub fn drops(&self, source: &SchemaSnapshot, target: &SchemaSnapshot) -> Vec<(String, String)> {
        let source_names: HashSet<&str> = source.table_names().collect();
        target
            .tables
            .iter()
            .filter(|t| !source_names.contains(t.name()))
            .map(|t| {
                (
                    t.name().to_string(),
                    self.dialect.drop_object(t.name(), t.table.kind),
                )
            })
            .collect()
    }

    /// Renders the block for one source table, or `None` when the target
    /// already matches.
    #[must_use]
    pub fn diff_table(
        &self,
        source_schema: &SchemaInfo,
        source: &TableSnapshot,
        target_schema: &SchemaInfo,
        target: Option<&TableSnapshot>,
    ) -> Option<String> {
        let name = source.name();
        match (source.table.kind, target) {
            (TableKind::View, target) => self.diff_view(source_schema, source, target_schema, target),
            (TableKind::BaseTable, None) => {
                debug!(table = %name, "Creating table");
                self.create_table(source_schema, source)
            }
            (TableKind::BaseTable, Some(target)) if target.table.kind == TableKind::View => {
                debug!(table = %name, "Replacing view with table");
                self.replace_object(target, self.create_table(source_schema, source))
            }
            (TableKind::BaseTable, Some(target)) => {
                let default_collation = source
                    .table
                    .collation
                    .as_deref()
                    .unwrap_or(source_schema.default_collation.as_str());
                let plan = reconcile_table(source, target, &self.options, default_collation);
                debug!(
                    table = %name,
                    preamble = plan.preamble.len(),
                    clauses = plan.clauses.len(),
                    "Reconciled table"
                );
                self.dialect.alter_table(&plan)
            }
        }
    }

    fn create_table(&self, schema: &SchemaInfo, table: &TableSnapshot) -> Option<String> {
        let sql = self
            .dialect
            .create_table(table, schema, self.options.foreign_keys);
        if sql.is_none() {
            warn!(table = %table.name(), "Skipping table without columns");
        }
        sql
    }

    fn diff_view(
        &self,
        source_schema: &SchemaInfo,
        source: &TableSnapshot,
        target_schema: &SchemaInfo,
        target: Option<&TableSnapshot>,
    ) -> Option<String> {
        let name = source.name();
        let Some(view) = &source.view else {
            warn!(table = %name, "Skipping view without definition");
            return None;
        };

        let action = match target {
            None => ViewAction::Create,
            Some(target) if target.table.kind == TableKind::BaseTable => {
                debug!(table = %name, "Replacing table with view");
                let create = self.dialect.create_view(view, &source_schema.name, false);
                return self.replace_object(target, Some(create));
            }
            Some(target) => match &target.view {
                Some(existing) => reconcile_view(
                    view,
                    &source_schema.name,
                    Some((existing, target_schema.name.as_str())),
                ),
                None => ViewAction::Replace,
            },
        };

        debug!(table = %name, action = ?action, "Reconciled view");
        match action {
            ViewAction::Unchanged => None,
            ViewAction::Create => Some(self.dialect.create_view(view, &source_schema.name, false)),
            ViewAction::Replace => Some(self.dialect.create_view(view, &source_schema.name, true)),
        }
    }

    fn replace_object(&self, target: &TableSnapshot, create: Option<String>) -> Option<String> {
        let drop = self.dialect.drop_object(target.name(), target.table.kind);
        Some(match create {
            Some(create) => format!("{drop}\n{create}"),
            None => drop,
        })
    }

    /// Diffs every table of `source` against `target`.
    ///
    /// Drops are computed first. Each source table then runs as its own
    /// task once it holds one of `concurrency` permits. A task that panics
    /// is logged and its table left out of the script.
    pub async fn diff(&self, source: Arc<SchemaSnapshot>, target: Arc<SchemaSnapshot>) -> DiffScript {
        let results = Arc::new(Mutex::new(DiffResults::new()));

        {
            let mut results = results.lock().await;
            for (name, statement) in self.drops(&source, &target) {
                debug!(table = %name, "Dropping object");
                results.record(name, statement);
            }
        }

        let target_index = Arc::new(target.name_index());
        let sem = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut handles = Vec::with_capacity(source.tables.len());

        for index in 0..source.tables.len() {
            let permit = Arc::clone(&sem).acquire_owned().await.ok();

            let differ = self.clone();
            let source = Arc::clone(&source);
            let target = Arc::clone(&target);
            let target_index = Arc::clone(&target_index);
            let results = Arc::clone(&results);
            let handle = tokio::task::spawn(async move {
                let _permit = permit;

                let table = &source.tables[index];
                let existing = target_index.get(table.name()).map(|&i| &target.tables[i]);
                let block =
                    differ.diff_table(&source.schema, table, &target.schema, existing);
                if let Some(block) = block {
                    results.lock().await.record(table.name(), block);
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "Table diff task failed");
            }
        }

        let results = std::mem::take(&mut *results.lock().await);
        info!(
            tables = source.tables.len(),
            changed = results.len(),
            "Diff complete"
        );

        DiffScript::new(
            source.schema.default_charset.clone(),
            self.options.foreign_keys,
            results.into_sorted(),
        )
    }
}
