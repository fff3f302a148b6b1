//! Foreign key reconciliation.

use std::collections::BTreeMap;

use tracing::warn;

use crate::operations::{Edit, ForeignKeyDefinition};
use crate::schema::ForeignKey;

/// Foreign key edits for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintEdits {
    /// Drops of replaced constraints, run before the main alter.
    pub preamble: Vec<Edit>,
    /// Clauses of the main alter.
    pub clauses: Vec<Edit>,
}

/// Returns true if two constraints are equal.
///
/// Column pairs are compared in order, so reordering the columns of a key
/// counts as a change.
#[must_use]
pub fn foreign_keys_equal(a: &ForeignKey, b: &ForeignKey) -> bool {
    a.name == b.name
        && a.table_name == b.table_name
        && a.constraint_type == b.constraint_type
        && a.referential == b.referential
        && a.columns == b.columns
}

/// Resolves the definitions of a table's constraints, sorted by name.
/// Unresolvable constraints are skipped.
#[must_use]
pub fn foreign_key_definitions(table: &str, foreign_keys: &[ForeignKey]) -> Vec<ForeignKeyDefinition> {
    by_name(foreign_keys)
        .into_values()
        .filter_map(|fk| resolve(table, fk))
        .collect()
}

fn by_name(foreign_keys: &[ForeignKey]) -> BTreeMap<&str, &ForeignKey> {
    foreign_keys.iter().map(|fk| (fk.name.as_str(), fk)).collect()
}

fn resolve(table: &str, foreign_key: &ForeignKey) -> Option<ForeignKeyDefinition> {
    let definition = ForeignKeyDefinition::resolve(foreign_key);
    if definition.is_none() {
        warn!(
            table = %table,
            constraint = %foreign_key.name,
            "Skipping foreign key with unresolved referential metadata"
        );
    }
    definition
}

/// Computes the foreign key edits turning `target` into `source`.
#[must_use]
pub fn reconcile_foreign_keys(
    table: &str,
    source: &[ForeignKey],
    target: &[ForeignKey],
) -> ConstraintEdits {
    let source = by_name(source);
    let target = by_name(target);
    let mut edits = ConstraintEdits::default();

    for name in target.keys().filter(|name| !source.contains_key(*name)) {
        edits.clauses.push(Edit::DropForeignKey {
            name: (*name).to_string(),
        });
    }

    for (name, foreign_key) in &source {
        let existing = target.get(name);
        if existing.is_some_and(|other| foreign_keys_equal(foreign_key, other)) {
            continue;
        }
        let Some(definition) = resolve(table, foreign_key) else {
            continue;
        };
        if existing.is_some() {
            edits.preamble.push(Edit::DropForeignKey {
                name: (*name).to_string(),
            });
        }
        edits.clauses.push(Edit::AddForeignKey {
            foreign_key: definition,
        });
    }

    edits
}
