//! Index reconciliation.

use std::collections::BTreeMap;

use tracing::warn;

use crate::operations::{Edit, IndexDefinition};
use crate::schema::{IndexEntry, PRIMARY_KEY_NAME};

/// Index rows grouped by index name, then by `seq_in_index`.
pub type IndexGroups = BTreeMap<String, BTreeMap<u32, IndexEntry>>;

/// Groups index rows by index name.
#[must_use]
pub fn group_indexes(entries: &[IndexEntry]) -> IndexGroups {
    let mut groups = IndexGroups::new();
    for entry in entries {
        groups
            .entry(entry.index_name.clone())
            .or_default()
            .insert(entry.seq_in_index, entry.clone());
    }
    groups
}

/// Returns index names with `PRIMARY` first, then the rest by name.
#[must_use]
pub fn ordered_names(groups: &IndexGroups) -> Vec<&str> {
    let (primary, others): (Vec<&str>, Vec<&str>) = groups
        .keys()
        .map(String::as_str)
        .partition(|name| *name == PRIMARY_KEY_NAME);
    primary.into_iter().chain(others).collect()
}

/// Returns the definitions of every well-formed index of a table, in
/// rendering order. Malformed groups are skipped.
#[must_use]
pub fn index_definitions(table: &str, entries: &[IndexEntry]) -> Vec<IndexDefinition> {
    let groups = group_indexes(entries);
    ordered_names(&groups)
        .into_iter()
        .filter_map(|name| definition(table, name, &groups[name]))
        .collect()
}

fn definition(
    table: &str,
    name: &str,
    entries: &BTreeMap<u32, IndexEntry>,
) -> Option<IndexDefinition> {
    let definition = IndexDefinition::from_entries(name, entries);
    if definition.is_none() {
        warn!(table = %table, index = %name, "Skipping malformed index");
    }
    definition
}

/// Computes the index edits turning `target` into `source`.
///
/// Target-only indexes are dropped first, sorted by name. Source indexes
/// follow, `PRIMARY` first: missing ones are added, changed ones are
/// dropped and added again.
#[must_use]
pub fn reconcile_indexes(table: &str, source: &[IndexEntry], target: &[IndexEntry]) -> Vec<Edit> {
    let source_groups = group_indexes(source);
    let target_groups = group_indexes(target);
    if source_groups == target_groups {
        return Vec::new();
    }

    let mut edits: Vec<Edit> = target_groups
        .keys()
        .filter(|name| !source_groups.contains_key(*name))
        .map(|name| Edit::drop_index(name))
        .collect();

    for name in ordered_names(&source_groups) {
        let entries = &source_groups[name];
        let existing = target_groups.get(name);
        if existing == Some(entries) {
            continue;
        }
        let Some(index) = definition(table, name, entries) else {
            continue;
        };
        if existing.is_some() {
            edits.push(Edit::drop_index(name));
        }
        edits.push(Edit::AddIndex { index });
    }

    edits
}
