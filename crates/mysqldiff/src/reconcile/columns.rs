//! Column reconciliation.
//!
//! Produces `DROP`, then `ADD`, then `MODIFY` column edits. While edits are
//! generated they are applied to a working copy of the target columns, so
//! every later comparison sees the positions the server would report after
//! the earlier clauses ran.

use std::collections::{BTreeMap, HashSet};

use crate::operations::{Edit, Placement};
use crate::schema::Column;

/// Returns true if two columns are structurally equal.
///
/// Numeric precision is not compared: servers disagree on what they report
/// for non-standard declarations.
#[must_use]
pub fn columns_equal(a: &Column, b: &Column, compare_comments: bool) -> bool {
    a.name == b.name
        && a.ordinal_position == b.ordinal_position
        && a.default == b.default
        && a.nullable == b.nullable
        && a.data_type == b.data_type
        && a.character_maximum_length == b.character_maximum_length
        && a.numeric_scale == b.numeric_scale
        && a.datetime_precision == b.datetime_precision
        && a.character_set == b.character_set
        && a.collation == b.collation
        && a.column_type == b.column_type
        && a.extra == b.extra
        && (!compare_comments || a.comment == b.comment)
}

/// Returns true if both column lists are equal position for position.
#[must_use]
pub fn column_sets_equal(source: &[Column], target: &[Column], compare_comments: bool) -> bool {
    if source.len() != target.len() {
        return false;
    }
    let target_by_position: BTreeMap<u32, &Column> =
        target.iter().map(|c| (c.ordinal_position, c)).collect();
    source.iter().all(|column| {
        target_by_position
            .get(&column.ordinal_position)
            .is_some_and(|other| columns_equal(column, other, compare_comments))
    })
}

/// Decides whether a column definition spells out its character set.
///
/// Columns without a target counterpart always do. Otherwise the clause is
/// needed when the target's character set or collation differ, or when the
/// source collation is not the table default (a `MODIFY` without it would
/// silently reset the column to the table default).
#[must_use]
pub fn explicit_charset(source: &Column, target: Option<&Column>, default_collation: &str) -> bool {
    let (Some(charset), Some(collation)) = (&source.character_set, &source.collation) else {
        return false;
    };
    match target {
        None => true,
        Some(target) => {
            target.character_set.as_ref() != Some(charset)
                || target.collation.as_ref() != Some(collation)
                || collation != default_collation
        }
    }
}

/// Target columns in their current order while edits are applied.
///
/// Positions are always `1..=len`. Edits are applied the way the server
/// runs them: `FIRST` and `AFTER` resolve against the current order.
#[derive(Debug, Clone, Default)]
pub struct WorkingColumns {
    columns: Vec<Column>,
}

impl WorkingColumns {
    /// Creates a working copy of `columns`, ordered by position.
    #[must_use]
    pub fn new(columns: &[Column]) -> Self {
        let mut columns = columns.to_vec();
        columns.sort_by_key(|c| c.ordinal_position);
        let mut working = Self { columns };
        working.renumber();
        working
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the current position of a column.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<u32> {
        self.get(name).map(|c| c.ordinal_position)
    }

    /// Returns the columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Removes a column and closes the gap it leaves.
    pub fn drop_column(&mut self, name: &str) {
        self.columns.retain(|c| c.name != name);
        self.renumber();
    }

    /// Inserts a column where `placement` resolves in the current order,
    /// shifting the columns after it. An `AFTER` naming an unknown column
    /// appends.
    pub fn insert(&mut self, column: &Column, placement: &Placement) {
        let index = match placement {
            Placement::First => 0,
            Placement::After(previous) => self
                .columns
                .iter()
                .position(|c| &c.name == previous)
                .map_or(self.columns.len(), |i| i + 1),
        };
        self.columns.insert(index, column.clone());
        self.renumber();
    }

    /// Applies a column edit. Other edits are ignored.
    pub fn apply(&mut self, edit: &Edit) {
        match edit {
            Edit::DropColumn { name } => self.drop_column(name),
            Edit::AddColumn {
                column, placement, ..
            } => self.insert(column, placement),
            Edit::ModifyColumn {
                column, placement, ..
            } => {
                self.columns.retain(|c| c.name != column.name);
                self.insert(column, placement);
            }
            _ => {}
        }
    }

    fn renumber(&mut self) {
        for (position, column) in (1u32..).zip(self.columns.iter_mut()) {
            column.ordinal_position = position;
        }
    }
}

/// Computes the column edits turning `target` into `source`.
///
/// Both lists are expected in ordinal order. Either list being empty is
/// treated as missing metadata and produces no edits. Applying the edits in
/// order to `target` yields the source columns in source order.
#[must_use]
pub fn reconcile_columns(
    source: &[Column],
    target: &[Column],
    compare_comments: bool,
    default_collation: &str,
) -> Vec<Edit> {
    if source.is_empty() || target.is_empty() {
        return Vec::new();
    }
    if column_sets_equal(source, target, compare_comments) {
        return Vec::new();
    }

    let source_names: HashSet<&str> = source.iter().map(|c| c.name.as_str()).collect();
    let source_by_position: BTreeMap<u32, &Column> =
        source.iter().map(|c| (c.ordinal_position, c)).collect();
    let mut working = WorkingColumns::new(target);
    let mut edits = Vec::new();

    for column in target {
        if !source_names.contains(column.name.as_str()) {
            let edit = Edit::DropColumn {
                name: column.name.clone(),
            };
            working.apply(&edit);
            edits.push(edit);
        }
    }

    // Source order, so every AFTER names a column already in place
    for column in source {
        if working.get(&column.name).is_none() {
            let edit = Edit::AddColumn {
                column: column.clone(),
                explicit_charset: explicit_charset(column, None, default_collation),
                placement: Placement::for_position(column.ordinal_position, &source_by_position),
            };
            working.apply(&edit);
            edits.push(edit);
        }
    }

    for column in source {
        let edit = match working.get(&column.name) {
            Some(current) if !columns_equal(column, current, compare_comments) => {
                Edit::ModifyColumn {
                    column: column.clone(),
                    explicit_charset: explicit_charset(column, Some(current), default_collation),
                    placement: Placement::for_position(column.ordinal_position, &source_by_position),
                }
            }
            _ => continue,
        };
        working.apply(&edit);
        edits.push(edit);
    }

    edits
}
