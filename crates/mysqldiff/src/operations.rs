//! Edits produced by the reconcilers.
//!
//! An [`Edit`] describes one DDL clause before it is rendered. Edits carry
//! everything the dialect needs (the full source column, the placement, the
//! resolved index or foreign key) so rendering never looks back at the
//! snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::{Column, ForeignKey, IndexEntry, PRIMARY_KEY_NAME};

/// Where an added or modified column goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// `FIRST`
    First,
    /// `AFTER <column>`
    After(String),
}

impl Placement {
    /// Returns the placement for `position` given the source columns indexed
    /// by position.
    #[must_use]
    pub fn for_position(position: u32, by_position: &BTreeMap<u32, &Column>) -> Self {
        position
            .checked_sub(1)
            .and_then(|previous| by_position.get(&previous))
            .map_or(Self::First, |column| Self::After(column.name.clone()))
    }
}

/// Kind of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// The primary key.
    Primary,
    /// A unique key.
    Unique,
    /// A plain key.
    Key,
    /// A full-text key.
    Fulltext,
    /// A spatial key.
    Spatial,
}

/// One column of an index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// Prefix length.
    pub sub_part: Option<u32>,
}

/// An index, assembled from its catalog rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Index kind.
    pub kind: IndexKind,
    /// Columns in index order.
    pub columns: Vec<IndexColumn>,
}

impl IndexDefinition {
    /// Builds a definition from the rows of one index keyed by
    /// `seq_in_index`.
    ///
    /// Returns `None` for a malformed group: no rows, or positions that are
    /// not exactly `1..=n`.
    #[must_use]
    pub fn from_entries(name: &str, entries: &BTreeMap<u32, IndexEntry>) -> Option<Self> {
        let first = entries.values().next()?;
        let contiguous = entries.keys().copied().eq(1..=u32::try_from(entries.len()).ok()?);
        if !contiguous {
            return None;
        }

        let kind = if first.non_unique {
            match first.index_type.to_ascii_uppercase().as_str() {
                "FULLTEXT" => IndexKind::Fulltext,
                "SPATIAL" => IndexKind::Spatial,
                _ => IndexKind::Key,
            }
        } else if name == PRIMARY_KEY_NAME {
            IndexKind::Primary
        } else {
            IndexKind::Unique
        };

        Some(Self {
            name: name.to_string(),
            kind,
            columns: entries
                .values()
                .map(|entry| IndexColumn {
                    name: entry.column_name.clone(),
                    sub_part: entry.sub_part,
                })
                .collect(),
        })
    }
}

/// A foreign key whose referential metadata has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    /// Constraint name.
    pub name: String,
    /// Local columns, in key order.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns, in key order.
    pub referenced_columns: Vec<String>,
    /// `ON DELETE` rule.
    pub on_delete: String,
    /// `ON UPDATE` rule.
    pub on_update: String,
}

impl ForeignKeyDefinition {
    /// Resolves a catalog foreign key. Returns `None` when the referential
    /// rules or the key columns are missing.
    #[must_use]
    pub fn resolve(foreign_key: &ForeignKey) -> Option<Self> {
        let referential = foreign_key.referential.as_ref()?;
        if foreign_key.columns.is_empty() {
            return None;
        }
        Some(Self {
            name: foreign_key.name.clone(),
            columns: foreign_key
                .columns
                .iter()
                .map(|c| c.column_name.clone())
                .collect(),
            referenced_table: referential.referenced_table.clone(),
            referenced_columns: foreign_key
                .columns
                .iter()
                .map(|c| c.referenced_column_name.clone())
                .collect(),
            on_delete: referential.delete_rule.clone(),
            on_update: referential.update_rule.clone(),
        })
    }
}

/// A single DDL clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edit {
    /// `DROP COLUMN`
    DropColumn {
        /// Column name.
        name: String,
    },

    /// `ADD COLUMN ... FIRST|AFTER`
    AddColumn {
        /// Source column.
        column: Column,
        /// Whether to spell out `CHARACTER SET ... COLLATE ...`.
        explicit_charset: bool,
        /// Target position.
        placement: Placement,
    },

    /// `MODIFY COLUMN ... FIRST|AFTER`
    ModifyColumn {
        /// Source column.
        column: Column,
        /// Whether to spell out `CHARACTER SET ... COLLATE ...`.
        explicit_charset: bool,
        /// Target position.
        placement: Placement,
    },

    /// `DROP INDEX`
    DropIndex {
        /// Index name.
        name: String,
    },

    /// `DROP PRIMARY KEY`
    DropPrimaryKey,

    /// `ADD KEY|UNIQUE KEY|PRIMARY KEY`
    AddIndex {
        /// Index to add.
        index: IndexDefinition,
    },

    /// `DROP FOREIGN KEY`
    DropForeignKey {
        /// Constraint name.
        name: String,
    },

    /// `ADD CONSTRAINT ... FOREIGN KEY`
    AddForeignKey {
        /// Constraint to add.
        foreign_key: ForeignKeyDefinition,
    },

    /// `ENGINE=`
    SetEngine {
        /// New engine.
        engine: String,
    },

    /// `CHARACTER SET=..., COLLATE=...`
    SetCharset {
        /// New character set.
        charset: String,
        /// New collation.
        collation: String,
    },

    /// `COMMENT=`
    SetComment {
        /// New comment.
        comment: String,
    },
}

impl Edit {
    /// Creates the drop edit for an index, using `DROP PRIMARY KEY` for the
    /// primary key.
    #[must_use]
    pub fn drop_index(name: &str) -> Self {
        if name == PRIMARY_KEY_NAME {
            Self::DropPrimaryKey
        } else {
            Self::DropIndex {
                name: name.to_string(),
            }
        }
    }
}

/// All edits for one existing table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePlan {
    /// Table name.
    pub table: String,
    /// Edits that must run as their own statements before the main alter.
    pub preamble: Vec<Edit>,
    /// Clauses of the main alter, in order.
    pub clauses: Vec<Edit>,
}

impl TablePlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Returns true if nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.preamble.is_empty() && self.clauses.is_empty()
    }
}
