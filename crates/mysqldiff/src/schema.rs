//! Schema descriptor types.
//!
//! These types are read-only snapshots of catalog metadata for one schema.
//! The catalog layer fills them in, the reconcilers only ever compare them.
//! Every optional catalog attribute is an `Option`, so "absent" never
//! compares equal to an empty string or zero.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Index name reserved for the primary key.
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// Data types whose defaults may be the `CURRENT_TIMESTAMP` keyword.
pub const TEMPORAL_TYPES: &[&str] = &["timestamp", "datetime"];

/// Kind of a table-like object in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TableKind {
    /// An ordinary table.
    #[default]
    #[serde(rename = "BASE TABLE")]
    BaseTable,
    /// A view.
    #[serde(rename = "VIEW")]
    View,
}

impl TableKind {
    /// Parses the `TABLE_TYPE` value reported by the catalog.
    ///
    /// Anything that is not a view (`SYSTEM VIEW` included) is treated as a
    /// base table.
    #[must_use]
    pub fn from_catalog(table_type: &str) -> Self {
        if table_type.eq_ignore_ascii_case("VIEW") {
            Self::View
        } else {
            Self::BaseTable
        }
    }

    /// Returns the keyword used in `DROP ... IF EXISTS` statements.
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::BaseTable => "TABLE",
            Self::View => "VIEW",
        }
    }
}

/// Schema-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    /// Schema (database) name.
    pub name: String,
    /// Default character set, e.g. `utf8mb4`.
    pub default_charset: String,
    /// Default collation, e.g. `utf8mb4_general_ci`.
    pub default_collation: String,
}

impl SchemaInfo {
    /// Creates schema defaults.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        default_charset: impl Into<String>,
        default_collation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            default_charset: default_charset.into(),
            default_collation: default_collation.into(),
        }
    }
}

/// Table-level attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Owning schema.
    pub schema: String,
    /// Table name, unique within a schema.
    pub name: String,
    /// Base table or view.
    pub kind: TableKind,
    /// Storage engine (absent for views).
    pub engine: Option<String>,
    /// Table collation (absent for views).
    pub collation: Option<String>,
    /// Table comment.
    #[serde(default)]
    pub comment: String,
}

/// A column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// 1-based position in the table.
    pub ordinal_position: u32,
    /// Default literal, `None` when the column has no default.
    pub default: Option<String>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Bare data type, e.g. `varchar`.
    pub data_type: String,
    /// Maximum length in characters for string types.
    pub character_maximum_length: Option<u64>,
    /// Numeric precision. Never compared.
    pub numeric_precision: Option<u64>,
    /// Numeric scale.
    pub numeric_scale: Option<u64>,
    /// Fractional seconds precision for temporal types.
    pub datetime_precision: Option<u64>,
    /// Character set for string types.
    pub character_set: Option<String>,
    /// Collation for string types.
    pub collation: Option<String>,
    /// Full column type, e.g. `varchar(255)` or `int unsigned`.
    pub column_type: String,
    /// Extra attribute, e.g. `auto_increment`.
    #[serde(default)]
    pub extra: String,
    /// Column comment.
    #[serde(default)]
    pub comment: String,
}

impl Column {
    /// Creates a nullable column without default.
    ///
    /// The data type is derived from the column type (`varchar(32)` gives
    /// `varchar`). The ordinal position is assigned when the column is added
    /// to a [`TableSnapshot`].
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        let column_type = column_type.into();
        let data_type = column_type
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self {
            name: name.into(),
            ordinal_position: 0,
            default: None,
            nullable: true,
            data_type,
            character_maximum_length: None,
            numeric_precision: None,
            numeric_scale: None,
            datetime_precision: None,
            character_set: None,
            collation: None,
            column_type,
            extra: String::new(),
            comment: String::new(),
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default literal.
    #[must_use]
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets character set and collation.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>, collation: impl Into<String>) -> Self {
        self.character_set = Some(charset.into());
        self.collation = Some(collation.into());
        self
    }

    /// Sets the maximum character length.
    #[must_use]
    pub fn max_length(mut self, length: u64) -> Self {
        self.character_maximum_length = Some(length);
        self
    }

    /// Sets numeric precision and scale.
    #[must_use]
    pub fn numeric(mut self, precision: u64, scale: u64) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = Some(scale);
        self
    }

    /// Sets the extra attribute.
    #[must_use]
    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Overrides the ordinal position.
    #[must_use]
    pub fn position(mut self, position: u32) -> Self {
        self.ordinal_position = position;
        self
    }

    /// Returns true for `timestamp` and `datetime` columns.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        TEMPORAL_TYPES
            .iter()
            .any(|t| self.data_type.eq_ignore_ascii_case(t))
    }
}

/// One row of index metadata: a single column of a single index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Index name, `PRIMARY` for the primary key.
    pub index_name: String,
    /// 1-based position of the column in the index.
    pub seq_in_index: u32,
    /// Indexed column.
    pub column_name: String,
    /// Prefix length for partially indexed columns.
    pub sub_part: Option<u32>,
    /// Whether duplicate values are allowed.
    pub non_unique: bool,
    /// Index type, e.g. `BTREE` or `FULLTEXT`.
    pub index_type: String,
}

impl IndexEntry {
    /// Creates a non-unique BTREE index entry.
    #[must_use]
    pub fn new(index_name: impl Into<String>, seq_in_index: u32, column: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            seq_in_index,
            column_name: column.into(),
            sub_part: None,
            non_unique: true,
            index_type: "BTREE".to_string(),
        }
    }

    /// Marks the entry as part of a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.non_unique = false;
        self
    }

    /// Sets the prefix length.
    #[must_use]
    pub fn sub_part(mut self, length: u32) -> Self {
        self.sub_part = Some(length);
        self
    }

    /// Sets the index type.
    #[must_use]
    pub fn index_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = index_type.into();
        self
    }
}

/// Referential rules of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferentialRule {
    /// `MATCH` option, usually `NONE`.
    pub match_option: String,
    /// `ON UPDATE` rule.
    pub update_rule: String,
    /// `ON DELETE` rule.
    pub delete_rule: String,
    /// Referenced table.
    pub referenced_table: String,
}

/// A local/referenced column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColumnUsage {
    /// Column in the owning table.
    pub column_name: String,
    /// Column in the referenced table.
    pub referenced_column_name: String,
}

/// A foreign key constraint.
///
/// `referential` and `columns` are resolved by the catalog from
/// `(schema, constraint name)`; either may be missing when that lookup
/// failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Owning table.
    pub table_name: String,
    /// Constraint type as reported by the catalog.
    pub constraint_type: String,
    /// Referential rules, if resolvable.
    pub referential: Option<ReferentialRule>,
    /// Ordered column pairs.
    #[serde(default)]
    pub columns: Vec<KeyColumnUsage>,
}

impl ForeignKey {
    /// Creates a foreign key on `table_name` referencing `referenced_table`
    /// with `RESTRICT` rules.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        referenced_table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            constraint_type: "FOREIGN KEY".to_string(),
            referential: Some(ReferentialRule {
                match_option: "NONE".to_string(),
                update_rule: "RESTRICT".to_string(),
                delete_rule: "RESTRICT".to_string(),
                referenced_table: referenced_table.into(),
            }),
            columns: Vec::new(),
        }
    }

    /// Appends a column pair.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>, referenced: impl Into<String>) -> Self {
        self.columns.push(KeyColumnUsage {
            column_name: column.into(),
            referenced_column_name: referenced.into(),
        });
        self
    }

    /// Sets the `ON DELETE` rule.
    #[must_use]
    pub fn on_delete(mut self, rule: impl Into<String>) -> Self {
        if let Some(referential) = self.referential.as_mut() {
            referential.delete_rule = rule.into();
        }
        self
    }

    /// Sets the `ON UPDATE` rule.
    #[must_use]
    pub fn on_update(mut self, rule: impl Into<String>) -> Self {
        if let Some(referential) = self.referential.as_mut() {
            referential.update_rule = rule.into();
        }
        self
    }

    /// Drops the referential metadata, as when the catalog lookup fails.
    #[must_use]
    pub fn unresolved(mut self) -> Self {
        self.referential = None;
        self
    }
}

/// View definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// View name.
    pub name: String,
    /// The `SELECT` text as stored by the server.
    pub definition: String,
    /// `DEFINER` or `INVOKER`.
    pub security_type: String,
    /// Definer account, e.g. `root@%`.
    #[serde(default)]
    pub definer: String,
    /// `CHECK OPTION` value.
    #[serde(default)]
    pub check_option: String,
}

/// Everything the catalog knows about one table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Table attributes.
    pub table: Table,
    /// Columns ordered by ordinal position.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Index rows, in any order.
    #[serde(default)]
    pub indexes: Vec<IndexEntry>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// View definition when the object is a view.
    #[serde(default)]
    pub view: Option<View>,
}

impl TableSnapshot {
    /// Creates an InnoDB base table with no columns.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Table {
                schema: schema.into(),
                name: name.into(),
                kind: TableKind::BaseTable,
                engine: Some("InnoDB".to_string()),
                collation: None,
                comment: String::new(),
            },
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            view: None,
        }
    }

    /// Creates a view.
    #[must_use]
    pub fn view(
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let mut snapshot = Self::new(schema, name.clone());
        snapshot.table.kind = TableKind::View;
        snapshot.table.engine = None;
        snapshot.view = Some(View {
            name,
            definition: definition.into(),
            security_type: "DEFINER".to_string(),
            definer: String::new(),
            check_option: "NONE".to_string(),
        });
        snapshot
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.table.name
    }

    /// Appends a column at the next ordinal position.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        let position = u32::try_from(self.columns.len()).unwrap_or(u32::MAX - 1) + 1;
        self.columns.push(column.position(position));
        self
    }

    /// Adds the rows of one index, numbering them from 1.
    #[must_use]
    pub fn index(mut self, name: &str, columns: &[&str], unique: bool) -> Self {
        for (seq, column) in (1..).zip(columns) {
            let mut entry = IndexEntry::new(name, seq, *column);
            entry.non_unique = !unique;
            self.indexes.push(entry);
        }
        self
    }

    /// Adds the primary key rows.
    #[must_use]
    pub fn primary_key(self, columns: &[&str]) -> Self {
        self.index(PRIMARY_KEY_NAME, columns, true)
    }

    /// Adds a raw index row.
    #[must_use]
    pub fn index_entry(mut self, entry: IndexEntry) -> Self {
        self.indexes.push(entry);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Sets the storage engine.
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.table.engine = Some(engine.into());
        self
    }

    /// Sets the table collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.table.collation = Some(collation.into());
        self
    }

    /// Sets the table comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.table.comment = comment.into();
        self
    }

    /// Sets the view security type.
    #[must_use]
    pub fn security(mut self, security_type: impl Into<String>) -> Self {
        if let Some(view) = self.view.as_mut() {
            view.security_type = security_type.into();
        }
        self
    }
}

/// A complete schema snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Schema defaults.
    pub schema: SchemaInfo,
    /// Tables and views ordered by name.
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
}

impl SchemaSnapshot {
    /// Creates an empty `utf8mb4` schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: SchemaInfo::new(name, "utf8mb4", "utf8mb4_general_ci"),
            tables: Vec::new(),
        }
    }

    /// Overrides the schema defaults.
    #[must_use]
    pub fn defaults(mut self, charset: impl Into<String>, collation: impl Into<String>) -> Self {
        self.schema.default_charset = charset.into();
        self.schema.default_collation = collation.into();
        self
    }

    /// Adds a table or view. Its schema is rewritten to this schema.
    #[must_use]
    pub fn table(mut self, mut table: TableSnapshot) -> Self {
        table.table.schema = self.schema.name.clone();
        self.tables.push(table);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.iter().find(|t| t.table.name == name)
    }

    /// Returns table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.table.name.as_str())
    }

    /// Maps every table name to its index in `tables`.
    #[must_use]
    pub fn name_index(&self) -> HashMap<String, usize> {
        self.tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.table.name.clone(), i))
            .collect()
    }
}

/// Splits a collation name into its character set, e.g.
/// `utf8mb4_general_ci` gives `utf8mb4`.
#[must_use]
pub fn charset_of_collation(collation: &str) -> &str {
    collation.split('_').next().unwrap_or(collation)
}
