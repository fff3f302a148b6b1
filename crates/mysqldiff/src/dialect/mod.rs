//! DDL dialects.
//!
//! A dialect turns [`Edit`]s and snapshots into statement text. All MySQL
//! syntax lives in the provided methods of [`DdlDialect`]; implementations
//! only decide how the clauses of one table's alter are grouped into
//! statements.

mod mysql;
mod tidb;

pub use mysql::MysqlDialect;
pub use tidb::TidbDialect;

use crate::operations::{Edit, ForeignKeyDefinition, IndexDefinition, IndexKind, Placement, TablePlan};
use crate::reconcile::constraints::foreign_key_definitions;
use crate::reconcile::indexes::index_definitions;
use crate::reconcile::views::strip_schema;
use crate::schema::{Column, SchemaInfo, TableKind, TableSnapshot, View, charset_of_collation};

/// Marker the server appends to the extra attribute of columns with an
/// expression default.
const GENERATED_DEFAULT_MARKER: &str = "DEFAULT_GENERATED";

/// Keyword accepted unquoted as the default of temporal columns.
const CURRENT_TIMESTAMP: &str = "CURRENT_TIMESTAMP";

/// Trait for DDL generation.
pub trait DdlDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns whether column and table comments are rendered.
    fn comments(&self) -> bool;

    /// Groups the rendered clauses of one table into statements.
    fn alter_statements(&self, table: &str, clauses: &[String]) -> Vec<String>;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{name}`")
    }

    /// Escapes text placed inside single quotes.
    fn escape(&self, text: &str) -> String {
        text.replace('\'', "\\'")
    }

    /// Generates a column definition without the column name.
    ///
    /// The parts are, in order: column type, character set, nullability and
    /// default, extra attribute, comment.
    fn column_definition(&self, column: &Column, explicit_charset: bool) -> String {
        let mut sql = column.column_type.clone();

        if explicit_charset {
            if let (Some(charset), Some(collation)) = (&column.character_set, &column.collation) {
                sql.push_str(&format!(" CHARACTER SET {charset} COLLATE {collation}"));
            }
        }

        sql.push_str(&self.nullability_default(column));
        sql.push_str(&self.extra(column));

        if self.comments() {
            sql.push_str(&format!(" COMMENT '{}'", self.escape(&column.comment)));
        }

        sql
    }

    /// Generates the ` [NOT] NULL DEFAULT ...` part of a column definition.
    fn nullability_default(&self, column: &Column) -> String {
        let temporal = column.is_temporal();
        let literal = column.default.as_deref().map(|value| {
            if temporal && is_current_timestamp(value) {
                value.to_string()
            } else {
                format!("'{}'", self.escape(value))
            }
        });

        match (column.nullable, literal) {
            (false, Some(literal)) => format!(" NOT NULL DEFAULT {literal}"),
            (false, None) => " NOT NULL".to_string(),
            (true, Some(literal)) if temporal => format!(" NULL DEFAULT {literal}"),
            (true, Some(literal)) => format!(" DEFAULT {literal}"),
            (true, None) if temporal => " NULL DEFAULT NULL".to_string(),
            (true, None) => " DEFAULT NULL".to_string(),
        }
    }

    /// Generates the extra attribute, e.g. ` AUTO_INCREMENT`.
    fn extra(&self, column: &Column) -> String {
        let extra = column
            .extra
            .to_uppercase()
            .replacen(GENERATED_DEFAULT_MARKER, "", 1);
        let extra = extra.trim();
        if extra.is_empty() {
            String::new()
        } else {
            format!(" {extra}")
        }
    }

    /// Generates an index definition, e.g. ``KEY `idx` (`a`,`b`(10))``.
    fn index_definition(&self, index: &IndexDefinition) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| match c.sub_part {
                Some(length) => format!("{}({length})", self.quote_identifier(&c.name)),
                None => self.quote_identifier(&c.name),
            })
            .collect();
        let columns = columns.join(",");
        let name = self.quote_identifier(&index.name);

        match index.kind {
            IndexKind::Primary => format!("PRIMARY KEY ({columns})"),
            IndexKind::Unique => format!("UNIQUE KEY {name} ({columns})"),
            IndexKind::Key => format!("KEY {name} ({columns})"),
            IndexKind::Fulltext => format!("FULLTEXT KEY {name} ({columns})"),
            IndexKind::Spatial => format!("SPATIAL KEY {name} ({columns})"),
        }
    }

    /// Generates a foreign key definition.
    fn foreign_key_definition(&self, foreign_key: &ForeignKeyDefinition) -> String {
        let quote_all = |columns: &[String]| {
            columns
                .iter()
                .map(|c| self.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(",")
        };
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            self.quote_identifier(&foreign_key.name),
            quote_all(&foreign_key.columns),
            self.quote_identifier(&foreign_key.referenced_table),
            quote_all(&foreign_key.referenced_columns),
            foreign_key.on_delete,
            foreign_key.on_update,
        )
    }

    /// Generates one alter clause, without indentation or terminator.
    fn clause(&self, edit: &Edit) -> String {
        match edit {
            Edit::DropColumn { name } => format!("DROP COLUMN {}", self.quote_identifier(name)),
            Edit::AddColumn {
                column,
                explicit_charset,
                placement,
            } => format!(
                "ADD COLUMN {} {} {}",
                self.quote_identifier(&column.name),
                self.column_definition(column, *explicit_charset),
                self.placement(placement)
            ),
            Edit::ModifyColumn {
                column,
                explicit_charset,
                placement,
            } => format!(
                "MODIFY COLUMN {} {} {}",
                self.quote_identifier(&column.name),
                self.column_definition(column, *explicit_charset),
                self.placement(placement)
            ),
            Edit::DropIndex { name } => format!("DROP INDEX {}", self.quote_identifier(name)),
            Edit::DropPrimaryKey => "DROP PRIMARY KEY".to_string(),
            Edit::AddIndex { index } => format!("ADD {}", self.index_definition(index)),
            Edit::DropForeignKey { name } => {
                format!("DROP FOREIGN KEY {}", self.quote_identifier(name))
            }
            Edit::AddForeignKey { foreign_key } => {
                format!("ADD {}", self.foreign_key_definition(foreign_key))
            }
            Edit::SetEngine { engine } => format!("ENGINE={engine}"),
            Edit::SetCharset { charset, collation } => {
                format!("CHARACTER SET={charset}, COLLATE={collation}")
            }
            Edit::SetComment { comment } => format!("COMMENT='{}'", self.escape(comment)),
        }
    }

    /// Generates a `FIRST` or `AFTER` clause.
    fn placement(&self, placement: &Placement) -> String {
        match placement {
            Placement::First => "FIRST".to_string(),
            Placement::After(column) => format!("AFTER {}", self.quote_identifier(column)),
        }
    }

    /// Renders a table plan. Returns `None` for an empty plan.
    ///
    /// Preamble edits become standalone statements ahead of the alter.
    fn alter_table(&self, plan: &TablePlan) -> Option<String> {
        if plan.is_empty() {
            return None;
        }
        let table = self.quote_identifier(&plan.table);
        let mut statements: Vec<String> = plan
            .preamble
            .iter()
            .map(|edit| format!("ALTER TABLE {table} {};", self.clause(edit)))
            .collect();

        let clauses: Vec<String> = plan.clauses.iter().map(|edit| self.clause(edit)).collect();
        if !clauses.is_empty() {
            statements.extend(self.alter_statements(&plan.table, &clauses));
        }

        Some(statements.join("\n"))
    }

    /// Generates `CREATE TABLE IF NOT EXISTS` for a source table.
    ///
    /// Returns `None` when the table has no columns. Indexes follow the
    /// columns (primary key first), then foreign keys if enabled.
    fn create_table(
        &self,
        table: &TableSnapshot,
        schema: &SchemaInfo,
        foreign_keys: bool,
    ) -> Option<String> {
        if table.columns.is_empty() {
            return None;
        }

        let mut entries: Vec<String> = table
            .columns
            .iter()
            .map(|column| {
                format!(
                    "{} {}",
                    self.quote_identifier(&column.name),
                    self.column_definition(column, true)
                )
            })
            .collect();
        entries.extend(
            index_definitions(table.name(), &table.indexes)
                .iter()
                .map(|index| self.index_definition(index)),
        );
        if foreign_keys {
            entries.extend(
                foreign_key_definitions(table.name(), &table.foreign_keys)
                    .iter()
                    .map(|fk| self.foreign_key_definition(fk)),
            );
        }

        let (charset, collation) = match &table.table.collation {
            Some(collation) => (charset_of_collation(collation), collation.as_str()),
            None => (
                schema.default_charset.as_str(),
                schema.default_collation.as_str(),
            ),
        };
        let comment = if self.comments() {
            format!(" COMMENT='{}'", self.escape(&table.table.comment))
        } else {
            String::new()
        };

        Some(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n) ENGINE={} DEFAULT CHARSET={charset} COLLATE={collation}{comment};",
            self.quote_identifier(table.name()),
            entries.join(",\n  "),
            table.table.engine.as_deref().unwrap_or_default(),
        ))
    }

    /// Generates `CREATE [OR REPLACE] VIEW` with `schema` qualifiers removed.
    fn create_view(&self, view: &View, schema: &str, replace: bool) -> String {
        format!(
            "CREATE {}ALGORITHM = UNDEFINED SQL SECURITY {} VIEW {} AS {};",
            if replace { "OR REPLACE " } else { "" },
            view.security_type,
            self.quote_identifier(&view.name),
            strip_schema(&view.definition, schema),
        )
    }

    /// Generates `DROP TABLE IF EXISTS` or `DROP VIEW IF EXISTS`.
    fn drop_object(&self, name: &str, kind: TableKind) -> String {
        format!(
            "DROP {} IF EXISTS {};",
            kind.keyword(),
            self.quote_identifier(name)
        )
    }
}

/// Returns true for `CURRENT_TIMESTAMP` and `CURRENT_TIMESTAMP(n)`.
fn is_current_timestamp(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    match upper.strip_prefix(CURRENT_TIMESTAMP) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .is_some_and(|digits| digits.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}

/// Selects a dialect.
#[must_use]
pub fn dialect_for(tidb: bool, comments: bool) -> Box<dyn DdlDialect> {
    if tidb {
        Box::new(TidbDialect::new(comments))
    } else {
        Box::new(MysqlDialect::new(comments))
    }
}
