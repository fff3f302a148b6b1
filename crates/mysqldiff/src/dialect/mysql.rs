//! MySQL dialect.
//!
//! All clauses of a table go into one `ALTER TABLE` statement, one clause
//! per line.

use super::DdlDialect;

/// Standard MySQL dialect.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect {
    comments: bool,
}

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new(comments: bool) -> Self {
        Self { comments }
    }
}

impl DdlDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn comments(&self) -> bool {
        self.comments
    }

    fn alter_statements(&self, table: &str, clauses: &[String]) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {}\n  {};",
            self.quote_identifier(table),
            clauses.join(",\n  ")
        )]
    }
}
