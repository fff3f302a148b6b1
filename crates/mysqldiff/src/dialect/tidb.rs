//! TiDB-compatible dialect.
//!
//! TiDB rejects most multi-clause online alters, so every clause becomes its
//! own `ALTER TABLE` statement.

use super::DdlDialect;

/// TiDB-compatible dialect.
#[derive(Debug, Clone, Default)]
pub struct TidbDialect {
    comments: bool,
}

impl TidbDialect {
    /// Creates a new TiDB dialect.
    #[must_use]
    pub fn new(comments: bool) -> Self {
        Self { comments }
    }
}

impl DdlDialect for TidbDialect {
    fn name(&self) -> &'static str {
        "tidb"
    }

    fn comments(&self) -> bool {
        self.comments
    }

    fn alter_statements(&self, table: &str, clauses: &[String]) -> Vec<String> {
        let table = self.quote_identifier(table);
        clauses
            .iter()
            .map(|clause| format!("ALTER TABLE {table}\n  {clause};"))
            .collect()
    }
}
