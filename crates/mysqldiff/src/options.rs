//! Options controlling comparison and rendering.

/// Default size of the admission window.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Options for a diff run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Compare and emit column and table comments.
    pub compare_comments: bool,
    /// Compare and emit foreign keys.
    pub foreign_keys: bool,
    /// Emit one `ALTER TABLE` statement per clause.
    pub tidb: bool,
    /// Maximum number of table diffs running at once.
    pub concurrency: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compare_comments: false,
            foreign_keys: false,
            tidb: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Enables comment comparison.
    #[must_use]
    pub fn with_comments(mut self, enabled: bool) -> Self {
        self.compare_comments = enabled;
        self
    }

    /// Enables foreign key reconciliation.
    #[must_use]
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Selects TiDB-compatible rendering.
    #[must_use]
    pub fn with_tidb(mut self, enabled: bool) -> Self {
        self.tidb = enabled;
        self
    }

    /// Sets the admission window. Zero is clamped to one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}
