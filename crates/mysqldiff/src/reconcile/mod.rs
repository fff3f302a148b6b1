//! Reconcilers.
//!
//! Each reconciler compares one facet of a source table with the same facet
//! of its target counterpart and returns the [`Edit`]s that make the target
//! match. They never fail: malformed or unresolvable metadata produces no
//! edit and a warning.

pub mod columns;
pub mod constraints;
pub mod indexes;
pub mod views;

pub use columns::{columns_equal, reconcile_columns};
pub use constraints::reconcile_foreign_keys;
pub use indexes::reconcile_indexes;
pub use views::{ViewAction, reconcile_view};

use crate::operations::{Edit, TablePlan};
use crate::options::DiffOptions;
use crate::schema::{TableSnapshot, charset_of_collation};

/// Computes every edit for a table present on both sides.
///
/// Clauses are ordered columns, indexes, foreign keys, then table options.
/// `default_collation` is the collation a column falls back to when its
/// definition omits one.
#[must_use]
pub fn reconcile_table(
    source: &TableSnapshot,
    target: &TableSnapshot,
    options: &DiffOptions,
    default_collation: &str,
) -> TablePlan {
    let name = source.name();
    let mut plan = TablePlan::new(name);

    plan.clauses.extend(reconcile_columns(
        &source.columns,
        &target.columns,
        options.compare_comments,
        default_collation,
    ));
    plan.clauses
        .extend(reconcile_indexes(name, &source.indexes, &target.indexes));

    if options.foreign_keys {
        let constraints =
            reconcile_foreign_keys(name, &source.foreign_keys, &target.foreign_keys);
        plan.preamble.extend(constraints.preamble);
        plan.clauses.extend(constraints.clauses);
    }

    plan.clauses.extend(table_options(source, target, options));
    plan
}

fn table_options(source: &TableSnapshot, target: &TableSnapshot, options: &DiffOptions) -> Vec<Edit> {
    let (source, target) = (&source.table, &target.table);
    let mut edits = Vec::new();

    if let Some(engine) = &source.engine {
        if target.engine.as_ref() != Some(engine) {
            edits.push(Edit::SetEngine {
                engine: engine.clone(),
            });
        }
    }
    if let Some(collation) = &source.collation {
        if target.collation.as_ref() != Some(collation) {
            edits.push(Edit::SetCharset {
                charset: charset_of_collation(collation).to_string(),
                collation: collation.clone(),
            });
        }
    }
    if options.compare_comments && source.comment != target.comment {
        edits.push(Edit::SetComment {
            comment: source.comment.clone(),
        });
    }

    edits
}
