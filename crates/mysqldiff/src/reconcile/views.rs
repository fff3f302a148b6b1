//! View reconciliation.

use crate::schema::View;

/// What to do with a source view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    /// Definitions match.
    Unchanged,
    /// The target has no such view: `CREATE VIEW`.
    Create,
    /// The target view differs: `CREATE OR REPLACE VIEW`.
    Replace,
}

/// Removes every `` `schema`. `` qualifier from a view definition.
#[must_use]
pub fn strip_schema(definition: &str, schema: &str) -> String {
    definition.replace(&format!("`{schema}`."), "")
}

/// Compares two view definitions after stripping each side's own schema
/// qualifier.
#[must_use]
pub fn reconcile_view(
    source: &View,
    source_schema: &str,
    target: Option<(&View, &str)>,
) -> ViewAction {
    match target {
        None => ViewAction::Create,
        Some((target, target_schema)) => {
            if strip_schema(&source.definition, source_schema)
                == strip_schema(&target.definition, target_schema)
            {
                ViewAction::Unchanged
            } else {
                ViewAction::Replace
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSnapshot;

    fn view(schema: &str, definition: &str) -> View {
        TableSnapshot::view(schema, "v", definition)
            .view
            .unwrap()
    }

    #[test]
    fn test_strip_schema() {
        assert_eq!(
            strip_schema("select `app`.`t`.`id` from `app`.`t`", "app"),
            "select `t`.`id` from `t`"
        );
        assert_eq!(strip_schema("select 1", "app"), "select 1");
    }

    #[test]
    fn test_schema_qualifier_is_ignored() {
        let source = view("staging", "select `staging`.`t`.`id` from `staging`.`t`");
        let target = view("prod", "select `prod`.`t`.`id` from `prod`.`t`");
        assert_eq!(
            reconcile_view(&source, "staging", Some((&target, "prod"))),
            ViewAction::Unchanged
        );
    }

    #[test]
    fn test_changed_view_is_replaced() {
        let source = view("app", "select `app`.`t`.`id` from `app`.`t`");
        let target = view("app", "select `app`.`t`.`name` from `app`.`t`");
        assert_eq!(
            reconcile_view(&source, "app", Some((&target, "app"))),
            ViewAction::Replace
        );
        assert_eq!(reconcile_view(&source, "app", None), ViewAction::Create);
    }
}
