//! Integration tests for schema diffing.
//!
//! These run whole snapshots through [`SchemaDiffer`] and check the
//! rendered script.

mod common;

use std::sync::Arc;

use common::{COLLATION, JitterDialect, blog, diff, table};
use mysqldiff::prelude::*;
use mysqldiff::reconcile::columns::WorkingColumns;
use mysqldiff::reconcile::{columns_equal, reconcile_columns};

// ============================================================================
// Idempotence and symmetry
// ============================================================================

#[tokio::test]
async fn test_identical_schemas_produce_empty_script() {
    let options = DiffOptions::new()
        .with_comments(true)
        .with_foreign_keys(true);
    let script = diff(blog("app"), blog("app"), options).await;

    assert!(script.is_empty());
    assert_eq!(script.to_string(), "");
}

#[tokio::test]
async fn test_schema_names_do_not_leak_into_comparison() {
    let options = DiffOptions::new().with_foreign_keys(true);
    let script = diff(blog("blog_staging"), blog("blog"), options).await;

    assert!(script.is_empty(), "unexpected script:\n{script}");
}

#[test]
fn test_column_equality_is_reflexive_and_symmetric() {
    let columns = [
        Column::new("id", "bigint").not_null().extra("auto_increment"),
        Column::new("email", "varchar(255)").charset("utf8mb4", COLLATION),
        Column::new("created_at", "timestamp").default("CURRENT_TIMESTAMP"),
        Column::new("body", "text").comment("markdown"),
        Column::new("price", "decimal(10,2)").numeric(10, 2),
    ];

    for a in &columns {
        assert!(columns_equal(a, a, true), "{} not equal to itself", a.name);
        for b in &columns {
            assert_eq!(
                columns_equal(a, b, true),
                columns_equal(b, a, true),
                "asymmetric comparison of {} and {}",
                a.name,
                b.name
            );
        }
    }
}

#[test]
fn test_comment_difference_only_counts_when_enabled() {
    let a = Column::new("body", "text").comment("old");
    let b = Column::new("body", "text").comment("new");

    assert!(columns_equal(&a, &b, false));
    assert!(!columns_equal(&a, &b, true));
}

// ============================================================================
// Column positions
// ============================================================================

#[test]
fn test_working_positions_stay_contiguous() {
    let target = table("app", "t", &[("a", "int"), ("b", "int"), ("c", "int"), ("d", "int")]);

    for dropped in ["a", "b", "c", "d"] {
        let mut working = WorkingColumns::new(&target.columns);
        let before = working.position(dropped).unwrap();
        working.drop_column(dropped);

        assert_eq!(working.position(dropped), None);
        for column in &target.columns {
            if column.name == dropped {
                continue;
            }
            let expected = if column.ordinal_position > before {
                column.ordinal_position - 1
            } else {
                column.ordinal_position
            };
            assert_eq!(working.position(&column.name), Some(expected));
        }
    }

    let names = ["a", "b", "c", "d"];
    for position in 1..=5u32 {
        let placement = match position {
            1 => Placement::First,
            p => Placement::After(names[p as usize - 2].to_string()),
        };
        let mut working = WorkingColumns::new(&target.columns);
        working.insert(&Column::new("x", "int"), &placement);

        assert_eq!(working.position("x"), Some(position));
        for column in &target.columns {
            let expected = if column.ordinal_position >= position {
                column.ordinal_position + 1
            } else {
                column.ordinal_position
            };
            assert_eq!(working.position(&column.name), Some(expected));
        }
    }
}

/// Replays column edits on a list of names, resolving placements against
/// the current order.
fn replay(target: &[&str], edits: &[Edit]) -> Vec<String> {
    let mut names: Vec<String> = target.iter().map(|n| (*n).to_string()).collect();
    let insert = |names: &mut Vec<String>, name: &str, placement: &Placement| {
        let index = match placement {
            Placement::First => 0,
            Placement::After(previous) => {
                names
                    .iter()
                    .position(|n| n == previous)
                    .unwrap_or_else(|| panic!("AFTER unknown column {previous}"))
                    + 1
            }
        };
        names.insert(index, name.to_string());
    };

    for edit in edits {
        match edit {
            Edit::DropColumn { name } => names.retain(|n| n != name),
            Edit::AddColumn {
                column, placement, ..
            } => insert(&mut names, &column.name, placement),
            Edit::ModifyColumn {
                column, placement, ..
            } => {
                names.retain(|n| *n != column.name);
                insert(&mut names, &column.name, placement);
            }
            other => panic!("Expected a column edit, got {other:?}"),
        }
    }
    names
}

/// Every ordered selection of `pool` of every length.
fn arrangements<'a>(pool: &[&'a str]) -> Vec<Vec<&'a str>> {
    let mut out = vec![Vec::new()];
    let mut frontier = vec![Vec::new()];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for prefix in &frontier {
            for name in pool {
                if !prefix.contains(name) {
                    let mut longer: Vec<&str> = prefix.clone();
                    longer.push(*name);
                    next.push(longer);
                }
            }
        }
        out.extend(next.iter().cloned());
        frontier = next;
    }
    out
}

#[test]
fn test_column_edits_converge_to_source_order() {
    let source_names = ["a", "b", "c", "d", "e", "f"];
    let source = table(
        "app",
        "t",
        &source_names.map(|name| (name, "int")),
    );

    let mut checked = 0;
    for target_names in arrangements(&["a", "b", "c", "d", "e", "f", "x"]) {
        if target_names.is_empty() {
            continue;
        }
        let pairs: Vec<(&str, &str)> = target_names.iter().map(|n| (*n, "int")).collect();
        let target = table("app", "t", &pairs);

        let edits = reconcile_columns(&source.columns, &target.columns, false, COLLATION);
        assert_eq!(
            replay(&target_names, &edits),
            source_names.to_vec(),
            "target {target_names:?} gave edits {edits:?}"
        );
        checked += 1;
    }
    assert_eq!(checked, 13_699);
}

#[test]
fn test_reorder_with_add_drop_and_type_change() {
    let source = table(
        "app",
        "t",
        &[("id", "bigint"), ("email", "varchar(255)"), ("name", "text"), ("created_at", "datetime")],
    );
    let target = table(
        "app",
        "t",
        &[("created_at", "datetime"), ("legacy", "blob"), ("name", "text"), ("id", "int")],
    );

    let edits = reconcile_columns(&source.columns, &target.columns, false, COLLATION);
    assert_eq!(
        replay(&["created_at", "legacy", "name", "id"], &edits),
        vec!["id", "email", "name", "created_at"]
    );

    let mut working = WorkingColumns::new(&target.columns);
    for edit in &edits {
        working.apply(edit);
    }
    assert!(reconcile_columns(&source.columns, working.columns(), false, COLLATION).is_empty());
}

#[test]
fn test_add_column_does_not_move_later_columns() {
    let source = table("app", "t", &[("a", "int"), ("b", "int"), ("c", "int")]);
    let target = table("app", "t", &[("a", "int"), ("c", "int")]);

    let edits = reconcile_columns(&source.columns, &target.columns, false, COLLATION);

    assert_eq!(edits.len(), 1);
    match &edits[0] {
        Edit::AddColumn {
            column, placement, ..
        } => {
            assert_eq!(column.name, "b");
            assert_eq!(placement, &Placement::After("a".to_string()));
        }
        other => panic!("Expected AddColumn, got {other:?}"),
    }
}

#[tokio::test]
async fn test_added_column_is_placed_after_predecessor() {
    let source = SchemaSnapshot::new("app")
        .table(table("app", "t", &[("a", "int"), ("b", "int"), ("c", "int")]));
    let target = SchemaSnapshot::new("app").table(table("app", "t", &[("a", "int"), ("c", "int")]));

    let script = diff(source, target, DiffOptions::new()).await;

    assert_eq!(
        script.to_string(),
        "SET NAMES utf8mb4;\n\nALTER TABLE `t`\n  ADD COLUMN `b` int DEFAULT NULL AFTER `a`;\n"
    );
}

#[tokio::test]
async fn test_modified_collation_spells_out_charset() {
    let source = SchemaSnapshot::new("app").table(
        TableSnapshot::new("app", "t")
            .column(Column::new("id", "int").not_null())
            .column(Column::new("name", "varchar(64)").charset("utf8mb4", "utf8mb4_bin")),
    );
    let target = SchemaSnapshot::new("app").table(
        TableSnapshot::new("app", "t")
            .column(Column::new("id", "int").not_null())
            .column(Column::new("name", "varchar(64)").charset("utf8mb4", COLLATION)),
    );

    let script = diff(source, target, DiffOptions::new()).await;

    assert_eq!(
        script.blocks()[0].1,
        "ALTER TABLE `t`\n  MODIFY COLUMN `name` varchar(64) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin DEFAULT NULL AFTER `id`;"
    );
}

// ============================================================================
// Indexes and foreign keys
// ============================================================================

#[tokio::test]
async fn test_changed_index_is_rebuilt_once() {
    let columns = [("a", "int"), ("b", "int")];
    let source = SchemaSnapshot::new("app")
        .table(table("app", "t", &columns).index("idx1", &["a", "b"], false));
    let target = SchemaSnapshot::new("app")
        .table(table("app", "t", &columns).index("idx1", &["a"], false));

    let script = diff(source, target, DiffOptions::new()).await.to_string();

    assert_eq!(script.matches("DROP INDEX `idx1`").count(), 1);
    assert_eq!(script.matches("ADD KEY `idx1` (`a`,`b`)").count(), 1);
    let drop = script.find("DROP INDEX `idx1`").unwrap();
    let add = script.find("ADD KEY `idx1`").unwrap();
    assert!(drop < add);
}

#[tokio::test]
async fn test_primary_key_change() {
    let columns = [("a", "int"), ("b", "int")];
    let source = SchemaSnapshot::new("app")
        .table(table("app", "t", &columns).primary_key(&["a", "b"]));
    let target = SchemaSnapshot::new("app").table(table("app", "t", &columns).primary_key(&["a"]));

    let script = diff(source, target, DiffOptions::new()).await;

    assert_eq!(
        script.blocks()[0].1,
        "ALTER TABLE `t`\n  DROP PRIMARY KEY,\n  ADD PRIMARY KEY (`a`,`b`);"
    );
}

#[tokio::test]
async fn test_foreign_key_replacement_runs_before_alter() {
    let posts = |rule: &str, extra: bool| {
        let mut posts = table("app", "posts", &[("id", "bigint"), ("author_id", "bigint")])
            .foreign_key(
                ForeignKey::new("fk_posts_author", "posts", "users")
                    .column("author_id", "id")
                    .on_delete(rule),
            );
        if extra {
            posts = posts.foreign_key(ForeignKey::new("fk_old", "posts", "users").column("id", "id"));
        }
        posts
    };
    let source = SchemaSnapshot::new("app").table(posts("CASCADE", false));
    let target = SchemaSnapshot::new("app").table(posts("RESTRICT", true));

    let script = diff(source, target, DiffOptions::new().with_foreign_keys(true)).await;

    assert_eq!(
        script.to_string(),
        "SET NAMES utf8mb4;\n\
         SET FOREIGN_KEY_CHECKS=0;\n\
         \n\
         ALTER TABLE `posts` DROP FOREIGN KEY `fk_posts_author`;\n\
         ALTER TABLE `posts`\n  \
         DROP FOREIGN KEY `fk_old`,\n  \
         ADD CONSTRAINT `fk_posts_author` FOREIGN KEY (`author_id`) REFERENCES `users` (`id`) ON DELETE CASCADE ON UPDATE RESTRICT;\n\
         \n\
         SET FOREIGN_KEY_CHECKS=1;\n"
    );
}

#[tokio::test]
async fn test_foreign_keys_ignored_unless_enabled() {
    let source = SchemaSnapshot::new("app").table(
        table("app", "posts", &[("id", "bigint"), ("author_id", "bigint")]).foreign_key(
            ForeignKey::new("fk_posts_author", "posts", "users").column("author_id", "id"),
        ),
    );
    let target =
        SchemaSnapshot::new("app").table(table("app", "posts", &[("id", "bigint"), ("author_id", "bigint")]));

    let script = diff(source, target, DiffOptions::new()).await;

    assert!(script.is_empty());
}

// ============================================================================
// Whole objects
// ============================================================================

#[tokio::test]
async fn test_dropped_table_appears_once() {
    let source = SchemaSnapshot::new("app").table(table("app", "users", &[("id", "int")]));
    let target = SchemaSnapshot::new("app")
        .table(table("app", "users", &[("id", "int")]))
        .table(table("app", "legacy", &[("id", "int"), ("payload", "blob")]));

    let script = diff(source, target, DiffOptions::new()).await.to_string();

    assert_eq!(script, "SET NAMES utf8mb4;\n\nDROP TABLE IF EXISTS `legacy`;\n");
    assert_eq!(script.matches("legacy").count(), 1);
}

#[tokio::test]
async fn test_dropped_view_uses_view_keyword() {
    let source = SchemaSnapshot::new("app");
    let target = SchemaSnapshot::new("app").table(TableSnapshot::view("app", "v", "select 1 AS `x`"));

    let script = diff(source, target, DiffOptions::new()).await;

    assert_eq!(script.blocks()[0].1, "DROP VIEW IF EXISTS `v`;");
}

#[tokio::test]
async fn test_missing_table_is_created() {
    let source = SchemaSnapshot::new("app").table(
        TableSnapshot::new("app", "tags")
            .column(Column::new("id", "int").not_null().extra("auto_increment"))
            .column(Column::new("label", "varchar(32)").not_null())
            .primary_key(&["id"]),
    );
    let target = SchemaSnapshot::new("app");

    let script = diff(source, target, DiffOptions::new()).await;

    assert_eq!(
        script.blocks()[0].1,
        "CREATE TABLE IF NOT EXISTS `tags` (\n  \
         `id` int NOT NULL AUTO_INCREMENT,\n  \
         `label` varchar(32) NOT NULL,\n  \
         PRIMARY KEY (`id`)\n\
         ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_general_ci;"
    );
}

#[tokio::test]
async fn test_changed_view_is_replaced() {
    let source = SchemaSnapshot::new("staging")
        .table(TableSnapshot::view("staging", "v", "select `staging`.`t`.`a` AS `a` from `staging`.`t`"));
    let target = SchemaSnapshot::new("prod")
        .table(TableSnapshot::view("prod", "v", "select `prod`.`t`.`b` AS `b` from `prod`.`t`"));

    let script = diff(source, target, DiffOptions::new()).await;

    assert_eq!(
        script.blocks()[0].1,
        "CREATE OR REPLACE ALGORITHM = UNDEFINED SQL SECURITY DEFINER VIEW `v` AS select `t`.`a` AS `a` from `t`;"
    );
}

// ============================================================================
// Dialects
// ============================================================================

#[tokio::test]
async fn test_tidb_emits_one_statement_per_clause() {
    let source = SchemaSnapshot::new("app").table(
        TableSnapshot::new("app", "users")
            .column(Column::new("id", "bigint").not_null())
            .column(Column::new("email", "varchar(255)"))
            .column(Column::new("name", "text")),
    );
    let target = SchemaSnapshot::new("app").table(
        TableSnapshot::new("app", "users")
            .column(Column::new("id", "int").not_null())
            .column(Column::new("email", "varchar(255)")),
    );

    let script = diff(source, target, DiffOptions::new().with_tidb(true)).await;

    assert_eq!(
        script.blocks()[0].1,
        "ALTER TABLE `users`\n  ADD COLUMN `name` text DEFAULT NULL AFTER `email`;\n\
         ALTER TABLE `users`\n  MODIFY COLUMN `id` bigint NOT NULL FIRST;"
    );
}

// ============================================================================
// Concurrency
// ============================================================================

fn wide_pair() -> (SchemaSnapshot, SchemaSnapshot) {
    let mut source = SchemaSnapshot::new("staging");
    let mut target = SchemaSnapshot::new("prod");

    for i in 0..40u32 {
        let name = format!("t{i:02}");
        let id_type = if i % 2 == 0 { "bigint" } else { "int" };
        let mut s = table("staging", &name, &[("id", "bigint"), ("name", "varchar(64)")])
            .primary_key(&["id"]);
        if i % 3 == 0 {
            s = s.column(Column::new("note", "text"));
        }
        if i % 5 == 0 {
            s = s.index("idx_name", &["name"], false);
        }
        source = source.table(s);

        if i % 7 != 6 {
            let t = table("prod", &name, &[("id", id_type), ("name", "varchar(32)")]).primary_key(&["id"]);
            target = target.table(t);
        }
    }
    for i in 0..4 {
        target = target.table(table("prod", &format!("old{i}"), &[("id", "int")]));
    }

    // Reverse the source so task order differs from output order
    source.tables.reverse();
    (source, target)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_output_independent_of_completion_order() {
    let (source, target) = wide_pair();
    let source = Arc::new(source);
    let target = Arc::new(target);

    let baseline = SchemaDiffer::with_dialect(
        DiffOptions::new().with_concurrency(1),
        Arc::new(JitterDialect::new(0)),
    )
    .diff(Arc::clone(&source), Arc::clone(&target))
    .await
    .to_string();

    for seed in 1..=3 {
        let script = SchemaDiffer::with_dialect(
            DiffOptions::new().with_concurrency(8),
            Arc::new(JitterDialect::new(seed)),
        )
        .diff(Arc::clone(&source), Arc::clone(&target))
        .await;

        let tables: Vec<&str> = script.tables().collect();
        let mut sorted = tables.clone();
        sorted.sort_unstable();
        assert_eq!(tables, sorted);
        assert_eq!(script.to_string(), baseline, "seed {seed} changed the output");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_changed_table_is_reported() {
    let (source, target) = wide_pair();

    let script = diff(source, target, DiffOptions::new().with_concurrency(4)).await;

    // 40 source tables all differ, plus 4 drops
    assert_eq!(script.blocks().len(), 44);
    assert!(script.blocks().iter().any(|(t, b)| t == "t06" && b.starts_with("CREATE TABLE")));
    assert!(script.blocks().iter().any(|(t, b)| t == "old0" && b == "DROP TABLE IF EXISTS `old0`;"));
}

// ============================================================================
// Snapshot files
// ============================================================================

#[tokio::test]
async fn test_diff_from_snapshot_files_matches_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let source_file = SnapshotFile::new(dir.path().join("staging.json"));
    let target_file = SnapshotFile::new(dir.path().join("prod.json"));

    let source = blog("staging").table(table("staging", "tags", &[("id", "int")]));
    let target = blog("prod").table(table("prod", "legacy", &[("id", "int")]));
    source_file.write(&source).await.unwrap();
    target_file.write(&target).await.unwrap();

    let options = DiffOptions::new().with_foreign_keys(true);
    let from_files = diff(
        source_file.load_schema("staging").await.unwrap(),
        target_file.load_schema("prod").await.unwrap(),
        options.clone(),
    )
    .await;
    let in_memory = diff(source, target, options).await;

    assert_eq!(from_files, in_memory);
    assert_eq!(from_files.tables().collect::<Vec<_>>(), vec!["legacy", "tags"]);
}
