#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use mysqldiff::prelude::*;

pub const COLLATION: &str = "utf8mb4_general_ci";

/// Builds a table from `(name, column type)` pairs.
pub fn table(schema: &str, name: &str, columns: &[(&str, &str)]) -> TableSnapshot {
    columns
        .iter()
        .fold(TableSnapshot::new(schema, name), |t, (column, ty)| {
            t.column(Column::new(*column, *ty))
        })
}

/// A schema with users, posts and a view, qualified with `name`.
pub fn blog(name: &str) -> SchemaSnapshot {
    SchemaSnapshot::new(name)
        .table(
            TableSnapshot::new(name, "users")
                .column(Column::new("id", "bigint").not_null().extra("auto_increment"))
                .column(
                    Column::new("email", "varchar(255)")
                        .not_null()
                        .charset("utf8mb4", COLLATION),
                )
                .column(
                    Column::new("created_at", "timestamp")
                        .not_null()
                        .default("CURRENT_TIMESTAMP")
                        .extra("DEFAULT_GENERATED"),
                )
                .primary_key(&["id"])
                .index("uk_email", &["email"], true),
        )
        .table(
            TableSnapshot::new(name, "posts")
                .column(Column::new("id", "bigint").not_null().extra("auto_increment"))
                .column(Column::new("author_id", "bigint").not_null())
                .column(Column::new("body", "text").comment("markdown"))
                .primary_key(&["id"])
                .index("idx_author", &["author_id"], false)
                .foreign_key(
                    ForeignKey::new("fk_posts_author", "posts", "users")
                        .column("author_id", "id")
                        .on_delete("CASCADE"),
                ),
        )
        .table(TableSnapshot::view(
            name,
            "v_posts",
            format!("select `{name}`.`posts`.`id` AS `id` from `{name}`.`posts`"),
        ))
}

/// Diffs two snapshots.
pub async fn diff(source: SchemaSnapshot, target: SchemaSnapshot, options: DiffOptions) -> DiffScript {
    SchemaDiffer::new(options)
        .diff(Arc::new(source), Arc::new(target))
        .await
}

/// MySQL dialect that sleeps a pseudo-random time per table, so tasks
/// finish in a different order on every seed.
///
/// The sleep runs under `block_in_place`, so the worker's other tasks move
/// to another thread meanwhile. Only usable on the multi-thread runtime.
pub struct JitterDialect {
    inner: MysqlDialect,
    seed: u64,
}

impl JitterDialect {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: MysqlDialect::new(false),
            seed,
        }
    }
}

impl DdlDialect for JitterDialect {
    fn name(&self) -> &'static str {
        "jitter"
    }

    fn comments(&self) -> bool {
        self.inner.comments()
    }

    fn alter_statements(&self, table: &str, clauses: &[String]) -> Vec<String> {
        let mut hasher = DefaultHasher::new();
        (self.seed, table).hash(&mut hasher);
        let pause = Duration::from_micros(hasher.finish() % 3_000);
        tokio::task::block_in_place(|| std::thread::sleep(pause));
        self.inner.alter_statements(table, clauses)
    }
}
