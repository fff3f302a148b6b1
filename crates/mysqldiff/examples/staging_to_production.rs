//! Example: Staging to Production
//!
//! This example diffs an in-memory staging schema against production and
//! prints the script in both the MySQL and the TiDB-compatible form.
//!
//! Run with: cargo run --example staging_to_production -p mysqldiff

use std::sync::Arc;

use mysqldiff::prelude::*;

// =============================================================================
// Schemas
// =============================================================================

fn staging() -> SchemaSnapshot {
    SchemaSnapshot::new("blog_staging")
        .table(
            TableSnapshot::new("blog_staging", "users")
                .column(Column::new("id", "bigint").not_null().extra("auto_increment"))
                .column(
                    Column::new("username", "varchar(100)")
                        .not_null()
                        .charset("utf8mb4", "utf8mb4_general_ci"),
                )
                .column(
                    Column::new("email", "varchar(255)")
                        .not_null()
                        .charset("utf8mb4", "utf8mb4_general_ci"),
                )
                .column(
                    Column::new("created_at", "timestamp")
                        .not_null()
                        .default("CURRENT_TIMESTAMP")
                        .extra("DEFAULT_GENERATED"),
                )
                .primary_key(&["id"])
                .index("uk_username", &["username"], true)
                .index("idx_email", &["email"], false),
        )
        .table(
            TableSnapshot::new("blog_staging", "posts")
                .column(Column::new("id", "bigint").not_null().extra("auto_increment"))
                .column(Column::new("author_id", "bigint").not_null())
                .column(Column::new("title", "varchar(200)").not_null())
                .column(Column::new("body", "text"))
                .primary_key(&["id"])
                .index("idx_author", &["author_id"], false)
                .foreign_key(
                    ForeignKey::new("fk_posts_author", "posts", "users")
                        .column("author_id", "id")
                        .on_delete("CASCADE"),
                ),
        )
        .table(TableSnapshot::view(
            "blog_staging",
            "recent_posts",
            "select `blog_staging`.`posts`.`id` AS `id`,`blog_staging`.`posts`.`title` AS `title` \
             from `blog_staging`.`posts` order by `blog_staging`.`posts`.`id` desc limit 10",
        ))
}

fn production() -> SchemaSnapshot {
    SchemaSnapshot::new("blog")
        .table(
            TableSnapshot::new("blog", "users")
                .column(Column::new("id", "int").not_null().extra("auto_increment"))
                .column(
                    Column::new("username", "varchar(100)")
                        .not_null()
                        .charset("utf8mb4", "utf8mb4_general_ci"),
                )
                .column(
                    Column::new("created_at", "timestamp")
                        .not_null()
                        .default("CURRENT_TIMESTAMP")
                        .extra("DEFAULT_GENERATED"),
                )
                .primary_key(&["id"])
                .index("uk_username", &["username"], true),
        )
        .table(
            TableSnapshot::new("blog", "sessions")
                .column(Column::new("token", "char(64)").not_null())
                .primary_key(&["token"]),
        )
        .table(TableSnapshot::view(
            "blog",
            "recent_posts",
            "select `blog`.`posts`.`id` AS `id`,`blog`.`posts`.`title` AS `title` \
             from `blog`.`posts` order by `blog`.`posts`.`id` desc limit 10",
        ))
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    let source = Arc::new(staging());
    let target = Arc::new(production());

    println!("{}", "=".repeat(70));
    println!(" MYSQLDIFF: blog_staging -> blog");
    println!("{}", "=".repeat(70));
    println!();

    let options = DiffOptions::new().with_foreign_keys(true);
    let script = SchemaDiffer::new(options.clone())
        .diff(Arc::clone(&source), Arc::clone(&target))
        .await;
    println!("[1] MySQL script ({} tables affected)\n", script.blocks().len());
    println!("{script}");

    let script = SchemaDiffer::new(options.with_tidb(true))
        .diff(source, target)
        .await;
    println!("[2] TiDB-compatible script\n");
    println!("{script}");
}
