//! MySQL `information_schema` catalog.
//!
//! Every attribute is read through `CAST`, so the row types decode the same
//! way whether the server reports the metadata columns as text or binary.

use std::collections::HashMap;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use super::Catalog;
use crate::config::ServerAddress;
use crate::error::{DiffError, Result, Side};
use crate::schema::{
    Column, ForeignKey, IndexEntry, KeyColumnUsage, ReferentialRule, SchemaInfo, SchemaSnapshot,
    Table, TableKind, TableSnapshot, View,
};

/// Connection character set.
pub const CONNECTION_CHARSET: &str = "utf8mb4";

const SCHEMA_SQL: &str = "SELECT \
    CAST(DEFAULT_CHARACTER_SET_NAME AS CHAR) AS default_charset, \
    CAST(DEFAULT_COLLATION_NAME AS CHAR) AS default_collation \
    FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?";

const TABLES_SQL: &str = "SELECT \
    CAST(TABLE_NAME AS CHAR) AS table_name, \
    CAST(TABLE_TYPE AS CHAR) AS table_type, \
    CAST(ENGINE AS CHAR) AS engine, \
    CAST(TABLE_COLLATION AS CHAR) AS table_collation, \
    CAST(TABLE_COMMENT AS CHAR) AS table_comment \
    FROM information_schema.TABLES WHERE TABLE_SCHEMA = ? ORDER BY TABLE_NAME";

const COLUMNS_SQL: &str = "SELECT \
    CAST(TABLE_NAME AS CHAR) AS table_name, \
    CAST(COLUMN_NAME AS CHAR) AS column_name, \
    CAST(ORDINAL_POSITION AS UNSIGNED) AS ordinal_position, \
    CAST(COLUMN_DEFAULT AS CHAR) AS column_default, \
    CAST(IS_NULLABLE AS CHAR) AS is_nullable, \
    CAST(DATA_TYPE AS CHAR) AS data_type, \
    CAST(CHARACTER_MAXIMUM_LENGTH AS UNSIGNED) AS character_maximum_length, \
    CAST(NUMERIC_PRECISION AS UNSIGNED) AS numeric_precision, \
    CAST(NUMERIC_SCALE AS UNSIGNED) AS numeric_scale, \
    CAST(DATETIME_PRECISION AS UNSIGNED) AS datetime_precision, \
    CAST(CHARACTER_SET_NAME AS CHAR) AS character_set_name, \
    CAST(COLLATION_NAME AS CHAR) AS collation_name, \
    CAST(COLUMN_TYPE AS CHAR) AS column_type, \
    CAST(EXTRA AS CHAR) AS extra, \
    CAST(COLUMN_COMMENT AS CHAR) AS column_comment \
    FROM information_schema.COLUMNS WHERE TABLE_SCHEMA = ? \
    ORDER BY TABLE_NAME, ORDINAL_POSITION";

const STATISTICS_SQL: &str = "SELECT \
    CAST(TABLE_NAME AS CHAR) AS table_name, \
    CAST(INDEX_NAME AS CHAR) AS index_name, \
    CAST(SEQ_IN_INDEX AS UNSIGNED) AS seq_in_index, \
    CAST(COLUMN_NAME AS CHAR) AS column_name, \
    CAST(SUB_PART AS UNSIGNED) AS sub_part, \
    CAST(NON_UNIQUE AS UNSIGNED) AS non_unique, \
    CAST(INDEX_TYPE AS CHAR) AS index_type \
    FROM information_schema.STATISTICS WHERE TABLE_SCHEMA = ? \
    ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX";

const VIEWS_SQL: &str = "SELECT \
    CAST(TABLE_NAME AS CHAR) AS table_name, \
    CAST(VIEW_DEFINITION AS CHAR) AS view_definition, \
    CAST(SECURITY_TYPE AS CHAR) AS security_type, \
    CAST(DEFINER AS CHAR) AS definer, \
    CAST(CHECK_OPTION AS CHAR) AS check_option \
    FROM information_schema.VIEWS WHERE TABLE_SCHEMA = ?";

const CONSTRAINTS_SQL: &str = "SELECT \
    CAST(TABLE_NAME AS CHAR) AS table_name, \
    CAST(CONSTRAINT_NAME AS CHAR) AS constraint_name, \
    CAST(CONSTRAINT_TYPE AS CHAR) AS constraint_type \
    FROM information_schema.TABLE_CONSTRAINTS \
    WHERE TABLE_SCHEMA = ? AND CONSTRAINT_TYPE = 'FOREIGN KEY' \
    ORDER BY TABLE_NAME, CONSTRAINT_NAME";

const REFERENTIAL_SQL: &str = "SELECT \
    CAST(CONSTRAINT_NAME AS CHAR) AS constraint_name, \
    CAST(MATCH_OPTION AS CHAR) AS match_option, \
    CAST(UPDATE_RULE AS CHAR) AS update_rule, \
    CAST(DELETE_RULE AS CHAR) AS delete_rule, \
    CAST(REFERENCED_TABLE_NAME AS CHAR) AS referenced_table_name \
    FROM information_schema.REFERENTIAL_CONSTRAINTS WHERE CONSTRAINT_SCHEMA = ?";

const KEY_COLUMNS_SQL: &str = "SELECT \
    CAST(TABLE_NAME AS CHAR) AS table_name, \
    CAST(CONSTRAINT_NAME AS CHAR) AS constraint_name, \
    CAST(COLUMN_NAME AS CHAR) AS column_name, \
    CAST(REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column_name \
    FROM information_schema.KEY_COLUMN_USAGE \
    WHERE CONSTRAINT_SCHEMA = ? AND TABLE_SCHEMA = ? AND REFERENCED_TABLE_NAME IS NOT NULL \
    ORDER BY TABLE_NAME, CONSTRAINT_NAME, POSITION_IN_UNIQUE_CONSTRAINT";

#[derive(Debug, FromRow)]
struct SchemaRow {
    default_charset: String,
    default_collation: String,
}

#[derive(Debug, FromRow)]
struct TableRow {
    table_name: String,
    table_type: String,
    engine: Option<String>,
    table_collation: Option<String>,
    table_comment: Option<String>,
}

#[derive(Debug, FromRow)]
struct ColumnRow {
    table_name: String,
    column_name: String,
    ordinal_position: u64,
    column_default: Option<String>,
    is_nullable: String,
    data_type: String,
    character_maximum_length: Option<u64>,
    numeric_precision: Option<u64>,
    numeric_scale: Option<u64>,
    datetime_precision: Option<u64>,
    character_set_name: Option<String>,
    collation_name: Option<String>,
    column_type: String,
    extra: Option<String>,
    column_comment: Option<String>,
}

impl From<ColumnRow> for Column {
    fn from(row: ColumnRow) -> Self {
        Self {
            name: row.column_name,
            ordinal_position: u32::try_from(row.ordinal_position).unwrap_or(u32::MAX),
            default: row.column_default,
            nullable: row.is_nullable.eq_ignore_ascii_case("YES"),
            data_type: row.data_type,
            character_maximum_length: row.character_maximum_length,
            numeric_precision: row.numeric_precision,
            numeric_scale: row.numeric_scale,
            datetime_precision: row.datetime_precision,
            character_set: row.character_set_name,
            collation: row.collation_name,
            column_type: row.column_type,
            extra: row.extra.unwrap_or_default(),
            comment: row.column_comment.unwrap_or_default(),
        }
    }
}

#[derive(Debug, FromRow)]
struct IndexRow {
    table_name: String,
    index_name: String,
    seq_in_index: u64,
    column_name: Option<String>,
    sub_part: Option<u64>,
    non_unique: u64,
    index_type: String,
}

impl From<IndexRow> for IndexEntry {
    fn from(row: IndexRow) -> Self {
        Self {
            index_name: row.index_name,
            seq_in_index: u32::try_from(row.seq_in_index).unwrap_or(u32::MAX),
            column_name: row.column_name.unwrap_or_default(),
            sub_part: row.sub_part.and_then(|n| u32::try_from(n).ok()),
            non_unique: row.non_unique != 0,
            index_type: row.index_type,
        }
    }
}

#[derive(Debug, FromRow)]
struct ViewRow {
    table_name: String,
    view_definition: String,
    security_type: String,
    definer: String,
    check_option: String,
}

#[derive(Debug, FromRow)]
struct ConstraintRow {
    table_name: String,
    constraint_name: String,
    constraint_type: String,
}

#[derive(Debug, FromRow)]
struct ReferentialRow {
    constraint_name: String,
    match_option: String,
    update_rule: String,
    delete_rule: String,
    referenced_table_name: String,
}

#[derive(Debug, FromRow)]
struct KeyColumnRow {
    table_name: String,
    constraint_name: String,
    column_name: String,
    referenced_column_name: Option<String>,
}

/// Opens a pool to a server.
pub async fn connect(address: &ServerAddress, max_connections: u32) -> Result<MySqlPool> {
    let options = MySqlConnectOptions::new()
        .host(&address.host)
        .port(address.port)
        .username(&address.user)
        .password(&address.password)
        .charset(CONNECTION_CHARSET);
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;
    debug!(host = %address.host, port = address.port, "Connected");
    Ok(pool)
}

/// Catalog backed by a live server.
#[derive(Debug, Clone)]
pub struct MysqlCatalog {
    pool: MySqlPool,
    side: Side,
    foreign_keys: bool,
}

impl MysqlCatalog {
    /// Creates a catalog for one side of a diff.
    #[must_use]
    pub fn new(pool: MySqlPool, side: Side, foreign_keys: bool) -> Self {
        Self {
            pool,
            side,
            foreign_keys,
        }
    }

    async fn schema_info(&self, schema: &str) -> Result<SchemaInfo> {
        let row = sqlx::query_as::<_, SchemaRow>(SCHEMA_SQL)
            .bind(schema)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DiffError::SchemaNotFound {
                side: self.side,
                schema: schema.to_string(),
            })?;
        Ok(SchemaInfo::new(schema, row.default_charset, row.default_collation))
    }

    async fn foreign_keys(&self, schema: &str) -> Result<HashMap<String, Vec<ForeignKey>>> {
        let constraints = sqlx::query_as::<_, ConstraintRow>(CONSTRAINTS_SQL)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;
        let mut referential: HashMap<String, ReferentialRule> =
            sqlx::query_as::<_, ReferentialRow>(REFERENTIAL_SQL)
                .bind(schema)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|row| {
                    (
                        row.constraint_name,
                        ReferentialRule {
                            match_option: row.match_option,
                            update_rule: row.update_rule,
                            delete_rule: row.delete_rule,
                            referenced_table: row.referenced_table_name,
                        },
                    )
                })
                .collect();
        let mut key_columns: HashMap<(String, String), Vec<KeyColumnUsage>> = HashMap::new();
        for row in sqlx::query_as::<_, KeyColumnRow>(KEY_COLUMNS_SQL)
            .bind(schema)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?
        {
            key_columns
                .entry((row.table_name, row.constraint_name))
                .or_default()
                .push(KeyColumnUsage {
                    column_name: row.column_name,
                    referenced_column_name: row.referenced_column_name.unwrap_or_default(),
                });
        }

        let mut by_table: HashMap<String, Vec<ForeignKey>> = HashMap::new();
        for row in constraints {
            let columns = key_columns
                .remove(&(row.table_name.clone(), row.constraint_name.clone()))
                .unwrap_or_default();
            let foreign_key = ForeignKey {
                referential: referential.remove(&row.constraint_name),
                name: row.constraint_name,
                table_name: row.table_name.clone(),
                constraint_type: row.constraint_type,
                columns,
            };
            by_table.entry(row.table_name).or_default().push(foreign_key);
        }
        Ok(by_table)
    }
}

impl Catalog for MysqlCatalog {
    async fn load_schema(&self, schema: &str) -> Result<SchemaSnapshot> {
        let info = self.schema_info(schema).await?;

        let tables = sqlx::query_as::<_, TableRow>(TABLES_SQL)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;

        let mut columns: HashMap<String, Vec<Column>> = HashMap::new();
        for row in sqlx::query_as::<_, ColumnRow>(COLUMNS_SQL)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?
        {
            columns.entry(row.table_name.clone()).or_default().push(row.into());
        }

        let mut indexes: HashMap<String, Vec<IndexEntry>> = HashMap::new();
        for row in sqlx::query_as::<_, IndexRow>(STATISTICS_SQL)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?
        {
            indexes.entry(row.table_name.clone()).or_default().push(row.into());
        }

        let mut views: HashMap<String, View> = sqlx::query_as::<_, ViewRow>(VIEWS_SQL)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| {
                (
                    row.table_name.clone(),
                    View {
                        name: row.table_name,
                        definition: row.view_definition,
                        security_type: row.security_type,
                        definer: row.definer,
                        check_option: row.check_option,
                    },
                )
            })
            .collect();

        let mut foreign_keys = if self.foreign_keys {
            self.foreign_keys(schema).await?
        } else {
            HashMap::new()
        };

        let tables: Vec<TableSnapshot> = tables
            .into_iter()
            .map(|row| TableSnapshot {
                columns: columns.remove(&row.table_name).unwrap_or_default(),
                indexes: indexes.remove(&row.table_name).unwrap_or_default(),
                foreign_keys: foreign_keys.remove(&row.table_name).unwrap_or_default(),
                view: views.remove(&row.table_name),
                table: Table {
                    schema: schema.to_string(),
                    kind: TableKind::from_catalog(&row.table_type),
                    name: row.table_name,
                    engine: row.engine,
                    collation: row.table_collation,
                    comment: row.table_comment.unwrap_or_default(),
                },
            })
            .collect();

        info!(
            side = %self.side,
            schema = %schema,
            tables = tables.len(),
            "Loaded schema"
        );
        Ok(SchemaSnapshot {
            schema: info,
            tables,
        })
    }
}
