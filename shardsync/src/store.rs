//! Persistence layer for shard-DDL state.
//!
//! State mutations produce [`SqlStatement`] values rather than touching the
//! database directly, so the caller can batch them into its own checkpoint
//! transaction. The `sqlx` feature adds helpers that load persisted rows and
//! apply statement batches against a MySQL pool.

#[cfg(feature = "sqlx")]
use crate::error::SyncResult;

/// One bind argument of a generated statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl SqlValue {
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }
}

/// A parameterized SQL statement ready to be bound and executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl SqlStatement {
    pub fn new(sql: String, args: Vec<SqlValue>) -> Self {
        Self { sql, args }
    }
}

/// One persisted shard-DDL sequence row.
///
/// A row is either the group's global sequence (`is_global`, empty
/// `source_table_id`) or one source's sequence. Uniqueness is on the target
/// and source table pair, which is what lets flushes upsert in place.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ShardDdlRow {
    pub source_id: String,
    pub target_table_id: String,
    pub source_table_id: String,
    pub active_index: i64,
    pub is_global: bool,
    pub data: String,
}

/// Generates the DDL creating the meta table that shard-DDL rows persist
/// into. `meta_table` must already be a quoted identifier.
pub fn shard_ddl_meta_table_sql(meta_table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {meta_table} (\
         `id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT, \
         `source_id` VARCHAR(32) NOT NULL COMMENT 'replication source id', \
         `target_table_id` VARCHAR(144) NOT NULL, \
         `source_table_id` VARCHAR(144) NOT NULL, \
         `active_index` INT, \
         `is_global` BOOLEAN, \
         `data` JSON, \
         `update_time` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP, \
         PRIMARY KEY (`id`), \
         UNIQUE KEY `uk_target_source` (`target_table_id`, `source_table_id`)\
         )"
    )
}

/// Loads all persisted shard-DDL rows belonging to `source_id`, across every
/// target table.
#[cfg(feature = "sqlx")]
pub async fn load_shard_ddl_rows(
    pool: &sqlx::MySqlPool,
    meta_table: &str,
    source_id: &str,
) -> SyncResult<Vec<ShardDdlRow>> {
    let sql = format!(
        "SELECT `source_id`, `target_table_id`, `source_table_id`, `active_index`, `is_global`, `data` \
         FROM {meta_table} WHERE `source_id` = ?"
    );

    let rows = sqlx::query_as::<_, ShardDdlRow>(&sql)
        .bind(source_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Executes a batch of generated statements inside one transaction.
#[cfg(feature = "sqlx")]
pub async fn apply_sql_statements(
    pool: &sqlx::MySqlPool,
    statements: &[SqlStatement],
) -> SyncResult<()> {
    let mut transaction = pool.begin().await?;

    for statement in statements {
        let mut query = sqlx::query(&statement.sql);
        for arg in &statement.args {
            query = match arg {
                SqlValue::Text(value) => query.bind(value.as_str()),
                SqlValue::Int(value) => query.bind(*value),
                SqlValue::Bool(value) => query.bind(*value),
            };
        }
        query.execute(&mut *transaction).await?;
    }

    transaction.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_table_sql_shape() {
        let sql = shard_ddl_meta_table_sql("`dm_meta`.`test_syncer_sharding_meta`");

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `dm_meta`.`test_syncer_sharding_meta`"));
        assert!(sql.contains("UNIQUE KEY `uk_target_source` (`target_table_id`, `source_table_id`)"));
        assert!(sql.contains("`update_time` TIMESTAMP"));
    }

    #[test]
    fn test_sql_value_text_helper() {
        assert_eq!(SqlValue::text("abc"), SqlValue::Text("abc".to_string()));
    }
}
