//! # Inventory Log Repository
//!
//! Read access to the append-only stock audit trail. Writes happen in
//! [`crate::repository::product`] alongside the stock mutation itself, so
//! a log row can never exist without its stock change (and vice versa).

use sqlx::SqlitePool;

use crate::error::DbResult;
use kasa_core::InventoryLog;

const SELECT_COLUMNS: &str = r#"
    id, product_id, log_type, quantity_delta,
    previous_stock, new_stock, reason, actor_id, created_at
"#;

/// Repository for inventory log reads.
#[derive(Debug, Clone)]
pub struct InventoryLogRepository {
    pool: SqlitePool,
}

impl InventoryLogRepository {
    /// Creates a new InventoryLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLogRepository { pool }
    }

    /// Lists log entries for one product, newest first.
    pub async fn list_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<InventoryLog>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM inventory_logs \
             WHERE product_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        );
        let logs = sqlx::query_as::<_, InventoryLog>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(logs)
    }

    /// Returns the most recent log entry for a product, if any.
    pub async fn latest_for_product(&self, product_id: &str) -> DbResult<Option<InventoryLog>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM inventory_logs \
             WHERE product_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1"
        );
        let log = sqlx::query_as::<_, InventoryLog>(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(log)
    }

    /// Lists recent log entries across all products, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<InventoryLog>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM inventory_logs \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );
        let logs = sqlx::query_as::<_, InventoryLog>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(logs)
    }

    /// Counts log entries for a product (for diagnostics and tests).
    pub async fn count_for_product(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_logs WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
