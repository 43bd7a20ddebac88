//! # Report Repository
//!
//! Read-only aggregation over transactions and products for dashboards and
//! export. Everything is computed database-side and re-derived on every
//! request; there is no caching layer.
//!
//! Revenue figures only count transactions whose `payment_status` is
//! `paid`. Pending/failed/expired transactions appear in counts where
//! explicitly noted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;

/// Totals for a date range.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    /// Sum of total_cents over paid transactions.
    pub revenue_cents: i64,
    /// Number of paid transactions.
    pub transaction_count: i64,
    /// Units sold across paid transactions.
    pub items_sold: i64,
}

/// Revenue rollup for one calendar day.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RevenueByDay {
    /// Day in `YYYY-MM-DD` form.
    pub day: String,
    pub revenue_cents: i64,
    pub transaction_count: i64,
}

/// Revenue rollup for one payment method.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RevenueByMethod {
    pub payment_method: String,
    pub revenue_cents: i64,
    pub transaction_count: i64,
}

/// A product ranked by revenue.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

/// Repository for read-only aggregation queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Revenue, transaction count and units sold over an optional range.
    pub async fn sales_summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<SalesSummary> {
        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT
                COALESCE(SUM(t.total_cents), 0) AS revenue_cents,
                COUNT(t.id) AS transaction_count,
                COALESCE((
                    SELECT SUM(ti.quantity)
                    FROM transaction_items ti
                    JOIN transactions tt ON tt.id = ti.transaction_id
                    WHERE tt.payment_status = 'paid'
                      AND (?1 IS NULL OR tt.created_at >= ?1)
                      AND (?2 IS NULL OR tt.created_at < ?2)
                ), 0) AS items_sold
            FROM transactions t
            WHERE t.payment_status = 'paid'
              AND (?1 IS NULL OR t.created_at >= ?1)
              AND (?2 IS NULL OR t.created_at < ?2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Paid revenue grouped by calendar day, oldest first.
    pub async fn revenue_by_day(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<RevenueByDay>> {
        // Timestamps are stored in a lexically sortable ISO form, so the
        // first 10 characters are the calendar day.
        let rows = sqlx::query_as::<_, RevenueByDay>(
            r#"
            SELECT
                substr(created_at, 1, 10) AS day,
                COALESCE(SUM(total_cents), 0) AS revenue_cents,
                COUNT(id) AS transaction_count
            FROM transactions
            WHERE payment_status = 'paid'
              AND (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at < ?2)
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Paid revenue grouped by payment method.
    pub async fn revenue_by_method(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<RevenueByMethod>> {
        let rows = sqlx::query_as::<_, RevenueByMethod>(
            r#"
            SELECT
                payment_method,
                COALESCE(SUM(total_cents), 0) AS revenue_cents,
                COUNT(id) AS transaction_count
            FROM transactions
            WHERE payment_status = 'paid'
              AND (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at < ?2)
            GROUP BY payment_method
            ORDER BY revenue_cents DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Top N products by paid revenue.
    pub async fn top_products(&self, limit: u32) -> DbResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                ti.product_id,
                ti.sku_snapshot AS sku,
                ti.name_snapshot AS name,
                COALESCE(SUM(ti.quantity), 0) AS quantity_sold,
                COALESCE(SUM(ti.line_total_cents), 0) AS revenue_cents
            FROM transaction_items ti
            JOIN transactions t ON t.id = ti.transaction_id
            WHERE t.payment_status = 'paid'
            GROUP BY ti.product_id, ti.sku_snapshot, ti.name_snapshot
            ORDER BY revenue_cents DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
