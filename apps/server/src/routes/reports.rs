//! # Report Handlers
//!
//! Read-only aggregation endpoints and CSV export. All figures are
//! re-derived per request; nothing is cached.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::export;
use crate::state::AppState;
use kasa_db::repository::report::{RevenueByDay, RevenueByMethod, SalesSummary, TopProduct};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    /// Inclusive lower bound (RFC3339).
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound (RFC3339).
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// GET /api/reports/summary
pub async fn summary(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<SalesSummary>, ApiError> {
    let summary = state.db.reports().sales_summary(range.from, range.to).await?;
    Ok(Json(summary))
}

/// GET /api/reports/revenue-by-day
pub async fn revenue_by_day(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<RevenueByDay>>, ApiError> {
    let rows = state.db.reports().revenue_by_day(range.from, range.to).await?;
    Ok(Json(rows))
}

/// GET /api/reports/revenue-by-method
pub async fn revenue_by_method(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<RevenueByMethod>>, ApiError> {
    let rows = state
        .db
        .reports()
        .revenue_by_method(range.from, range.to)
        .await?;
    Ok(Json(rows))
}

/// GET /api/reports/top-products
pub async fn top_products(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<TopProduct>>, ApiError> {
    let limit = query.limit.unwrap_or(10).min(100);
    let rows = state.db.reports().top_products(limit).await?;
    Ok(Json(rows))
}

/// GET /api/reports/export/transactions.csv
pub async fn export_transactions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = export::transactions_csv(&state.db).await?;
    Ok(csv_response("transactions.csv", bytes))
}

/// GET /api/reports/export/products.csv
pub async fn export_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let bytes = export::products_csv(&state.db).await?;
    Ok(csv_response("products.csv", bytes))
}

fn csv_response(filename: &str, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
}
