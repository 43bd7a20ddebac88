//! Inventory handlers: batch adjustment and the audit trail.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::services::inventory::{self, AdjustmentInput, AdjustmentOutcome};
use crate::state::AppState;
use kasa_core::{InventoryLog, InventoryLogType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    /// User performing the adjustment.
    pub actor_id: String,
    pub items: Vec<AdjustmentInput>,
}

/// POST /api/inventory/adjust
///
/// Applies the batch item by item; the response lists one outcome per
/// input. Partial failure is expressed in the list, never as an HTTP
/// error for the whole batch.
pub async fn adjust(
    State(state): State<AppState>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<Vec<AdjustmentOutcome>>, ApiError> {
    let outcomes = inventory::adjust_batch(&state, &req.actor_id, req.items).await?;
    Ok(Json(outcomes))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLogDto {
    pub id: String,
    pub product_id: String,
    pub log_type: InventoryLogType,
    pub quantity_delta: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reason: Option<String>,
    pub actor_id: String,
    pub created_at: String,
}

impl From<InventoryLog> for InventoryLogDto {
    fn from(l: InventoryLog) -> Self {
        InventoryLogDto {
            id: l.id,
            product_id: l.product_id,
            log_type: l.log_type,
            quantity_delta: l.quantity_delta,
            previous_stock: l.previous_stock,
            new_stock: l.new_stock,
            reason: l.reason,
            actor_id: l.actor_id,
            created_at: l.created_at.to_rfc3339(),
        }
    }
}

/// GET /api/inventory/logs
pub async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<InventoryLogDto>>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(200);

    let logs = match query.product_id {
        Some(product_id) => {
            state
                .db
                .inventory_logs()
                .list_for_product(&product_id, limit)
                .await?
        }
        None => state.db.inventory_logs().list_recent(limit).await?,
    };

    Ok(Json(logs.into_iter().map(InventoryLogDto::from).collect()))
}
