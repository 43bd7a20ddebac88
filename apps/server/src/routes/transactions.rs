//! # Transaction Handlers
//!
//! Checkout, listing, and the payment operations (initiate + status check).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::services::checkout::{self, CheckoutInput};
use crate::services::payments::{self, InitiatedPayment, StatusCheck};
use crate::state::AppState;
use kasa_core::{Transaction, TransactionItem};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    pub number: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: kasa_core::PaymentMethod,
    pub payment_status: kasa_core::PaymentStatus,
    pub gateway_invoice_id: Option<String>,
    pub gateway_invoice_url: Option<String>,
    pub cashier_id: String,
    pub created_at: String,
    pub paid_at: Option<String>,
}

impl From<Transaction> for TransactionDto {
    fn from(t: Transaction) -> Self {
        TransactionDto {
            id: t.id,
            number: t.number,
            subtotal_cents: t.subtotal_cents,
            tax_cents: t.tax_cents,
            discount_cents: t.discount_cents,
            total_cents: t.total_cents,
            payment_method: t.payment_method,
            payment_status: t.payment_status,
            gateway_invoice_id: t.gateway_invoice_id,
            gateway_invoice_url: t.gateway_invoice_url,
            cashier_id: t.cashier_id,
            created_at: t.created_at.to_rfc3339(),
            paid_at: t.paid_at.map(|d| d.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItemDto {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl From<TransactionItem> for TransactionItemDto {
    fn from(i: TransactionItem) -> Self {
        TransactionItemDto {
            product_id: i.product_id,
            sku: i.sku_snapshot,
            name: i.name_snapshot,
            unit_price_cents: i.unit_price_cents,
            quantity: i.quantity,
            line_total_cents: i.line_total_cents,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetailDto {
    #[serde(flatten)]
    pub transaction: TransactionDto,
    pub items: Vec<TransactionItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPageDto {
    pub data: Vec<TransactionDto>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheckDto {
    pub status: kasa_core::PaymentStatus,
    pub transaction: TransactionDto,
}

impl From<StatusCheck> for StatusCheckDto {
    fn from(s: StatusCheck) -> Self {
        StatusCheckDto {
            status: s.status,
            transaction: TransactionDto::from(s.transaction),
        }
    }
}

/// POST /api/transactions
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CheckoutInput>,
) -> Result<(StatusCode, Json<TransactionDetailDto>), ApiError> {
    let outcome = checkout::create_transaction(&state, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionDetailDto {
            transaction: TransactionDto::from(outcome.transaction),
            items: outcome
                .items
                .into_iter()
                .map(TransactionItemDto::from)
                .collect(),
        }),
    ))
}

/// GET /api/transactions
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TransactionPageDto>, ApiError> {
    let limit = query.limit.unwrap_or(20).min(100);
    let offset = query.offset.unwrap_or(0);

    let transactions = state.db.transactions().list(limit, offset).await?;
    let total = state.db.transactions().count().await?;

    Ok(Json(TransactionPageDto {
        data: transactions.into_iter().map(TransactionDto::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// GET /api/transactions/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionDetailDto>, ApiError> {
    let transaction = state
        .db
        .transactions()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", &id))?;

    let items = state.db.transactions().get_items(&id).await?;

    Ok(Json(TransactionDetailDto {
        transaction: TransactionDto::from(transaction),
        items: items.into_iter().map(TransactionItemDto::from).collect(),
    }))
}

/// POST /api/transactions/{id}/pay
pub async fn pay(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InitiatedPayment>, ApiError> {
    let initiated = payments::initiate(&state, &id).await?;
    Ok(Json(initiated))
}

/// GET /api/transactions/{id}/status
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusCheckDto>, ApiError> {
    let check = payments::check_status(&state, &id).await?;
    Ok(Json(StatusCheckDto::from(check)))
}
