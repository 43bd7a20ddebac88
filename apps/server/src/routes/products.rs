//! # Product Handlers
//!
//! Catalog CRUD plus the low-stock listing.
//!
//! Initial stock on creation goes through the same logged path as any
//! other stock change: the product is inserted empty and an opening
//! RESTOCK adjustment brings it to the requested level, so the audit
//! trail starts at row one.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use kasa_core::validation::{validate_name, validate_price_cents, validate_sku, validate_stock_level};
use kasa_core::Product;
use kasa_db::repository::product::generate_product_id;
use kasa_db::ProductRepository;

/// Product DTO (Data Transfer Object) for the dashboard.
///
/// ## Why DTO?
/// - Decouples internal domain model from API contract
/// - Handles serde rename to camelCase for JS consumption
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock: i64,
    pub min_stock: i64,
    pub is_low_stock: bool,
    pub is_active: bool,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            is_low_stock: p.is_low_stock(),
            id: p.id,
            sku: p.sku,
            name: p.name,
            description: p.description,
            category_id: p.category_id,
            price_cents: p.price_cents,
            cost_cents: p.cost_cents,
            stock: p.stock,
            min_stock: p.min_stock,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: String,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    /// Opening stock; logged as an initial RESTOCK adjustment.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    /// User recorded as the actor on the opening stock log.
    pub actor_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: String,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// GET /api/products
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProductDto>>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(200);
    let offset = query.offset.unwrap_or(0);

    let products = state.db.products().list_active(limit, offset).await?;
    Ok(Json(products.into_iter().map(ProductDto::from).collect()))
}

/// GET /api/products/low-stock
pub async fn low_stock(
    State(state): State<AppState>,
    Query(query): Query<LowStockQuery>,
) -> Result<Json<Vec<ProductDto>>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(200);

    let products = state.db.products().list_low_stock(limit).await?;
    Ok(Json(products.into_iter().map(ProductDto::from).collect()))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductDto>, ApiError> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(ProductDto::from(product)))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductDto>), ApiError> {
    validate_sku(&req.sku)?;
    validate_name(&req.name)?;
    validate_price_cents(req.price_cents)?;
    validate_price_cents(req.cost_cents)?;
    validate_stock_level(req.stock)?;
    validate_stock_level(req.min_stock)?;

    if state.db.categories().get_by_id(&req.category_id).await?.is_none() {
        return Err(ApiError::not_found("Category", &req.category_id));
    }
    if state.db.users().get_by_id(&req.actor_id).await?.is_none() {
        return Err(ApiError::not_found("User", &req.actor_id));
    }

    let now = Utc::now();
    let product = Product {
        id: generate_product_id(),
        sku: req.sku.trim().to_string(),
        name: req.name.trim().to_string(),
        description: req.description,
        category_id: req.category_id,
        price_cents: req.price_cents,
        cost_cents: req.cost_cents,
        stock: 0,
        min_stock: req.min_stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    debug!(sku = %product.sku, "Creating product");
    state.db.products().insert(&product).await?;

    // Opening stock goes through the logged path.
    if req.stock > 0 {
        let mut tx = state.db.pool().begin().await?;
        ProductRepository::set_stock(
            &mut tx,
            &product.id,
            req.stock,
            &req.actor_id,
            Some("initial stock"),
        )
        .await?;
        tx.commit().await?;
    }

    let stored = state
        .db
        .products()
        .get_by_id(&product.id)
        .await?
        .ok_or_else(|| ApiError::internal("product vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(ProductDto::from(stored))))
}

/// PUT /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductDto>, ApiError> {
    validate_sku(&req.sku)?;
    validate_name(&req.name)?;
    validate_price_cents(req.price_cents)?;
    validate_price_cents(req.cost_cents)?;
    validate_stock_level(req.min_stock)?;

    let existing = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    if state.db.categories().get_by_id(&req.category_id).await?.is_none() {
        return Err(ApiError::not_found("Category", &req.category_id));
    }

    let updated = Product {
        sku: req.sku.trim().to_string(),
        name: req.name.trim().to_string(),
        description: req.description,
        category_id: req.category_id,
        price_cents: req.price_cents,
        cost_cents: req.cost_cents,
        min_stock: req.min_stock,
        is_active: req.is_active,
        ..existing
    };

    state.db.products().update(&updated).await?;

    let stored = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(ProductDto::from(stored)))
}

/// DELETE /api/products/{id} (soft delete)
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.products().soft_delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
