//! Category handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use kasa_core::validation::validate_name;
use kasa_core::Category;
use kasa_db::repository::category::generate_category_id;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<Category> for CategoryDto {
    fn from(c: Category) -> Self {
        CategoryDto {
            id: c.id,
            name: c.name,
            description: c.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// GET /api/categories
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CategoryDto>>, ApiError> {
    let categories = state.db.categories().list().await?;
    Ok(Json(categories.into_iter().map(CategoryDto::from).collect()))
}

/// GET /api/categories/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CategoryDto>, ApiError> {
    let category = state
        .db
        .categories()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", &id))?;

    Ok(Json(CategoryDto::from(category)))
}

/// POST /api/categories
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryDto>), ApiError> {
    validate_name(&req.name)?;

    let now = Utc::now();
    let category = Category {
        id: generate_category_id(),
        name: req.name.trim().to_string(),
        description: req.description,
        created_at: now,
        updated_at: now,
    };

    state.db.categories().insert(&category).await?;

    Ok((StatusCode::CREATED, Json(CategoryDto::from(category))))
}

/// PUT /api/categories/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<CategoryDto>, ApiError> {
    validate_name(&req.name)?;

    let existing = state
        .db
        .categories()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", &id))?;

    let updated = Category {
        name: req.name.trim().to_string(),
        description: req.description,
        ..existing
    };

    state.db.categories().update(&updated).await?;

    Ok(Json(CategoryDto::from(updated)))
}

/// DELETE /api/categories/{id}
///
/// Hard delete; refused while products still reference the category.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.categories().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
