//! # Notification Handlers
//!
//! The alert inbox. Ownership comes from the `userId` parameter; session
//! resolution is the job of the external auth layer in front of this API.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::services::notify;
use crate::state::AppState;
use kasa_core::{Notification, NotificationKind};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    /// Parsed metadata payload, when present and valid JSON.
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        NotificationDto {
            id: n.id,
            title: n.title,
            message: n.message,
            kind: n.kind,
            is_read: n.is_read,
            metadata: n.metadata.and_then(|m| serde_json::from_str(&m).ok()),
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    pub user_id: String,
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxDto {
    pub data: Vec<NotificationDto>,
    pub unread_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadDto {
    pub marked: u64,
}

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<InboxDto>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(200);

    let notifications = state
        .db
        .notifications()
        .list_for_user(&query.user_id, query.unread_only, limit)
        .await?;
    let unread_count = state.db.notifications().unread_count(&query.user_id).await?;

    Ok(Json(InboxDto {
        data: notifications.into_iter().map(NotificationDto::from).collect(),
        unread_count,
    }))
}

/// POST /api/notifications
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationDto>), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::validation("title is required"));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::validation("message is required"));
    }

    let notification = notify::create(
        &state.db,
        &req.user_id,
        req.title.trim(),
        req.message.trim(),
        req.kind,
        req.metadata,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(NotificationDto::from(notification))))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .notifications()
        .mark_read(&id, &query.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/notifications/read-all
pub async fn read_all(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<MarkAllReadDto>, ApiError> {
    let marked = state.db.notifications().mark_all_read(&query.user_id).await?;
    Ok(Json(MarkAllReadDto { marked }))
}

/// DELETE /api/notifications/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
    state.db.notifications().delete(&id, &query.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
