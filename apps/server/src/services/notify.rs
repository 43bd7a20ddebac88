//! # Notification Service
//!
//! Fire-and-forget creation of user-facing alerts.
//!
//! Two delivery modes:
//! - targeted: one notification for one user
//! - broadcast: one notification per active user with a given role
//!
//! Core mutations (checkout, reconciliation, adjustments) call these AFTER
//! their database transaction commits, through [`best_effort`]: a failed
//! notification write is logged and swallowed, never allowed to fail the
//! stock/status mutation it decorates. The dedicated notification
//! endpoints propagate errors normally.

use tracing::warn;

use crate::error::ApiError;
use kasa_core::{Notification, NotificationKind, Role};
use kasa_db::{Database, DbResult};

/// Creates a notification for one user.
///
/// ## Errors
/// * not-found when the user does not exist
pub async fn create(
    db: &Database,
    user_id: &str,
    title: &str,
    message: &str,
    kind: NotificationKind,
    metadata: Option<serde_json::Value>,
) -> Result<Notification, ApiError> {
    if db.users().get_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("User", user_id));
    }

    let metadata = metadata.map(|m| m.to_string());
    let notification = db
        .notifications()
        .create(user_id, title, message, kind, metadata)
        .await?;

    Ok(notification)
}

/// Creates one notification per active user with the given role.
///
/// Returns how many notifications were written.
pub async fn broadcast_to_role(
    db: &Database,
    role: Role,
    title: &str,
    message: &str,
    kind: NotificationKind,
    metadata: Option<serde_json::Value>,
) -> DbResult<usize> {
    let users = db.users().list_active_by_role(role).await?;
    let metadata = metadata.map(|m| m.to_string());

    let mut written = 0;
    for user in &users {
        db.notifications()
            .create(&user.id, title, message, kind, metadata.clone())
            .await?;
        written += 1;
    }

    Ok(written)
}

/// Logs and swallows a failed best-effort side effect.
///
/// Notifications are non-critical to the primary workflow; their failure
/// must not surface after the core mutation already committed.
pub fn best_effort<T, E: std::fmt::Display>(context: &str, result: Result<T, E>) {
    if let Err(e) = result {
        warn!(context = %context, error = %e, "Best-effort side effect failed");
    }
}
