//! # User Repository
//!
//! Minimal user records. Authentication is delegated to an external
//! identity layer; these rows exist as referents for cashiers on
//! transactions, actors on inventory logs, and notification owners.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use kasa_core::{Role, User};

const SELECT_COLUMNS: &str = "id, name, role, is_active, created_at";

/// Repository for user records.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user.
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, role = ?user.role, "Inserting user");

        sqlx::query(
            "INSERT INTO users (id, name, role, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Lists active users with the given role.
    ///
    /// Used to broadcast notifications (e.g. new-order alerts to admins).
    pub async fn list_active_by_role(&self, role: Role) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE role = ?1 AND is_active = 1 ORDER BY name"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }
}

/// Helper to generate a new user ID.
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}
