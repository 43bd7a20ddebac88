//! Shared fixtures for service tests: an in-memory database seeded with a
//! cashier, an admin, one category and two products, wired to the mock
//! gateway.

use std::sync::Arc;

use chrono::Utc;

use crate::config::ServerConfig;
use crate::gateway::MockGateway;
use crate::state::AppState;
use kasa_core::{Category, Product, Role, User};
use kasa_db::{Database, DbConfig};

pub const CASHIER_ID: &str = "cashier-1";
pub const ADMIN_ID: &str = "admin-1";
pub const CATEGORY_ID: &str = "category-1";
/// Price 10000, stock 10, min_stock 2.
pub const PRODUCT_A: &str = "product-a";
/// Price 5000, stock 10, min_stock 2.
pub const PRODUCT_B: &str = "product-b";

fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_path: ":memory:".to_string(),
        gateway_base_url: "https://gateway.invalid".to_string(),
        gateway_api_key: "test-key".to_string(),
        gateway_timeout_secs: 1,
        invoice_duration_secs: 3600,
        success_redirect_url: "http://localhost/success".to_string(),
        failure_redirect_url: "http://localhost/failed".to_string(),
    }
}

/// Seeded state with the mock gateway kept reachable for scripting.
pub async fn seeded_state_with_gateway() -> (AppState, Arc<MockGateway>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let now = Utc::now();

    db.users()
        .insert(&User {
            id: CASHIER_ID.to_string(),
            name: "Test Cashier".to_string(),
            role: Role::Cashier,
            is_active: true,
            created_at: now,
        })
        .await
        .unwrap();

    db.users()
        .insert(&User {
            id: ADMIN_ID.to_string(),
            name: "Test Admin".to_string(),
            role: Role::Admin,
            is_active: true,
            created_at: now,
        })
        .await
        .unwrap();

    db.categories()
        .insert(&Category {
            id: CATEGORY_ID.to_string(),
            name: "Drinks".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    db.products()
        .insert(&Product {
            id: PRODUCT_A.to_string(),
            sku: "KOPI-250".to_string(),
            name: "Kopi Susu 250ml".to_string(),
            description: None,
            category_id: CATEGORY_ID.to_string(),
            price_cents: 10000,
            cost_cents: 7000,
            stock: 10,
            min_stock: 2,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    db.products()
        .insert(&Product {
            id: PRODUCT_B.to_string(),
            sku: "TEH-330".to_string(),
            name: "Teh Botol 330ml".to_string(),
            description: None,
            category_id: CATEGORY_ID.to_string(),
            price_cents: 5000,
            cost_cents: 3000,
            stock: 10,
            min_stock: 2,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let gateway = Arc::new(MockGateway::new());
    let state = AppState::new(db, gateway.clone(), test_config());

    (state, gateway)
}

/// Seeded state for tests that don't script the gateway.
pub async fn seeded_state() -> AppState {
    seeded_state_with_gateway().await.0
}
