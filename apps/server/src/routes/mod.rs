//! # HTTP Routes
//!
//! Route table for the Kasa POS API.
//!
//! ```text
//! /health                                   liveness + db check
//! /api/products                             catalog CRUD + low-stock list
//! /api/categories                           category CRUD
//! /api/transactions                         checkout, listing, payment ops
//! /api/payments/webhook                     inbound gateway webhook
//! /api/inventory                            batch adjustment + audit trail
//! /api/notifications                        alert inbox
//! /api/reports                              aggregation + CSV export
//! ```

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod categories;
pub mod health;
pub mod inventory;
pub mod notifications;
pub mod payments;
pub mod products;
pub mod reports;
pub mod transactions;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Catalog
        .route("/products", get(products::list).post(products::create))
        .route("/products/low-stock", get(products::low_stock))
        .route(
            "/products/{id}",
            get(products::get_by_id)
                .put(products::update)
                .delete(products::remove),
        )
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            get(categories::get_by_id)
                .put(categories::update)
                .delete(categories::remove),
        )
        // Transactions & payments
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route("/transactions/{id}", get(transactions::get_by_id))
        .route("/transactions/{id}/pay", post(transactions::pay))
        .route("/transactions/{id}/status", get(transactions::status))
        .route("/payments/webhook", post(payments::webhook))
        // Inventory
        .route("/inventory/adjust", post(inventory::adjust))
        .route("/inventory/logs", get(inventory::logs))
        // Notifications
        .route(
            "/notifications",
            get(notifications::list).post(notifications::create),
        )
        .route("/notifications/read-all", post(notifications::read_all))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/notifications/{id}", delete(notifications::remove))
        // Reports
        .route("/reports/summary", get(reports::summary))
        .route("/reports/revenue-by-day", get(reports::revenue_by_day))
        .route("/reports/revenue-by-method", get(reports::revenue_by_method))
        .route("/reports/top-products", get(reports::top_products))
        .route(
            "/reports/export/transactions.csv",
            get(reports::export_transactions),
        )
        .route(
            "/reports/export/products.csv",
            get(reports::export_products),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
