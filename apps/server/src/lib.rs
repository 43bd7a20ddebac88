//! # Kasa POS API Server
//!
//! HTTP API for the Kasa POS dashboard and the payment gateway webhook.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Request Flow                                    │
//! │                                                                         │
//! │  Dashboard / Gateway                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  routes/*  ── thin handlers: extract, call service, map to DTO         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  services/* ── checkout, payment reconciliation, inventory, alerts     │
//! │       │                     │                                           │
//! │       ▼                     ▼                                           │
//! │  kasa-db (SQLite)     gateway.rs (reqwest, bounded timeout)            │
//! │                                                                         │
//! │  kasa-core supplies the pure pieces: totals math, status mapping,      │
//! │  the transition function, validation.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod gateway;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::ServerConfig;
pub use state::AppState;
