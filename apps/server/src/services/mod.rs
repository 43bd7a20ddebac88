//! # Service Layer
//!
//! Orchestration between HTTP handlers, the repositories and the payment
//! gateway. Handlers stay thin; the workflow logic lives here.
//!
//! ## Modules
//!
//! - [`checkout`] - transaction creation, including the immediate-paid
//!   cash path with its atomic stock decrements
//! - [`payments`] - digital payment initiation and the reconciliation
//!   workflow shared by webhook, status check and manual re-sync
//! - [`inventory`] - batch stock adjustments with per-item results
//! - [`notify`] - fire-and-forget alert creation and role broadcasts

pub mod checkout;
pub mod inventory;
pub mod notify;
pub mod payments;
