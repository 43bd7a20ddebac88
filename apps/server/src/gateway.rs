//! # Payment Gateway Client
//!
//! The gateway is an opaque external capability: create an invoice for an
//! amount, fetch an invoice's status. Everything else about the gateway
//! (its wire format, its retry behavior) stays behind this seam.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Gateway Boundary                                    │
//! │                                                                         │
//! │  services/payments ──► PaymentGateway (trait)                          │
//! │                             │                                           │
//! │                  ┌──────────┴──────────┐                               │
//! │                  ▼                     ▼                               │
//! │           HttpGateway            MockGateway (tests)                   │
//! │        reqwest + API key        in-memory status map                   │
//! │        bounded timeout                                                 │
//! │                                                                         │
//! │  The reconciliation logic never sees reqwest or JSON bodies - only    │
//! │  Invoice { id, url } and a raw status string.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ServerConfig;

/// Errors from the payment gateway boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never completed (network failure, timeout).
    #[error("Gateway request failed: {0}")]
    Request(String),

    /// The gateway answered with a non-success status.
    #[error("Gateway returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The gateway answered 2xx but the body was not understood.
    #[error("Gateway response could not be parsed: {0}")]
    InvalidResponse(String),
}

/// Request to create a hosted invoice.
#[derive(Debug, Clone, Serialize)]
pub struct CreateInvoice {
    /// Our reference, `pos-{transaction_id}`; echoed back in webhooks.
    pub external_id: String,
    /// Amount in the smallest currency unit.
    pub amount_cents: i64,
    /// Shown on the hosted checkout page.
    pub description: String,
    /// Customer email, when the cashier captured one.
    pub payer_email: Option<String>,
    /// Redirect target after successful payment.
    pub success_redirect_url: String,
    /// Redirect target after failed payment.
    pub failure_redirect_url: String,
    /// How long the invoice stays payable, in seconds.
    pub duration_secs: u64,
}

/// A created invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    /// Gateway-assigned invoice id.
    pub id: String,
    /// Hosted checkout URL the customer is redirected to.
    pub url: String,
}

/// Current status of an invoice as reported by the gateway.
///
/// `status` stays the gateway's raw vocabulary; mapping onto our
/// [`kasa_core::PaymentStatus`] happens in kasa-core.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceStatus {
    pub id: String,
    pub status: String,
}

/// Abstract payment gateway capability.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted invoice and returns its id and checkout URL.
    async fn create_invoice(&self, req: CreateInvoice) -> Result<Invoice, GatewayError>;

    /// Fetches the current status of an invoice by gateway id.
    async fn get_invoice(&self, invoice_id: &str) -> Result<InvoiceStatus, GatewayError>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// Wire format for invoice creation.
#[derive(Debug, Serialize)]
struct CreateInvoiceBody<'a> {
    external_id: &'a str,
    amount: i64,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer_email: Option<&'a str>,
    success_redirect_url: &'a str,
    failure_redirect_url: &'a str,
    invoice_duration: u64,
}

/// Wire format of the gateway's invoice resource.
#[derive(Debug, Deserialize)]
struct InvoiceBody {
    id: String,
    #[serde(default)]
    invoice_url: String,
    status: String,
}

/// reqwest-backed gateway client.
///
/// Every call carries the configured timeout; a hung gateway fails the
/// request instead of hanging the handler.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGateway {
    /// Builds the client from server configuration.
    pub fn new(config: &ServerConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(HttpGateway {
            client,
            base_url: config.gateway_base_url.trim_end_matches('/').to_string(),
            api_key: config.gateway_api_key.clone(),
        })
    }

    async fn parse_invoice(response: reqwest::Response) -> Result<InvoiceBody, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<InvoiceBody>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_invoice(&self, req: CreateInvoice) -> Result<Invoice, GatewayError> {
        debug!(external_id = %req.external_id, amount = %req.amount_cents, "Creating gateway invoice");

        let body = CreateInvoiceBody {
            external_id: &req.external_id,
            amount: req.amount_cents,
            description: &req.description,
            payer_email: req.payer_email.as_deref(),
            success_redirect_url: &req.success_redirect_url,
            failure_redirect_url: &req.failure_redirect_url,
            invoice_duration: req.duration_secs,
        };

        let response = self
            .client
            .post(format!("{}/v2/invoices", self.base_url))
            .basic_auth(&self.api_key, Some(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let invoice = Self::parse_invoice(response).await?;

        Ok(Invoice {
            id: invoice.id,
            url: invoice.invoice_url,
        })
    }

    async fn get_invoice(&self, invoice_id: &str) -> Result<InvoiceStatus, GatewayError> {
        debug!(invoice_id = %invoice_id, "Fetching gateway invoice status");

        let response = self
            .client
            .get(format!("{}/v2/invoices/{}", self.base_url, invoice_id))
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let invoice = Self::parse_invoice(response).await?;

        Ok(InvoiceStatus {
            id: invoice.id,
            status: invoice.status,
        })
    }
}

// =============================================================================
// Mock Implementation (tests)
// =============================================================================

/// In-memory gateway for service tests.
///
/// `create_invoice` records the invoice; `set_status` scripts what the next
/// `get_invoice` reports.
#[cfg(test)]
pub struct MockGateway {
    statuses: std::sync::Mutex<std::collections::HashMap<String, String>>,
    /// When set, create_invoice fails with this message.
    pub fail_create: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl MockGateway {
    pub fn new() -> Self {
        MockGateway {
            statuses: std::sync::Mutex::new(std::collections::HashMap::new()),
            fail_create: std::sync::Mutex::new(None),
        }
    }

    pub fn set_status(&self, invoice_id: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(invoice_id.to_string(), status.to_string());
    }
}

#[cfg(test)]
#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_invoice(&self, req: CreateInvoice) -> Result<Invoice, GatewayError> {
        if let Some(msg) = self.fail_create.lock().unwrap().clone() {
            return Err(GatewayError::Api {
                status: 400,
                body: msg,
            });
        }

        let id = format!("mock-{}", req.external_id);
        self.statuses
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_insert_with(|| "PENDING".to_string());

        Ok(Invoice {
            url: format!("https://pay.example/{}", id),
            id,
        })
    }

    async fn get_invoice(&self, invoice_id: &str) -> Result<InvoiceStatus, GatewayError> {
        let statuses = self.statuses.lock().unwrap();
        let status = statuses
            .get(invoice_id)
            .cloned()
            .unwrap_or_else(|| "PENDING".to_string());

        Ok(InvoiceStatus {
            id: invoice_id.to_string(),
            status,
        })
    }
}
