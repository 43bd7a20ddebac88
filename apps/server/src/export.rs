//! # Report Export
//!
//! Renders the read model into CSV byte streams for download. The same
//! queries the dashboard reports use, re-derived on every request.

use csv::WriterBuilder;

use crate::error::ApiError;
use kasa_db::Database;

/// Renders all transactions as CSV.
///
/// Columns: number, created_at, payment_method, payment_status,
/// subtotal_cents, tax_cents, discount_cents, total_cents, cashier_id.
pub async fn transactions_csv(db: &Database) -> Result<Vec<u8>, ApiError> {
    // Full dump, paged through the repository to bound each query.
    const PAGE: u32 = 500;

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record([
            "number",
            "created_at",
            "payment_method",
            "payment_status",
            "subtotal_cents",
            "tax_cents",
            "discount_cents",
            "total_cents",
            "cashier_id",
        ])
        .map_err(|e| ApiError::internal(format!("CSV write failed: {e}")))?;

    let mut offset = 0;
    loop {
        let page = db.transactions().list(PAGE, offset).await?;
        if page.is_empty() {
            break;
        }
        offset += page.len() as u32;

        for t in &page {
            writer
                .write_record([
                    t.number.clone(),
                    t.created_at.to_rfc3339(),
                    t.payment_method.as_str().to_string(),
                    t.payment_status.as_str().to_string(),
                    t.subtotal_cents.to_string(),
                    t.tax_cents.to_string(),
                    t.discount_cents.to_string(),
                    t.total_cents.to_string(),
                    t.cashier_id.clone(),
                ])
                .map_err(|e| ApiError::internal(format!("CSV write failed: {e}")))?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::internal(format!("CSV flush failed: {e}")))
}

/// Renders the active product catalog as CSV.
///
/// Columns: sku, name, category_id, price_cents, cost_cents, stock,
/// min_stock.
pub async fn products_csv(db: &Database) -> Result<Vec<u8>, ApiError> {
    const PAGE: u32 = 500;

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record([
            "sku",
            "name",
            "category_id",
            "price_cents",
            "cost_cents",
            "stock",
            "min_stock",
        ])
        .map_err(|e| ApiError::internal(format!("CSV write failed: {e}")))?;

    let mut offset = 0;
    loop {
        let page = db.products().list_active(PAGE, offset).await?;
        if page.is_empty() {
            break;
        }
        offset += page.len() as u32;

        for p in &page {
            writer
                .write_record([
                    p.sku.clone(),
                    p.name.clone(),
                    p.category_id.clone(),
                    p.price_cents.to_string(),
                    p.cost_cents.to_string(),
                    p.stock.to_string(),
                    p.min_stock.to_string(),
                ])
                .map_err(|e| ApiError::internal(format!("CSV write failed: {e}")))?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::internal(format!("CSV flush failed: {e}")))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::checkout::{create_transaction, CheckoutInput, CheckoutItemInput};
    use crate::testutil::{seeded_state, CASHIER_ID, PRODUCT_A};
    use kasa_core::PaymentMethod;

    #[tokio::test]
    async fn test_transactions_csv_contains_created_rows() {
        let state = seeded_state().await;

        let outcome = create_transaction(
            &state,
            CheckoutInput {
                items: vec![CheckoutItemInput {
                    product_id: PRODUCT_A.to_string(),
                    quantity: 2,
                }],
                payment_method: PaymentMethod::Cash,
                cashier_id: CASHIER_ID.to_string(),
                tax_cents: 0,
                discount_cents: 0,
            },
        )
        .await
        .unwrap();

        let bytes = transactions_csv(&state.db).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("number,created_at,payment_method"));
        assert!(text.contains(&outcome.transaction.number));
        assert!(text.contains("cash"));
        assert!(text.contains("20000"));
    }

    #[tokio::test]
    async fn test_products_csv_lists_catalog() {
        let state = seeded_state().await;

        let bytes = products_csv(&state.db).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("KOPI-250"));
        assert!(text.contains("TEH-330"));
    }
}
