//! # Transaction Repository
//!
//! Database operations for transactions and their line items.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transaction Lifecycle                               │
//! │                                                                         │
//! │  1. CREATE (checkout)                                                  │
//! │     └── create_with_items() → header + items in ONE db transaction     │
//! │                                                                         │
//! │  2. (digital only) INITIATE PAYMENT                                    │
//! │     └── set_gateway_invoice() → stores invoice id + checkout URL       │
//! │                                                                         │
//! │  3. RECONCILE                                                          │
//! │     └── try_transition() → compare-and-set on payment_status           │
//! │         exactly one trigger wins; the rest see 0 rows affected         │
//! │                                                                         │
//! │  Items and totals are immutable after step 1.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kasa_core::{PaymentStatus, Transaction, TransactionItem};

const SELECT_COLUMNS: &str = r#"
    id, number, subtotal_cents, tax_cents, discount_cents, total_cents,
    payment_method, payment_status, gateway_invoice_id, gateway_invoice_url,
    cashier_id, created_at, paid_at
"#;

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Inserts a transaction and its line items atomically.
    ///
    /// ## Atomicity
    /// Header and items go in one database transaction; a failure on any
    /// item rolls back the whole insert. A transaction can never exist
    /// without its items.
    pub async fn create_with_items(
        &self,
        transaction: &Transaction,
        items: &[TransactionItem],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::create_with_items_in(&mut tx, transaction, items).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Inserts a transaction and its items on the caller's transaction.
    ///
    /// Cash checkout uses this to commit the sale, its stock decrements
    /// and the inventory logs as one unit.
    pub async fn create_with_items_in(
        conn: &mut SqliteConnection,
        transaction: &Transaction,
        items: &[TransactionItem],
    ) -> DbResult<()> {
        debug!(id = %transaction.id, number = %transaction.number, items = items.len(), "Inserting transaction");

        insert_header(&mut *conn, transaction).await?;
        for item in items {
            insert_item(&mut *conn, item).await?;
        }

        Ok(())
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM transactions WHERE id = ?1");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(transaction)
    }

    /// Gets a transaction by its human-readable number.
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM transactions WHERE number = ?1");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(transaction)
    }

    /// Finds a transaction by the gateway's invoice id.
    ///
    /// Fallback lookup for webhooks whose external id does not carry the
    /// `pos-` prefix.
    pub async fn find_by_gateway_invoice_id(
        &self,
        invoice_id: &str,
    ) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM transactions WHERE gateway_invoice_id = ?1");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(transaction)
    }

    /// Lists transactions, newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM transactions ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
        );
        let transactions = sqlx::query_as::<_, Transaction>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(transactions)
    }

    /// Counts all transactions (for paging).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Gets all items for a transaction.
    pub async fn get_items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT id, transaction_id, product_id, sku_snapshot, name_snapshot,
                   unit_price_cents, quantity, line_total_cents, created_at
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Stores the gateway invoice identifiers on a transaction.
    pub async fn set_gateway_invoice(
        &self,
        id: &str,
        invoice_id: &str,
        invoice_url: &str,
    ) -> DbResult<()> {
        debug!(id = %id, invoice_id = %invoice_id, "Storing gateway invoice reference");

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET gateway_invoice_id = ?2, gateway_invoice_url = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(invoice_id)
        .bind(invoice_url)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }

        Ok(())
    }

    /// Compare-and-set on `payment_status`.
    ///
    /// Writes `next` only while the stored status is still PENDING:
    ///
    /// ```sql
    /// UPDATE transactions SET payment_status = ?
    /// WHERE id = ? AND payment_status = 'pending'
    /// ```
    ///
    /// Returns `true` when this call performed the transition. Concurrent
    /// triggers racing on the same transition see `false` and must not run
    /// side effects. Runs on the caller's database transaction so the PAID
    /// stock decrements commit atomically with the status write.
    pub async fn try_transition(
        conn: &mut SqliteConnection,
        id: &str,
        next: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET payment_status = ?2, paid_at = COALESCE(?3, paid_at)
            WHERE id = ?1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(next)
        .bind(paid_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

async fn insert_header(conn: &mut SqliteConnection, transaction: &Transaction) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, number, subtotal_cents, tax_cents, discount_cents, total_cents,
            payment_method, payment_status, gateway_invoice_id, gateway_invoice_url,
            cashier_id, created_at, paid_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.number)
    .bind(transaction.subtotal_cents)
    .bind(transaction.tax_cents)
    .bind(transaction.discount_cents)
    .bind(transaction.total_cents)
    .bind(transaction.payment_method)
    .bind(transaction.payment_status)
    .bind(&transaction.gateway_invoice_id)
    .bind(&transaction.gateway_invoice_url)
    .bind(&transaction.cashier_id)
    .bind(transaction.created_at)
    .bind(transaction.paid_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &TransactionItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, product_id, sku_snapshot, name_snapshot,
            unit_price_cents, quantity, line_total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.transaction_id)
    .bind(&item.product_id)
    .bind(&item.sku_snapshot)
    .bind(&item.name_snapshot)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.line_total_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Generates a new transaction item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use kasa_core::{Category, PaymentMethod, Product, Role, User};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let now = Utc::now();
        db.users()
            .insert(&User {
                id: "u1".to_string(),
                name: "Test Cashier".to_string(),
                role: Role::Cashier,
                is_active: true,
                created_at: now,
            })
            .await
            .unwrap();

        db.categories()
            .insert(&Category {
                id: "c1".to_string(),
                name: "Drinks".to_string(),
                description: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        db.products()
            .insert(&Product {
                id: "p1".to_string(),
                sku: "KOPI-250".to_string(),
                name: "Kopi Susu 250ml".to_string(),
                description: None,
                category_id: "c1".to_string(),
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

        db
    }

    fn pending_transaction(id: &str, number: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            number: number.to_string(),
            subtotal_cents: 10000,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 10000,
            payment_method: PaymentMethod::Qris,
            payment_status: PaymentStatus::Pending,
            gateway_invoice_id: None,
            gateway_invoice_url: None,
            cashier_id: "u1".to_string(),
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    fn item_for(transaction_id: &str) -> TransactionItem {
        TransactionItem {
            id: generate_item_id(),
            transaction_id: transaction_id.to_string(),
            product_id: "p1".to_string(),
            sku_snapshot: "KOPI-250".to_string(),
            name_snapshot: "Kopi Susu 250ml".to_string(),
            unit_price_cents: 10000,
            quantity: 1,
            line_total_cents: 10000,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_with_items_round_trip() {
        let db = setup().await;
        let repo = db.transactions();

        let t = pending_transaction("t1", "260805-1");
        repo.create_with_items(&t, &[item_for("t1")]).await.unwrap();

        let stored = repo.get_by_id("t1").await.unwrap().unwrap();
        assert_eq!(stored.number, "260805-1");
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert_eq!(stored.total_cents, 10000);

        let items = repo.get_items("t1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);

        let by_number = repo.get_by_number("260805-1").await.unwrap().unwrap();
        assert_eq!(by_number.id, "t1");
    }

    #[tokio::test]
    async fn test_try_transition_wins_exactly_once() {
        let db = setup().await;
        let repo = db.transactions();

        let t = pending_transaction("t1", "260805-2");
        repo.create_with_items(&t, &[item_for("t1")]).await.unwrap();

        let paid_at = Utc::now();

        let mut tx = db.pool().begin().await.unwrap();
        let won = TransactionRepository::try_transition(&mut tx, "t1", PaymentStatus::Paid, Some(paid_at))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(won);

        // A duplicate trigger on the same transition loses the CAS.
        let mut tx = db.pool().begin().await.unwrap();
        let won_again =
            TransactionRepository::try_transition(&mut tx, "t1", PaymentStatus::Paid, Some(Utc::now()))
                .await
                .unwrap();
        tx.commit().await.unwrap();
        assert!(!won_again);

        let stored = repo.get_by_id("t1").await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert!(stored.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_try_transition_never_leaves_terminal_state() {
        let db = setup().await;
        let repo = db.transactions();

        let t = pending_transaction("t1", "260805-3");
        repo.create_with_items(&t, &[item_for("t1")]).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert!(
            TransactionRepository::try_transition(&mut tx, "t1", PaymentStatus::Expired, None)
                .await
                .unwrap()
        );
        tx.commit().await.unwrap();

        // Late PAID webhook for an expired invoice: CAS refuses.
        let mut tx = db.pool().begin().await.unwrap();
        assert!(
            !TransactionRepository::try_transition(&mut tx, "t1", PaymentStatus::Paid, Some(Utc::now()))
                .await
                .unwrap()
        );
        tx.commit().await.unwrap();

        let stored = repo.get_by_id("t1").await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Expired);
    }

    #[tokio::test]
    async fn test_set_gateway_invoice_and_lookup() {
        let db = setup().await;
        let repo = db.transactions();

        let t = pending_transaction("t1", "260805-4");
        repo.create_with_items(&t, &[item_for("t1")]).await.unwrap();

        repo.set_gateway_invoice("t1", "inv-123", "https://pay.example/inv-123")
            .await
            .unwrap();

        let found = repo
            .find_by_gateway_invoice_id("inv-123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "t1");
        assert_eq!(
            found.gateway_invoice_url.as_deref(),
            Some("https://pay.example/inv-123")
        );
    }
}
