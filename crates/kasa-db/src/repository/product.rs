//! # Product Repository
//!
//! Database operations for products, including the atomic stock updates.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (races, can over-sell)                      │
//! │     let p = get_by_id(id);                                             │
//! │     update_stock(id, p.stock - qty);                                   │
//! │                                                                         │
//! │  ✅ CORRECT: conditional decrement with floor check                    │
//! │     UPDATE products SET stock = stock - ?                              │
//! │     WHERE id = ? AND stock >= ?                                        │
//! │                                                                         │
//! │  Zero rows affected while the product exists = insufficient stock.     │
//! │  The inventory-log append runs on the SAME database transaction, so   │
//! │  "stock changed" and "log written" commit or roll back together.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kasa_core::{InventoryLogType, Product};

/// Outcome of an atomic stock mutation.
///
/// Carries enough context for the caller to decide on low-stock
/// notifications after the enclosing transaction commits.
#[derive(Debug, Clone)]
pub struct StockChange {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub min_stock: i64,
}

impl StockChange {
    /// Whether the new stock level is at or below the product's threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.new_stock <= self.min_stock
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, category_id,
                   price_cents, cost_cents, stock, min_stock,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, category_id,
                   price_cents, cost_cents, stock, min_stock,
                   is_active, created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, category_id,
                   price_cents, cost_cents, stock, min_stock,
                   is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists active products at or below their low-stock threshold.
    ///
    /// Uses the per-product `min_stock` column, never a global constant.
    pub async fn list_low_stock(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, description, category_id,
                   price_cents, cost_cents, stock, min_stock,
                   is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1 AND stock <= min_stock
            ORDER BY stock - min_stock
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, category_id,
                price_cents, cost_cents, stock, min_stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a product's catalog fields.
    ///
    /// Deliberately does NOT touch `stock`: stock only moves through
    /// [`Self::decrement_for_sale`] and [`Self::set_stock`], which pair the
    /// change with an inventory-log entry.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                description = ?4,
                category_id = ?5,
                price_cents = ?6,
                cost_cents = ?7,
                min_stock = ?8,
                is_active = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// - Historical transactions still reference this product
    /// - Can be restored if deleted by mistake
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Atomically decrements stock for a sale and appends the SALE log.
    ///
    /// This is ONE operation, not three: the floor-checked decrement and the
    /// inventory-log append run on the caller's database transaction and
    /// commit or roll back together.
    ///
    /// ## Arguments
    /// * `conn` - connection of the enclosing `sqlx` transaction
    /// * `quantity` - units sold, must be positive
    /// * `actor_id` - cashier responsible for the sale
    /// * `reason` - free text recorded on the log row (e.g. the
    ///   transaction number)
    ///
    /// ## Errors
    /// * `DbError::NotFound` - product missing or inactive
    /// * `DbError::StockConflict` - fewer than `quantity` units available;
    ///   the caller must roll back the enclosing transaction
    pub async fn decrement_for_sale(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        actor_id: &str,
        reason: Option<&str>,
    ) -> DbResult<StockChange> {
        debug!(product_id = %product_id, quantity = %quantity, "Decrementing stock for sale");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1 AND stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish "gone" from "not enough units"
            let existing = sqlx::query_as::<_, (String, i64, bool)>(
                "SELECT sku, stock, is_active FROM products WHERE id = ?1",
            )
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

            return match existing {
                Some((sku, available, true)) => Err(DbError::StockConflict {
                    sku,
                    available,
                    requested: quantity,
                }),
                _ => Err(DbError::not_found("Product", product_id)),
            };
        }

        let (sku, name, new_stock, min_stock) = sqlx::query_as::<_, (String, String, i64, i64)>(
            "SELECT sku, name, stock, min_stock FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;

        let change = StockChange {
            product_id: product_id.to_string(),
            sku,
            name,
            previous_stock: new_stock + quantity,
            new_stock,
            min_stock,
        };

        append_log(
            conn,
            &change,
            InventoryLogType::Sale,
            -quantity,
            reason,
            actor_id,
            now,
        )
        .await?;

        Ok(change)
    }

    /// Atomically sets stock to an absolute level and appends the log.
    ///
    /// Used by inventory adjustments. The log type is RESTOCK when the
    /// delta is positive, ADJUSTMENT otherwise. Same single-operation
    /// contract as [`Self::decrement_for_sale`].
    ///
    /// ## Errors
    /// * `DbError::NotFound` - product missing
    pub async fn set_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        new_stock: i64,
        actor_id: &str,
        reason: Option<&str>,
    ) -> DbResult<StockChange> {
        debug!(product_id = %product_id, new_stock = %new_stock, "Setting stock level");

        let now = Utc::now();

        let current = sqlx::query_as::<_, (String, String, i64, i64)>(
            "SELECT sku, name, stock, min_stock FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some((sku, name, previous_stock, min_stock)) = current else {
            return Err(DbError::not_found("Product", product_id));
        };

        // The enclosing transaction holds SQLite's write lock, so the
        // read above cannot be stale by the time this executes.
        sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(product_id)
            .bind(new_stock)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        let delta = new_stock - previous_stock;
        let log_type = if delta > 0 {
            InventoryLogType::Restock
        } else {
            InventoryLogType::Adjustment
        };

        let change = StockChange {
            product_id: product_id.to_string(),
            sku,
            name,
            previous_stock,
            new_stock,
            min_stock,
        };

        append_log(conn, &change, log_type, delta, reason, actor_id, now).await?;

        Ok(change)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Appends an inventory-log row on the caller's transaction.
async fn append_log(
    conn: &mut SqliteConnection,
    change: &StockChange,
    log_type: InventoryLogType,
    quantity_delta: i64,
    reason: Option<&str>,
    actor_id: &str,
    now: chrono::DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_logs (
            id, product_id, log_type, quantity_delta,
            previous_stock, new_stock, reason, actor_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&change.product_id)
    .bind(log_type)
    .bind(quantity_delta)
    .bind(change.previous_stock)
    .bind(change.new_stock)
    .bind(reason)
    .bind(actor_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use kasa_core::{Category, Role, User};

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

    #[tokio::test]
    async fn test_decrement_for_sale_pairs_stock_and_log() {
        let db = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let change = ProductRepository::decrement_for_sale(&mut tx, "p1", 4, "u1", Some("TX-1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change.previous_stock, 10);
        assert_eq!(change.new_stock, 6);
        assert!(!change.is_low_stock());

        let product = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(product.stock, 6);

        let log = db
            .inventory_logs()
            .latest_for_product("p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.log_type, InventoryLogType::Sale);
        assert_eq!(log.quantity_delta, -4);
        assert_eq!(log.previous_stock, 10);
        assert_eq!(log.new_stock, 6);
        assert_eq!(log.reason.as_deref(), Some("TX-1"));
    }

    #[tokio::test]
    async fn test_decrement_floor_check_rejects_oversell() {
        let db = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = ProductRepository::decrement_for_sale(&mut tx, "p1", 11, "u1", None)
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();

        match err {
            DbError::StockConflict {
                sku,
                available,
                requested,
            } => {
                assert_eq!(sku, "KOPI-250");
                assert_eq!(available, 10);
                assert_eq!(requested, 11);
            }
            other => panic!("expected StockConflict, got {other:?}"),
        }

        // Nothing moved, nothing logged
        let product = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        assert_eq!(db.inventory_logs().count_for_product("p1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_decrement_unknown_product_is_not_found() {
        let db = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = ProductRepository::decrement_for_sale(&mut tx, "missing", 1, "u1", None)
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_stock_round_trip() {
        let db = setup().await;

        // Restock to 25
        let mut tx = db.pool().begin().await.unwrap();
        let change = ProductRepository::set_stock(&mut tx, "p1", 25, "u1", Some("delivery"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change.previous_stock, 10);
        assert_eq!(change.new_stock, 25);

        let log = db
            .inventory_logs()
            .latest_for_product("p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.log_type, InventoryLogType::Restock);
        assert_eq!(log.quantity_delta, 15);

        // Adjust down to 5
        let mut tx = db.pool().begin().await.unwrap();
        ProductRepository::set_stock(&mut tx, "p1", 5, "u1", Some("shrinkage"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let product = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(product.stock, 5);

        let log = db
            .inventory_logs()
            .latest_for_product("p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.log_type, InventoryLogType::Adjustment);
        assert_eq!(log.quantity_delta, -20);
        assert_eq!(log.previous_stock, 25);
        assert_eq!(log.new_stock, 5);
    }

    #[tokio::test]
    async fn test_list_low_stock_uses_per_product_threshold() {
        let db = setup().await;

        // p1 has stock 10, min_stock 2: not low. Drop it to the threshold.
        let mut tx = db.pool().begin().await.unwrap();
        ProductRepository::set_stock(&mut tx, "p1", 2, "u1", None)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let low = db.products().list_low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, "p1");
    }
}
