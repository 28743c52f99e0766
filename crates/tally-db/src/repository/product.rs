//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Filtered listing (category, name/barcode substring, active flag)
//! - Create (with the "Initial stock" ledger entry), partial update, soft delete
//! - Guarded stock mutation shared with checkout and the stock service
//!
//! ## Guarded Stock Mutation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ Read-then-write (lost updates under concurrent checkouts)          │
//! │     SELECT stock → 5 ; UPDATE products SET stock_quantity = 5 - 3      │
//! │                                                                         │
//! │  ✅ One conditional statement                                          │
//! │     UPDATE products                                                    │
//! │        SET stock_quantity = stock_quantity + ?delta                    │
//! │      WHERE id = ? AND is_active = 1                                    │
//! │        AND stock_quantity + ?delta >= 0                                │
//! │     RETURNING stock_quantity                                           │
//! │                                                                         │
//! │  No row back → product missing/inactive, or not enough stock           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger::LedgerRepository;
use tally_core::validation::{validate_new_product, validate_search_query};
use tally_core::{
    CoreError, NewLedgerEntry, NewProduct, Product, ProductFilter, ProductPatch,
    RequestContext, INITIAL_STOCK_NOTE,
};

/// Column list shared by every product SELECT.
pub(crate) const PRODUCT_COLUMNS: &str = "id, name, category, size, barcode, price_cents, \
     cost_cents, stock_quantity, is_active, on_sale, sale_price_cents, created_at, \
     updated_at, version";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let tops = repo.list(&ProductFilter::default().category(ProductCategory::Tops)).await?;
/// let scanned = repo.get_by_barcode("4006381333931").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products matching `filter`, ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let search = match filter.search.as_deref() {
            Some(term) => validate_search_query(term)?,
            None => String::new(),
        };

        debug!(
            category = ?filter.category,
            search = %search,
            active_only = filter.active_only,
            "Listing products"
        );

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"));

        if filter.active_only {
            qb.push(" AND is_active = 1");
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category);
        }
        if !search.is_empty() {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            qb.push(" AND (LOWER(name) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR LOWER(COALESCE(barcode, '')) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        qb.push(" ORDER BY name COLLATE NOCASE, id");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID (active or not).
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets an active product by barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1 AND is_active = 1"
        ))
        .bind(barcode.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Creates a product.
    ///
    /// When the initial stock is positive, a "restock" ledger entry noted
    /// "Initial stock" is appended as a separate write. A failure of that
    /// append is logged and does not undo the product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Created product
    /// * `Err(DbError::UniqueViolation)` - Barcode already used by an active product
    pub async fn create(&self, ctx: &RequestContext, data: &NewProduct) -> DbResult<Product> {
        let data = validate_new_product(data)?;
        let now = Utc::now();

        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: data.name,
            category: data.category,
            size: data.size,
            barcode: data.barcode,
            price_cents: data.price_cents,
            cost_cents: data.cost_cents,
            stock_quantity: data.stock_quantity,
            is_active: true,
            on_sale: data.on_sale,
            sale_price_cents: data.sale_price_cents,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        debug!(name = %product.name, barcode = ?product.barcode, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, size, barcode,
                price_cents, cost_cents, stock_quantity,
                is_active, on_sale, sale_price_cents,
                created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.category)
        .bind(&product.size)
        .bind(&product.barcode)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(product.on_sale)
        .bind(product.sale_price_cents)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.version)
        .execute(&self.pool)
        .await
        .map_err(|e| barcode_conflict(e.into(), product.barcode.as_deref()))?;

        info!(id = %product.id, name = %product.name, stock = product.stock_quantity, "Product created");

        if product.stock_quantity > 0 {
            let entry = NewLedgerEntry::restock(&product.id, product.stock_quantity, INITIAL_STOCK_NOTE);
            if let Err(e) = LedgerRepository::new(self.pool.clone()).append(ctx, entry).await {
                warn!(
                    product_id = %product.id,
                    error = %e,
                    "Initial stock ledger entry failed; product kept"
                );
            }
        }

        Ok(product)
    }

    /// Applies a partial update.
    ///
    /// Direct `stock_quantity` edits bypass the ledger (they show up as drift
    /// in reconciliation). With `expected_version` set the update is refused
    /// when the stored version differs.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The updated product
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(DbError::VersionConflict)` - Stale `expected_version`
    pub async fn update(&self, id: &str, patch: &ProductPatch) -> DbResult<Product> {
        debug!(id = %id, expected_version = ?patch.expected_version, "Updating product");

        if patch.is_empty() {
            let product = self
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", id))?;
            check_version(&product, patch.expected_version)?;
            return Ok(product);
        }

        let mut tx = self.pool.begin().await?;

        // Claim the row before reading it: a deferred transaction that reads
        // first cannot upgrade to a writer once a checkout has committed.
        let claimed = sqlx::query(
            r#"
            UPDATE products SET version = version + 1
            WHERE id = ?1 AND (?2 IS NULL OR version = ?2)
            "#,
        )
        .bind(id)
        .bind(patch.expected_version)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let current = fetch_product(&mut tx, id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", id))?;
            check_version(&current, patch.expected_version)?;
            return Err(DbError::Internal(format!("Product {id} could not be claimed")));
        }

        let mut product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        patch.apply_to(&mut product);
        product.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                size = ?4,
                barcode = ?5,
                price_cents = ?6,
                cost_cents = ?7,
                stock_quantity = ?8,
                on_sale = ?9,
                sale_price_cents = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.category)
        .bind(&product.size)
        .bind(&product.barcode)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock_quantity)
        .bind(product.on_sale)
        .bind(product.sale_price_cents)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| barcode_conflict(e.into(), product.barcode.as_deref()))?;

        tx.commit().await?;

        info!(id = %id, version = product.version, "Product updated");
        Ok(product)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Sales, sale lines and ledger entries that reference the product are
    /// left untouched.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2, version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Active products with `0 < stock_quantity <= threshold`, lowest stock first.
    pub async fn list_low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE is_active = 1 AND stock_quantity > 0 AND stock_quantity <= ?1
            ORDER BY stock_quantity, name COLLATE NOCASE
            "#
        ))
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (shared with checkout and the stock service)
// =============================================================================

fn check_version(product: &Product, expected: Option<i64>) -> DbResult<()> {
    match expected {
        Some(expected) if expected != product.version => Err(DbError::VersionConflict {
            entity: "Product".to_string(),
            id: product.id.clone(),
            expected,
            actual: product.version,
        }),
        _ => Ok(()),
    }
}

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Loads the active products among `ids`. Missing or inactive ids are simply absent.
pub(crate) async fn fetch_active_products(
    conn: &mut SqliteConnection,
    ids: &[&str],
) -> DbResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 AND id IN ("
    ));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let products = qb.build_query_as::<Product>().fetch_all(&mut *conn).await?;
    Ok(products)
}

/// Adds `delta` to an active product's stock unless that would go below zero.
///
/// Returns the new stock level. Fails with `ProductNotFound` for a missing or
/// inactive product and `InsufficientStock` when the floor guard rejects it.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let new_stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?1,
            updated_at = ?2,
            version = version + 1
        WHERE id = ?3 AND is_active = 1 AND stock_quantity + ?1 >= 0
        RETURNING stock_quantity
        "#,
    )
    .bind(delta)
    .bind(now)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = new_stock {
        return Ok(stock);
    }

    match fetch_product(conn, product_id).await? {
        Some(product) if product.is_active => Err(CoreError::InsufficientStock {
            product: product.name,
            available: product.stock_quantity,
            requested: -delta,
        }
        .into()),
        _ => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
    }
}

/// Rewrites the partial-index violation into a field-level duplicate error.
fn barcode_conflict(err: DbError, barcode: Option<&str>) -> DbError {
    match (err, barcode) {
        (DbError::UniqueViolation { field, .. }, Some(code)) if field.contains("barcode") => {
            DbError::duplicate("barcode", code)
        }
        (err, _) => err,
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cashier_context, file_db, product_input, test_db};
    use tally_core::cart::{Cart, CartLine};
    use tally_core::{LedgerEntryKind, Money, PaymentMethod, ProductCategory, RequestContext};

    #[tokio::test]
    async fn test_create_with_initial_stock_writes_one_restock_entry() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;

        let product = db
            .products()
            .create(&ctx, &product_input("Linen Shirt", 2500).with_stock(10))
            .await
            .unwrap();

        let history = db.ledger().history(&product.id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, LedgerEntryKind::Restock);
        assert_eq!(history[0].quantity_delta, 10);
        assert_eq!(history[0].note, INITIAL_STOCK_NOTE);
    }

    #[tokio::test]
    async fn test_create_survives_failed_initial_ledger_entry() {
        let db = test_db().await;

        // No actor: the ledger append is refused.
        let product = db
            .products()
            .create(&RequestContext::anonymous(), &product_input("Wool Scarf", 1800).with_stock(10))
            .await
            .unwrap();

        assert!(db.ledger().history(&product.id, None).await.unwrap().is_empty());

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 10);
        assert!(stored.is_active);
    }

    #[tokio::test]
    async fn test_create_without_stock_writes_no_entry() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;

        let product = db.products().create(&ctx, &product_input("Belt", 900)).await.unwrap();

        assert_eq!(product.stock_quantity, 0);
        assert!(db.ledger().history(&product.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;

        let err = db.products().create(&ctx, &product_input("  ", 900)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_by_name() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let repo = db.products();

        repo.create(&ctx, &product_input("zebra tee", 1000)).await.unwrap();
        repo.create(&ctx, &product_input("Alpine Tee", 1000)).await.unwrap();
        let boots = repo
            .create(
                &ctx,
                &NewProduct::new("Chelsea Boot", ProductCategory::Footwear, Money::from_cents(9900))
                    .with_barcode("BOOT-42"),
            )
            .await
            .unwrap();

        let all = repo.list(&ProductFilter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpine Tee", "Chelsea Boot", "zebra tee"]);

        let tees = repo.list(&ProductFilter::default().search("TEE")).await.unwrap();
        assert_eq!(tees.len(), 2);

        let by_barcode = repo.list(&ProductFilter::default().search("boot-4")).await.unwrap();
        assert_eq!(by_barcode.len(), 1);

        let footwear = repo
            .list(&ProductFilter::default().category(ProductCategory::Footwear))
            .await
            .unwrap();
        assert_eq!(footwear.len(), 1);

        repo.soft_delete(&boots.id).await.unwrap();
        assert_eq!(repo.list(&ProductFilter::default()).await.unwrap().len(), 2);
        assert_eq!(
            repo.list(&ProductFilter::default().include_inactive()).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;

        db.products().create(&ctx, &product_input("Shirt", 1000)).await.unwrap();

        let hits = db.products().list(&ProductFilter::default().search("%")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_barcode_unique_among_active_only() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let repo = db.products();

        let first = repo
            .create(&ctx, &product_input("Tee v1", 1000).with_barcode("590001"))
            .await
            .unwrap();

        let dup = repo
            .create(&ctx, &product_input("Tee v2", 1000).with_barcode("590001"))
            .await
            .unwrap_err();
        assert!(matches!(dup, DbError::UniqueViolation { ref field, .. } if field == "barcode"));

        repo.soft_delete(&first.id).await.unwrap();
        let second = repo
            .create(&ctx, &product_input("Tee v2", 1000).with_barcode("590001"))
            .await
            .unwrap();

        let scanned = repo.get_by_barcode("590001").await.unwrap().unwrap();
        assert_eq!(scanned.id, second.id);
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_applies_patch() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let product = db.products().create(&ctx, &product_input("Tee", 1000)).await.unwrap();

        let patch = ProductPatch {
            price_cents: Some(1200),
            size: Some(Some("L".to_string())),
            expected_version: Some(0),
            ..Default::default()
        };
        let updated = db.products().update(&product.id, &patch).await.unwrap();

        assert_eq!(updated.price_cents, 1200);
        assert_eq!(updated.size.as_deref(), Some("L"));
        assert_eq!(updated.version, 1);

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_with_stale_version_changes_nothing() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let product = db.products().create(&ctx, &product_input("Tee", 1000)).await.unwrap();

        db.products()
            .update(&product.id, &ProductPatch { name: Some("Tee Basic".into()), ..Default::default() })
            .await
            .unwrap();

        let stale = ProductPatch {
            price_cents: Some(1),
            expected_version: Some(0),
            ..Default::default()
        };
        let err = db.products().update(&product.id, &stale).await.unwrap_err();
        assert!(matches!(err, DbError::VersionConflict { expected: 0, actual: 1, .. }));

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.price_cents, 1000);
        assert_eq!(stored.name, "Tee Basic");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_price_edits_succeed_during_checkouts() {
        let (_dir, db) = file_db(8).await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(100)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..40_i64 {
            let db = db.clone();
            let ctx = ctx.clone();
            let product_id = tee.id.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let cart = Cart::new(vec![CartLine::new(product_id, 1, Money::from_cents(1000))]);
                    db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await.map(|_| ())
                } else {
                    let patch = ProductPatch { price_cents: Some(1000 + i), ..Default::default() };
                    db.products().update(&product_id, &patch).await.map(|_| ())
                }
            }));
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "operation failed: {result:?}");
        }

        let stored = db.products().get_by_id(&tee.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 80);
        assert!(db.ledger().reconcile(&tee.id).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = test_db().await;
        let patch = ProductPatch { price_cents: Some(1), ..Default::default() };
        let err = db.products().update("missing", &patch).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_low_stock_and_count() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let repo = db.products();

        repo.create(&ctx, &product_input("Empty", 1000)).await.unwrap();
        repo.create(&ctx, &product_input("Few", 1000).with_stock(3)).await.unwrap();
        repo.create(&ctx, &product_input("Many", 1000).with_stock(40)).await.unwrap();

        let low = repo.list_low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Few");
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_apply_stock_delta_floor_guard() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let product = db
            .products()
            .create(&ctx, &product_input("Tee", 1000).with_stock(2))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let now = Utc::now();

        assert_eq!(apply_stock_delta(&mut conn, &product.id, -2, now).await.unwrap(), 0);

        let err = apply_stock_delta(&mut conn, &product.id, -1, now).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 0, requested: 1, .. })
        ));

        let err = apply_stock_delta(&mut conn, "nope", 1, now).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }
}
