//! # Sale Transaction Orchestrator
//!
//! Turns a cart into one sale, its lines, the stock decrements and the
//! matching ledger entries, all inside a single SQLite transaction.
//!
//! ## Checkout Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(ctx, cart, payment_method)                                │
//! │                                                                         │
//! │  1. ctx.require_actor()            ─► Authentication                   │
//! │  2. cart.validate() → total        ─► EmptyCart / Validation / ...     │
//! │  ─────────────────────── BEGIN ─────────────────────────────────────   │
//! │  3. INSERT sales                   ─► SaleCreationFailed               │
//! │     (first statement: takes the write lock up front)                   │
//! │  4. SELECT active products         ─► ProductNotFound                  │
//! │     INSERT sale_lines (one multi-row statement, names snapshotted)     │
//! │  5. for each line, in cart order:                                      │
//! │       UPDATE products ... WHERE stock_quantity + delta >= 0            │
//! │                                    ─► InsufficientStock                │
//! │       INSERT ledger_entries (sale, -qty, "Sale <id>")                  │
//! │  ─────────────────────── COMMIT ────────────────────────────────────   │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is applied.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is retried. A caller that sees `InsufficientStock` should re-read
//! the product and rebuild the cart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::ledger::insert_entry;
use crate::repository::product::{apply_stock_delta, fetch_active_products};
use tally_core::cart::Cart;
use tally_core::{
    Actor, CoreError, Money, NewLedgerEntry, PaymentMethod, Product, RequestContext, Sale,
    SaleDetail, SaleLine,
};

/// Executes checkouts.
#[derive(Debug, Clone)]
pub struct SaleOrchestrator {
    pool: SqlitePool,
}

impl SaleOrchestrator {
    pub fn new(pool: SqlitePool) -> Self {
        SaleOrchestrator { pool }
    }

    /// Records a sale for `cart`, paid with `payment_method`.
    ///
    /// ## Returns
    /// * `Ok(SaleDetail)` - The committed sale with its lines
    /// * `Err(DbError::Domain(..))` - Authentication, cart rule, missing product
    ///   or insufficient stock; nothing was written
    /// * `Err(DbError::SaleCreationFailed)` - The sale header insert failed
    pub async fn create_sale(
        &self,
        ctx: &RequestContext,
        cart: &Cart,
        payment_method: PaymentMethod,
    ) -> DbResult<SaleDetail> {
        let actor = ctx.require_actor()?;
        let total = cart.validate()?;

        debug!(
            user_id = %actor.user_id,
            lines = cart.len(),
            total = %total,
            payment_method = ?payment_method,
            "Starting checkout"
        );

        match self.execute(actor, cart, total, payment_method).await {
            Ok(detail) => {
                info!(
                    sale_id = %detail.sale.id,
                    total = %total,
                    lines = detail.lines.len(),
                    "Sale completed"
                );
                Ok(detail)
            }
            Err(e) if e.is_client_error() => {
                warn!(user_id = %actor.user_id, error = %e, "Checkout rejected");
                Err(e)
            }
            Err(e) => {
                error!(user_id = %actor.user_id, error = %e, "Checkout failed");
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        actor: &Actor,
        cart: &Cart,
        total: Money,
        payment_method: PaymentMethod,
    ) -> DbResult<SaleDetail> {
        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            cashier_id: actor.user_id.clone(),
            total_cents: total.cents(),
            payment_method,
            created_at: now,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        // Step 3: sale header
        sqlx::query(
            r#"
            INSERT INTO sales (id, cashier_id, total_cents, payment_method, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.cashier_id)
        .bind(sale.total_cents)
        .bind(sale.payment_method)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::SaleCreationFailed(e.to_string()))?;

        // Step 4: lines with snapshotted names
        let mut ids: Vec<&str> = cart.lines().iter().map(|l| l.product_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();

        let products: HashMap<String, Product> = fetch_active_products(&mut tx, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let lines = build_lines(&sale.id, cart, &products, now)?;
        insert_lines(&mut tx, &lines).await?;

        // Step 5: guarded decrement + ledger entry per line
        for line in &lines {
            let remaining = apply_stock_delta(&mut tx, &line.product_id, -line.quantity, now).await?;
            insert_entry(
                &mut tx,
                &actor.user_id,
                &NewLedgerEntry::sale(&line.product_id, line.quantity, &sale.id),
                now,
            )
            .await?;

            debug!(product_id = %line.product_id, sold = line.quantity, remaining, "Stock decremented");
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(SaleDetail {
            sale,
            cashier_name: actor.display_name.clone(),
            lines,
        })
    }
}

/// Builds sale lines in cart order, recomputing each line total.
fn build_lines(
    sale_id: &str,
    cart: &Cart,
    products: &HashMap<String, Product>,
    now: DateTime<Utc>,
) -> DbResult<Vec<SaleLine>> {
    cart.lines()
        .iter()
        .map(|line| {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            Ok(SaleLine {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.to_string(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                line_total_cents: line.line_total().cents(),
                created_at: now,
            })
        })
        .collect()
}

async fn insert_lines(conn: &mut sqlx::SqliteConnection, lines: &[SaleLine]) -> DbResult<()> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "INSERT INTO sale_lines (id, sale_id, product_id, product_name, quantity, \
         unit_price_cents, line_total_cents, created_at) ",
    );

    qb.push_values(lines, |mut b, line| {
        b.push_bind(&line.id)
            .push_bind(&line.sale_id)
            .push_bind(&line.product_id)
            .push_bind(&line.product_name)
            .push_bind(line.quantity)
            .push_bind(line.unit_price_cents)
            .push_bind(line.line_total_cents)
            .push_bind(line.created_at);
    });

    qb.build().execute(&mut *conn).await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cashier_context, file_db, product_input, test_db};
    use tally_core::cart::CartLine;
    use tally_core::{LedgerEntryKind, ProductFilter};

    async fn table_count(db: &crate::Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sale_total_equals_sum_of_exact_line_totals() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let a = db.products().create(&ctx, &product_input("Tee", 1999).with_stock(10)).await.unwrap();
        let b = db.products().create(&ctx, &product_input("Sock", 333).with_stock(10)).await.unwrap();

        let cart = Cart::new(vec![
            CartLine::new(&a.id, 3, Money::from_cents(1999)),
            CartLine::new(&b.id, 7, Money::from_cents(333)),
        ]);
        let detail = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await.unwrap();

        assert_eq!(detail.lines.len(), 2);
        for line in &detail.lines {
            assert_eq!(line.line_total_cents, line.unit_price_cents * line.quantity);
        }
        let sum: i64 = detail.lines.iter().map(|l| l.line_total_cents).sum();
        assert_eq!(detail.sale.total_cents, sum);
        assert_eq!(sum, 3 * 1999 + 7 * 333);

        let stored = db.sales().get_with_lines(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.sale, detail.sale);
        assert_eq!(stored.lines, detail.lines);
    }

    #[tokio::test]
    async fn test_sale_decrements_stock_and_writes_one_ledger_entry() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(8)).await.unwrap();

        let cart = Cart::new(vec![CartLine::new(&tee.id, 3, Money::from_cents(1000))]);
        let detail = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Transfer).await.unwrap();

        let after = db.products().get_by_id(&tee.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 5);
        assert!(after.version > tee.version);

        let entries = db.ledger().entries_for_sale(&detail.sale.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LedgerEntryKind::Sale);
        assert_eq!(entries[0].quantity_delta, -3);
        assert_eq!(entries[0].note, format!("Sale {}", detail.sale.id));
        assert_eq!(Some(entries[0].user_id.as_str()), ctx.user_id());

        assert!(db.ledger().reconcile(&tee.id).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_soft_delete_leaves_sale_history_intact() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Vintage Tee", 1500).with_stock(2)).await.unwrap();

        let cart = Cart::new(vec![CartLine::new(&tee.id, 1, Money::from_cents(1500))]);
        let detail = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await.unwrap();

        db.products().soft_delete(&tee.id).await.unwrap();

        let stored = db.sales().get_with_lines(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.sale.total_cents, 1500);
        assert_eq!(stored.lines[0].product_name, "Vintage Tee");
        assert_eq!(stored.lines, detail.lines);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let a = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(5)).await.unwrap();
        let b = db.products().create(&ctx, &product_input("Cap", 800).with_stock(1)).await.unwrap();

        // First line would succeed on its own; second fails.
        let cart = Cart::new(vec![
            CartLine::new(&a.id, 2, Money::from_cents(1000)),
            CartLine::new(&b.id, 2, Money::from_cents(800)),
        ]);
        let err = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await.unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock { product, available, requested }) => {
                assert_eq!(product, "Cap");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(table_count(&db, "sales").await, 0);
        assert_eq!(table_count(&db, "sale_lines").await, 0);
        assert_eq!(db.products().get_by_id(&a.id).await.unwrap().unwrap().stock_quantity, 5);
        // Only the two "Initial stock" entries remain.
        assert_eq!(table_count(&db, "ledger_entries").await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let (_dir, db) = file_db(8).await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(10)).await.unwrap();

        // 1+2+3+1+2+3+1+2 = 15 units asked for against 10 on hand
        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            let ctx = ctx.clone();
            let product_id = tee.id.clone();
            let quantity = 1 + i % 3;
            handles.push(tokio::spawn(async move {
                let cart = Cart::new(vec![CartLine::new(product_id, quantity, Money::from_cents(1000))]);
                let result = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await;
                (quantity, result)
            }));
        }

        let mut sold = 0;
        let mut completed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                (quantity, Ok(detail)) => {
                    assert_eq!(detail.sale.total_cents, quantity * 1000);
                    sold += quantity;
                    completed += 1;
                }
                (_, Err(DbError::Domain(CoreError::InsufficientStock { .. }))) => rejected += 1,
                (_, Err(other)) => panic!("unexpected error: {other:?}"),
            }
        }

        assert!(rejected > 0);
        assert!(sold <= 10);

        let stock = db.products().get_by_id(&tee.id).await.unwrap().unwrap().stock_quantity;
        assert!(stock >= 0);
        assert_eq!(stock, 10 - sold);
        assert_eq!(table_count(&db, "sales").await, completed);
        assert!(db.ledger().reconcile(&tee.id).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_inactive_or_missing_product_is_not_found() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(5)).await.unwrap();
        db.products().soft_delete(&tee.id).await.unwrap();

        let cart = Cart::new(vec![CartLine::new(&tee.id, 1, Money::from_cents(1000))]);
        let err = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        let cart = Cart::new(vec![CartLine::new("missing", 1, Money::from_cents(1000))]);
        let err = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        assert_eq!(table_count(&db, "sales").await, 0);
    }

    #[tokio::test]
    async fn test_anonymous_and_empty_checkouts_are_rejected() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;

        let err = db
            .checkout()
            .create_sale(&RequestContext::anonymous(), &Cart::default(), PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Authentication(_))));

        let err = db
            .checkout()
            .create_sale(&ctx, &Cart::default(), PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_unknown_cashier_fails_sale_creation() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(5)).await.unwrap();

        let ghost = RequestContext::for_actor(Actor::new("ghost", "Ghost", tally_core::UserRole::Cashier));
        let cart = Cart::new(vec![CartLine::new(&tee.id, 1, Money::from_cents(1000))]);
        let err = db.checkout().create_sale(&ghost, &cart, PaymentMethod::Cash).await.unwrap_err();

        assert!(matches!(err, DbError::SaleCreationFailed(_)));
        let active = db.products().list(&ProductFilter::default()).await.unwrap();
        assert_eq!(active[0].stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_same_product_on_two_lines() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(4)).await.unwrap();

        let cart = Cart::new(vec![
            CartLine::new(&tee.id, 2, Money::from_cents(1000)),
            CartLine::new(&tee.id, 2, Money::from_cents(900)),
        ]);
        let detail = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await.unwrap();

        assert_eq!(detail.sale.total_cents, 3800);
        assert_eq!(db.products().get_by_id(&tee.id).await.unwrap().unwrap().stock_quantity, 0);
        assert_eq!(db.ledger().entries_for_sale(&detail.sale.id).await.unwrap().len(), 2);
    }
}
