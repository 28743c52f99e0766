//! # Stock Service
//!
//! Operator-initiated stock movements: receiving goods (restock) and manual
//! corrections (adjustment). Each movement updates the product counter and
//! appends its ledger entry in one transaction, so the ledger and the counter
//! cannot disagree through this path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::insert_entry;
use crate::repository::product::{apply_stock_delta, fetch_product};
use tally_core::validation::{validate_ledger_delta, validate_note};
use tally_core::{LedgerEntry, NewLedgerEntry, Product, RequestContext, ValidationError};

/// Product state after a movement, with the entry that recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub product: Product,
    pub entry: LedgerEntry,
}

#[derive(Debug, Clone)]
pub struct StockService {
    pool: SqlitePool,
}

impl StockService {
    pub fn new(pool: SqlitePool) -> Self {
        StockService { pool }
    }

    /// Receives `quantity` units of a product.
    pub async fn restock(
        &self,
        ctx: &RequestContext,
        product_id: &str,
        quantity: i64,
        note: &str,
    ) -> DbResult<StockMovement> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        self.apply(ctx, NewLedgerEntry::restock(product_id, quantity, note))
            .await
    }

    /// Corrects stock by a signed `delta` (damage, shrinkage, count correction).
    ///
    /// A delta that would take stock below zero fails with `InsufficientStock`.
    pub async fn adjust(
        &self,
        ctx: &RequestContext,
        product_id: &str,
        delta: i64,
        note: &str,
    ) -> DbResult<StockMovement> {
        validate_ledger_delta(delta)?;
        self.apply(ctx, NewLedgerEntry::adjustment(product_id, delta, note))
            .await
    }

    async fn apply(&self, ctx: &RequestContext, entry: NewLedgerEntry) -> DbResult<StockMovement> {
        let actor = ctx.require_actor()?;
        validate_note(&entry.note)?;

        debug!(
            product_id = %entry.product_id,
            kind = ?entry.kind,
            delta = entry.quantity_delta,
            user_id = %actor.user_id,
            "Applying stock movement"
        );

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        apply_stock_delta(&mut tx, &entry.product_id, entry.quantity_delta, now).await?;
        let stored = insert_entry(&mut tx, &actor.user_id, &entry, now).await?;
        let product = fetch_product(&mut tx, &entry.product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &entry.product_id))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            product_id = %product.id,
            kind = ?stored.kind,
            delta = stored.quantity_delta,
            stock = product.stock_quantity,
            "Stock movement recorded"
        );

        Ok(StockMovement {
            product,
            entry: stored,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cashier_context, product_input, test_db};
    use tally_core::cart::{Cart, CartLine};
    use tally_core::{CoreError, LedgerEntryKind, Money, PaymentMethod};

    #[tokio::test]
    async fn test_restock_updates_counter_and_ledger() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(2)).await.unwrap();

        let movement = db.stock().restock(&ctx, &tee.id, 10, "Supplier delivery").await.unwrap();

        assert_eq!(movement.product.stock_quantity, 12);
        assert_eq!(movement.entry.kind, LedgerEntryKind::Restock);
        assert_eq!(movement.entry.quantity_delta, 10);
        assert_eq!(movement.entry.note, "Supplier delivery");
    }

    #[tokio::test]
    async fn test_restock_rejects_non_positive_quantity() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000)).await.unwrap();

        let err = db.stock().restock(&ctx, &tee.id, 0, "").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_adjust_cannot_go_negative() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(3)).await.unwrap();

        let err = db.stock().adjust(&ctx, &tee.id, -4, "Count").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 3, requested: 4, .. })
        ));

        let movement = db.stock().adjust(&ctx, &tee.id, -3, "Damaged").await.unwrap();
        assert_eq!(movement.product.stock_quantity, 0);
        // Initial stock + the successful adjustment only.
        assert_eq!(db.ledger().history(&tee.id, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_movement_requires_actor_and_active_product() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000)).await.unwrap();

        let err = db
            .stock()
            .restock(&RequestContext::anonymous(), &tee.id, 1, "")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Authentication(_))));

        db.products().soft_delete(&tee.id).await.unwrap();
        let err = db.stock().restock(&ctx, &tee.id, 1, "").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_service_paths_keep_ledger_reconciled() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 1000).with_stock(10)).await.unwrap();

        db.stock().restock(&ctx, &tee.id, 5, "Delivery").await.unwrap();
        db.stock().adjust(&ctx, &tee.id, -2, "Shrinkage").await.unwrap();
        db.checkout()
            .create_sale(
                &ctx,
                &Cart::new(vec![CartLine::new(&tee.id, 4, Money::from_cents(1000))]),
                PaymentMethod::Cash,
            )
            .await
            .unwrap();

        let report = db.ledger().reconcile(&tee.id).await.unwrap();
        assert_eq!(report.recorded_stock, 9);
        assert_eq!(report.ledger_stock, 9);
        assert!(report.is_consistent());
    }
}
