//! # Sale Repository
//!
//! Read side of sales and sale lines. Sales are written only by the
//! [`SaleOrchestrator`](crate::checkout::SaleOrchestrator) and never updated
//! or deleted afterwards.
//!
//! ```text
//! sales ──1:N──► sale_lines        (lines in cart order, by rowid)
//!   │
//!   └── cashier_id ──► users.display_name   (joined for receipts/reports)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Sale, SaleDetail, SaleLine, SaleWithCashier};

pub(crate) const SALE_COLUMNS: &str = "id, cashier_id, total_cents, payment_method, created_at";

pub(crate) const SALE_LINE_COLUMNS: &str = "id, sale_id, product_id, product_name, quantity, \
     unit_price_cents, line_total_cents, created_at";

const SALE_WITH_CASHIER_SELECT: &str = r#"
    SELECT s.id, s.cashier_id, COALESCE(u.display_name, '') AS cashier_name,
           s.total_cents, s.payment_method, s.created_at
    FROM sales s
    LEFT JOIN users u ON u.id = s.cashier_id
"#;

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Lines of a sale in the order they were rung up.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {SALE_LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Sale, lines and cashier name in one call (receipt view).
    pub async fn get_with_lines(&self, sale_id: &str) -> DbResult<Option<SaleDetail>> {
        debug!(sale_id = %sale_id, "Loading sale detail");

        let Some(header) = sqlx::query_as::<_, SaleWithCashier>(&format!(
            "{SALE_WITH_CASHIER_SELECT} WHERE s.id = ?1"
        ))
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let lines = self.get_lines(sale_id).await?;

        Ok(Some(SaleDetail {
            sale: Sale {
                id: header.id,
                cashier_id: header.cashier_id,
                total_cents: header.total_cents,
                payment_method: header.payment_method,
                created_at: header.created_at,
            },
            cashier_name: header.cashier_name,
            lines,
        }))
    }

    /// Sales created at or after `start`, newest first, with cashier names.
    pub async fn list_since(&self, start: DateTime<Utc>) -> DbResult<Vec<SaleWithCashier>> {
        let sales = sqlx::query_as::<_, SaleWithCashier>(&format!(
            "{SALE_WITH_CASHIER_SELECT} WHERE s.created_at >= ?1 ORDER BY s.created_at DESC, s.rowid DESC"
        ))
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// The most recent `limit` sales with cashier names.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<SaleWithCashier>> {
        let sales = sqlx::query_as::<_, SaleWithCashier>(&format!(
            "{SALE_WITH_CASHIER_SELECT} ORDER BY s.created_at DESC, s.rowid DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Bare sale rows since `start` (analytics input).
    pub async fn sales_since(&self, start: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE created_at >= ?1 ORDER BY created_at"
        ))
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lines of every sale created at or after `start`.
    pub async fn lines_since(&self, start: DateTime<Utc>) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT l.id, l.sale_id, l.product_id, l.product_name, l.quantity,
                   l.unit_price_cents, l.line_total_cents, l.created_at
            FROM sale_lines l
            INNER JOIN sales s ON s.id = l.sale_id
            WHERE s.created_at >= ?1
            ORDER BY l.rowid
            "#,
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Units sold across sales created at or after `start`.
    pub async fn units_sold_since(&self, start: DateTime<Utc>) -> DbResult<i64> {
        let units: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(l.quantity), 0)
            FROM sale_lines l
            INNER JOIN sales s ON s.id = l.sale_id
            WHERE s.created_at >= ?1
            "#,
        )
        .bind(start)
        .fetch_one(&self.pool)
        .await?;

        Ok(units)
    }

    /// Counts all sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cashier_context, product_input, test_db};
    use chrono::Duration;
    use tally_core::cart::{Cart, CartLine};
    use tally_core::{Money, PaymentMethod};

    #[tokio::test]
    async fn test_get_with_lines_joins_cashier_name() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let shirt = db
            .products()
            .create(&ctx, &product_input("Linen Shirt", 2500).with_stock(5))
            .await
            .unwrap();

        let sale = db
            .checkout()
            .create_sale(
                &ctx,
                &Cart::new(vec![CartLine::new(&shirt.id, 2, Money::from_cents(2500))]),
                PaymentMethod::Cash,
            )
            .await
            .unwrap();

        let detail = db.sales().get_with_lines(&sale.sale.id).await.unwrap().unwrap();
        assert_eq!(detail.cashier_name, ctx.require_actor().unwrap().display_name);
        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.sale.total_cents, 5000);

        assert!(db.sales().get_with_lines("missing").await.unwrap().is_none());
        assert!(db.sales().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_and_since_queries() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db
            .products()
            .create(&ctx, &product_input("Tee", 1000).with_stock(10))
            .await
            .unwrap();

        for qty in 1..=3 {
            db.checkout()
                .create_sale(
                    &ctx,
                    &Cart::new(vec![CartLine::new(&tee.id, qty, Money::from_cents(1000))]),
                    PaymentMethod::Transfer,
                )
                .await
                .unwrap();
        }

        let recent = db.sales().list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].total_cents, 3000);

        let hour_ago = Utc::now() - Duration::hours(1);
        assert_eq!(db.sales().list_since(hour_ago).await.unwrap().len(), 3);
        assert_eq!(db.sales().units_sold_since(hour_ago).await.unwrap(), 6);
        assert_eq!(db.sales().lines_since(hour_ago).await.unwrap().len(), 3);
        assert_eq!(db.sales().count().await.unwrap(), 3);

        let future = Utc::now() + Duration::hours(1);
        assert!(db.sales().sales_since(future).await.unwrap().is_empty());
    }
}
