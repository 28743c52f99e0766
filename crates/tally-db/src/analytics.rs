//! # Analytics Aggregator
//!
//! Loads the rows a report needs and hands them to the pure rollups in
//! [`tally_core::analytics`]. Read-only: nothing here writes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use tally_core::analytics::{
    aggregate_sales, summarize_inventory, summarize_today, DateWindow, InventorySummary,
    SalesAnalytics, TodaySales,
};
use tally_core::{ProductCategory, ProductFilter};

#[derive(Debug, Clone)]
pub struct AnalyticsService {
    pool: SqlitePool,
}

impl AnalyticsService {
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsService { pool }
    }

    /// Sales report for `window`, relative to the current time.
    pub async fn sales_analytics(&self, window: DateWindow) -> DbResult<SalesAnalytics> {
        self.sales_analytics_at(window, Utc::now()).await
    }

    /// Sales report for `window`, relative to `now`.
    pub async fn sales_analytics_at(
        &self,
        window: DateWindow,
        now: DateTime<Utc>,
    ) -> DbResult<SalesAnalytics> {
        let start = window.start(now);
        debug!(window = %window, start = %start, "Computing sales analytics");

        let sales_repo = SaleRepository::new(self.pool.clone());
        let sales = sales_repo.sales_since(start).await?;
        let lines = sales_repo.lines_since(start).await?;
        let categories = self.product_categories().await?;

        Ok(aggregate_sales(window, now, &sales, &lines, &categories))
    }

    /// Inventory totals over active products.
    pub async fn inventory_summary(&self, low_stock_threshold: i64) -> DbResult<InventorySummary> {
        let products = ProductRepository::new(self.pool.clone())
            .list(&ProductFilter::default())
            .await?;

        Ok(summarize_inventory(&products, low_stock_threshold))
    }

    /// Today's sales (UTC day) with cashier names.
    pub async fn today_sales(&self) -> DbResult<TodaySales> {
        self.today_sales_at(Utc::now()).await
    }

    pub async fn today_sales_at(&self, now: DateTime<Utc>) -> DbResult<TodaySales> {
        let start = DateWindow::Today.start(now);
        let sales_repo = SaleRepository::new(self.pool.clone());

        let sales = sales_repo.list_since(start).await?;
        let units = sales_repo.units_sold_since(start).await?;

        Ok(summarize_today(sales, units))
    }

    /// Current category of every product ever created, inactive included.
    async fn product_categories(&self) -> DbResult<HashMap<String, ProductCategory>> {
        let rows: Vec<(String, ProductCategory)> =
            sqlx::query_as("SELECT id, category FROM products")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
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
    use tally_core::{Money, NewProduct, PaymentMethod, ProductPatch};

    #[tokio::test]
    async fn test_today_split_by_payment_method() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let tee = db.products().create(&ctx, &product_input("Tee", 500).with_stock(20)).await.unwrap();

        db.checkout()
            .create_sale(&ctx, &Cart::new(vec![CartLine::new(&tee.id, 2, Money::from_cents(500))]), PaymentMethod::Cash)
            .await
            .unwrap();
        db.checkout()
            .create_sale(&ctx, &Cart::new(vec![CartLine::new(&tee.id, 3, Money::from_cents(500))]), PaymentMethod::Transfer)
            .await
            .unwrap();

        // A sale from yesterday, written directly with an older timestamp.
        let yesterday = Utc::now() - Duration::days(1) - Duration::hours(1);
        sqlx::query(
            "INSERT INTO sales (id, cashier_id, total_cents, payment_method, created_at)
             VALUES ('old-sale', ?1, 2000, 'cash', ?2)",
        )
        .bind(ctx.user_id().unwrap())
        .bind(yesterday)
        .execute(db.pool())
        .await
        .unwrap();

        let report = db.analytics().sales_analytics(DateWindow::Today).await.unwrap();
        assert_eq!(report.total_revenue_cents, 2500);
        assert_eq!(report.order_count, 2);
        assert_eq!(report.cash_revenue_cents, 1000);
        assert_eq!(report.transfer_revenue_cents, 1500);
        assert_eq!(report.top_products[0].quantity, 5);

        let week = db.analytics().sales_analytics(DateWindow::Week).await.unwrap();
        assert_eq!(week.order_count, 3);
        assert_eq!(week.total_revenue_cents, 4500);

        let today = db.analytics().today_sales().await.unwrap();
        assert_eq!(today.total_cents, 2500);
        assert_eq!(today.order_count, 2);
        assert_eq!(today.units_sold, 5);
        assert!(!today.sales[0].cashier_name.is_empty());
    }

    #[tokio::test]
    async fn test_category_revenue_survives_soft_delete() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let boots = db
            .products()
            .create(
                &ctx,
                &NewProduct::new("Boots", ProductCategory::Footwear, Money::from_cents(5000)).with_stock(3),
            )
            .await
            .unwrap();

        db.checkout()
            .create_sale(&ctx, &Cart::new(vec![CartLine::new(&boots.id, 1, Money::from_cents(5000))]), PaymentMethod::Cash)
            .await
            .unwrap();
        db.products().soft_delete(&boots.id).await.unwrap();

        let report = db.analytics().sales_analytics(DateWindow::Month).await.unwrap();
        assert_eq!(report.category_revenue.len(), 1);
        assert_eq!(report.category_revenue[0].category, "footwear");
        assert_eq!(report.category_revenue[0].revenue_cents, 5000);
    }

    #[tokio::test]
    async fn test_inventory_summary_over_stock_levels() {
        let db = test_db().await;
        let ctx = cashier_context(&db).await;
        let repo = db.products();

        repo.create(&ctx, &product_input("Out", 1000)).await.unwrap();
        repo.create(&ctx, &product_input("Low", 1000).with_cost(Money::from_cents(400)).with_stock(5))
            .await
            .unwrap();
        let plenty = repo.create(&ctx, &product_input("Plenty", 200).with_stock(20)).await.unwrap();

        let summary = db.analytics().inventory_summary(tally_core::DEFAULT_LOW_STOCK_THRESHOLD).await.unwrap();
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.out_of_stock_count, 1);
        assert_eq!(summary.total_units, 25);
        assert_eq!(summary.value_at_price_cents, 5 * 1000 + 20 * 200);
        assert_eq!(summary.value_at_cost_cents, 5 * 400);

        // A stricter threshold from configuration.
        repo.update(&plenty.id, &ProductPatch { stock_quantity: Some(4), ..Default::default() })
            .await
            .unwrap();
        let strict = db.analytics().inventory_summary(3).await.unwrap();
        assert_eq!(strict.low_stock_count, 0);
        assert_eq!(strict.low_stock_threshold, 3);
    }
}
