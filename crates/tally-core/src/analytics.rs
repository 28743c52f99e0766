//! # Analytics
//!
//! Reporting windows and the pure aggregation behind the analytics screens.
//!
//! ## Data Flow
//! ```text
//! ┌──────────────┐   sales since window start    ┌─────────────────────────┐
//! │   tally-db   │ ─────────────────────────────►│  aggregate_sales()      │
//! │  (reads)     │   lines of those sales        │  ├── totals / AOV       │
//! │              │   product → category map      │  ├── payment split      │
//! │              │                               │  ├── top 5 by revenue   │
//! │              │                               │  └── category revenue   │
//! │              │   active products             ├─────────────────────────┤
//! │              │ ─────────────────────────────►│  summarize_inventory()  │
//! └──────────────┘                               └─────────────────────────┘
//! ```
//!
//! Everything here is a linear scan over already-fetched rows. The clock is
//! passed in (`now`) so results are deterministic under test.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentMethod, Product, ProductCategory, Sale, SaleLine, SaleWithCashier};
use crate::TOP_PRODUCTS_LIMIT;

/// Category label for lines whose product can no longer be resolved.
pub const UNCATEGORIZED: &str = "uncategorized";

// =============================================================================
// Date Window
// =============================================================================

/// Reporting window. All boundaries are computed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    /// From 00:00 UTC of the current day.
    Today,
    /// Rolling 7 days.
    Week,
    /// One calendar month back.
    Month,
    /// Twelve calendar months back.
    Year,
}

impl DateWindow {
    /// Inclusive lower bound of the window relative to `now`.
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            DateWindow::Today => now.date_naive().and_time(NaiveTime::MIN).and_utc(),
            DateWindow::Week => now - Duration::days(7),
            DateWindow::Month => now.checked_sub_months(Months::new(1)).unwrap_or(now),
            DateWindow::Year => now.checked_sub_months(Months::new(12)).unwrap_or(now),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            DateWindow::Today => "today",
            DateWindow::Week => "week",
            DateWindow::Month => "month",
            DateWindow::Year => "year",
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateWindow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(DateWindow::Today),
            "week" => Ok(DateWindow::Week),
            "month" => Ok(DateWindow::Month),
            "year" => Ok(DateWindow::Year),
            _ => Err(ValidationError::NotAllowed {
                field: "window".to_string(),
                allowed: ["today", "week", "month", "year"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Report Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    /// Name as snapshotted on the most recent line seen.
    pub product_name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryRevenue {
    /// A category name, or `uncategorized`.
    pub category: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesAnalytics {
    pub window: DateWindow,
    #[ts(as = "String")]
    pub window_start: DateTime<Utc>,
    pub total_revenue_cents: i64,
    pub order_count: i64,
    pub average_order_cents: i64,
    pub cash_revenue_cents: i64,
    pub transfer_revenue_cents: i64,
    pub top_products: Vec<TopProduct>,
    /// Sorted by revenue, highest first.
    pub category_revenue: Vec<CategoryRevenue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventorySummary {
    pub product_count: i64,
    pub total_units: i64,
    pub value_at_price_cents: i64,
    pub value_at_cost_cents: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub low_stock_threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TodaySales {
    pub total_cents: i64,
    pub order_count: i64,
    pub units_sold: i64,
    pub sales: Vec<SaleWithCashier>,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Rolls sales and their lines up into a [`SalesAnalytics`] for `window`.
///
/// Sales outside the window are ignored, as are lines whose sale is not in
/// the (filtered) sale set. `categories` maps product id to its current
/// category; products missing from it are bucketed as [`UNCATEGORIZED`].
pub fn aggregate_sales(
    window: DateWindow,
    now: DateTime<Utc>,
    sales: &[Sale],
    lines: &[SaleLine],
    categories: &HashMap<String, ProductCategory>,
) -> SalesAnalytics {
    let start = window.start(now);
    let in_window: Vec<&Sale> = sales.iter().filter(|s| s.created_at >= start).collect();

    let mut total = Money::zero();
    let mut cash = Money::zero();
    let mut transfer = Money::zero();
    for sale in &in_window {
        total += sale.total();
        match sale.payment_method {
            PaymentMethod::Cash => cash += sale.total(),
            PaymentMethod::Transfer => transfer += sale.total(),
        }
    }
    let order_count = in_window.len() as i64;

    let sale_ids: HashSet<&str> =
        in_window.iter().map(|s| s.id.as_str()).collect();

    // Insertion order is kept so ties sort deterministically.
    let mut products: Vec<TopProduct> = Vec::new();
    let mut product_index: HashMap<&str, usize> = HashMap::new();
    let mut by_category: HashMap<String, (i64, i64)> = HashMap::new();

    for line in lines.iter().filter(|l| sale_ids.contains(l.sale_id.as_str())) {
        match product_index.get(line.product_id.as_str()) {
            Some(&idx) => {
                let entry = &mut products[idx];
                entry.quantity += line.quantity;
                entry.revenue_cents += line.line_total_cents;
                entry.product_name = line.product_name.clone();
            }
            None => {
                product_index.insert(line.product_id.as_str(), products.len());
                products.push(TopProduct {
                    product_id: line.product_id.clone(),
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    revenue_cents: line.line_total_cents,
                });
            }
        }

        let category = categories
            .get(&line.product_id)
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        let bucket = by_category.entry(category).or_insert((0, 0));
        bucket.0 += line.quantity;
        bucket.1 += line.line_total_cents;
    }

    products.sort_by(|a, b| b.revenue_cents.cmp(&a.revenue_cents));
    products.truncate(TOP_PRODUCTS_LIMIT);

    let mut category_revenue: Vec<CategoryRevenue> = by_category
        .into_iter()
        .map(|(category, (quantity, revenue_cents))| CategoryRevenue {
            category,
            quantity,
            revenue_cents,
        })
        .collect();
    category_revenue.sort_by(|a, b| {
        b.revenue_cents
            .cmp(&a.revenue_cents)
            .then_with(|| a.category.cmp(&b.category))
    });

    SalesAnalytics {
        window,
        window_start: start,
        total_revenue_cents: total.cents(),
        order_count,
        average_order_cents: total.average_over(order_count).cents(),
        cash_revenue_cents: cash.cents(),
        transfer_revenue_cents: transfer.cents(),
        top_products: products,
        category_revenue,
    }
}

/// Inventory totals over active products.
///
/// Low stock is `0 < qty <= threshold`; out of stock is `qty == 0`. A product
/// without a cost contributes 0 to the cost valuation.
pub fn summarize_inventory(products: &[Product], low_stock_threshold: i64) -> InventorySummary {
    let mut summary = InventorySummary {
        product_count: 0,
        total_units: 0,
        value_at_price_cents: 0,
        value_at_cost_cents: 0,
        low_stock_count: 0,
        out_of_stock_count: 0,
        low_stock_threshold,
    };

    for product in products.iter().filter(|p| p.is_active) {
        summary.product_count += 1;
        summary.total_units += product.stock_quantity;
        summary.value_at_price_cents += product.price().multiply_quantity(product.stock_quantity).cents();
        summary.value_at_cost_cents += product
            .cost()
            .unwrap_or_default()
            .multiply_quantity(product.stock_quantity)
            .cents();

        if product.is_out_of_stock() {
            summary.out_of_stock_count += 1;
        } else if product.is_low_stock(low_stock_threshold) {
            summary.low_stock_count += 1;
        }
    }

    summary
}

/// Today's headline numbers from the day's sales and units sold.
pub fn summarize_today(sales: Vec<SaleWithCashier>, units_sold: i64) -> TodaySales {
    let total_cents = sales.iter().map(|s| s.total_cents).sum();
    TodaySales {
        total_cents,
        order_count: sales.len() as i64,
        units_sold,
        sales,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
