//! # Analytics Commands
//!
//! Read-only reports for the dashboard.

use tracing::debug;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::{AppConfig, DbState};
use tally_core::analytics::{DateWindow, InventorySummary, SalesAnalytics, TodaySales};

/// Sales report for "today", "week", "month" or "year".
pub async fn sales_analytics(db: &DbState, window: String) -> ApiResponse<SalesAnalytics> {
    debug!(window = %window, "sales_analytics command");

    let result = async {
        let window: DateWindow = window.parse()?;
        Ok::<_, ApiError>(db.inner().analytics().sales_analytics(window).await?)
    }
    .await;

    ApiResponse::from_result("sales_analytics", result)
}

pub async fn inventory_summary(db: &DbState, config: &AppConfig) -> ApiResponse<InventorySummary> {
    debug!(threshold = config.low_stock_threshold, "inventory_summary command");
    let result = db
        .inner()
        .analytics()
        .inventory_summary(config.low_stock_threshold)
        .await;
    ApiResponse::from_result("inventory_summary", result)
}

pub async fn today_sales(db: &DbState) -> ApiResponse<TodaySales> {
    debug!("today_sales command");
    let result = db.inner().analytics().today_sales().await;
    ApiResponse::from_result("today_sales", result)
}
