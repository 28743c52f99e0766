//! # Tally Report
//!
//! Prints the inventory summary and sales analytics for a window as JSON.
//!
//! ## Usage
//! ```bash
//! # Today's report against the configured database
//! cargo run -p tally-register --bin tally-report
//!
//! # Monthly report for a specific database file
//! cargo run -p tally-register --bin tally-report -- --window month --db ./tally_dev.db
//! ```

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tally_core::analytics::{DateWindow, InventorySummary, SalesAnalytics};
use tally_core::StockReconciliation;
use tally_register::{init_tracing, AppConfig, DbState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    store_name: String,
    generated_at: String,
    inventory: InventorySummary,
    inventory_value: String,
    sales: SalesAnalytics,
    revenue: String,
    /// Products whose counter disagrees with the ledger.
    stock_drift: Vec<StockReconciliation>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut window = DateWindow::Today;
    let mut db_path: Option<PathBuf> = None;
    let mut threshold: Option<i64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--window" | "-w" => {
                if i + 1 < args.len() {
                    window = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--threshold" | "-t" => {
                if i + 1 < args.len() {
                    threshold = Some(args[i + 1].parse()?);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Report");
                println!();
                println!("Usage: tally-report [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -w, --window <W>      today | week | month | year (default: today)");
                println!("  -d, --db <PATH>       Database file path (default: from config)");
                println!("  -t, --threshold <N>   Low-stock threshold (default: from config)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    let mut config = AppConfig::load()?;
    if let Some(path) = db_path {
        config.database_path = Some(path);
    }
    if let Some(t) = threshold {
        config.low_stock_threshold = t;
    }

    let db = DbState::open(&config).await?;
    let analytics = db.inner().analytics();

    let inventory = analytics.inventory_summary(config.low_stock_threshold).await?;
    let sales = analytics.sales_analytics(window).await?;
    let stock_drift = db.inner().ledger().reconcile_all().await?;

    let report = Report {
        store_name: config.store_name.clone(),
        generated_at: Utc::now().to_rfc3339(),
        inventory_value: config.format_currency(inventory.value_at_price_cents),
        revenue: config.format_currency(sales.total_revenue_cents),
        inventory,
        sales,
        stock_drift,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    db.inner().close().await;
    Ok(())
}
