//! # Seed Data Generator
//!
//! Populates a database with demo users and an apparel catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db with the full catalog
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path and product limit
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --count 20
//! ```
//!
//! Every product with stock gets its "Initial stock" ledger entry, so a
//! freshly seeded database reconciles cleanly.

use std::env;

use tally_core::{Money, NewProduct, ProductCategory, UserRole};
use tally_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// Demo catalog: (category, name, price in cents, cost in cents)
const CATALOG: &[(ProductCategory, &str, i64, i64)] = &[
    (ProductCategory::Tops, "Linen Shirt", 3900, 1600),
    (ProductCategory::Tops, "Basic Tee", 1500, 500),
    (ProductCategory::Tops, "Striped Polo", 2900, 1100),
    (ProductCategory::Bottoms, "Slim Jeans", 5900, 2400),
    (ProductCategory::Bottoms, "Chino Shorts", 3400, 1300),
    (ProductCategory::Dresses, "Wrap Dress", 6900, 2800),
    (ProductCategory::Dresses, "Summer Sundress", 4900, 1900),
    (ProductCategory::Outerwear, "Denim Jacket", 8900, 3700),
    (ProductCategory::Outerwear, "Rain Parka", 11900, 5200),
    (ProductCategory::Footwear, "Canvas Sneaker", 4500, 1800),
    (ProductCategory::Footwear, "Chelsea Boot", 12900, 5600),
    (ProductCategory::Accessories, "Leather Belt", 2500, 800),
    (ProductCategory::Accessories, "Wool Scarf", 1900, 600),
];

const SIZES: &[&str] = &["S", "M", "L"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = usize::MAX;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(usize::MAX);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Maximum number of products (default: whole catalog)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admin = db.users().create("Store Admin", UserRole::Admin).await?;
    let cashier = db.users().create("Front Cashier", UserRole::Cashier).await?;
    println!("✓ Users: {} (admin), {} (cashier)", admin.id, cashier.id);

    let ctx = db.users().resolve_context(&admin.id).await?;

    println!();
    println!("Generating products...");

    let mut generated = 0;
    'catalog: for (idx, (category, name, price, cost)) in CATALOG.iter().enumerate() {
        for (size_idx, size) in SIZES.iter().enumerate() {
            if generated >= count {
                break 'catalog;
            }

            let seed = idx * SIZES.len() + size_idx;
            let data = NewProduct::new(*name, *category, Money::from_cents(*price))
                .with_size(*size)
                .with_cost(Money::from_cents(*cost))
                .with_barcode(format!("2000{:09}", seed))
                // 0..=24 so the demo has out-of-stock and low-stock items
                .with_stock(((seed * 7) % 25) as i64);

            match db.products().create(&ctx, &data).await {
                Ok(_) => generated += 1,
                Err(e) => eprintln!("Failed to insert {} {}: {}", name, size, e),
            }
        }
    }

    println!("✓ Generated {} products", generated);

    let drift = db.ledger().reconcile_all().await?;
    println!("✓ Ledger reconciliation: {} drifting products", drift.len());

    println!();
    println!("✓ Seed complete!");
    println!("  Log in as cashier with user id {}", cashier.id);

    Ok(())
}
