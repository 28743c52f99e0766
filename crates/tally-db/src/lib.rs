//! # tally-db: Database Layer for Tally POS
//!
//! Store access for the sale-transaction and inventory-ledger subsystem.
//! SQLite through sqlx, one pool per process.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  Register command (create_sale)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌────────────────┐  ┌──────────────────┐  │   │
//! │  │   │   Database    │  │  Repositories  │  │    Services      │  │   │
//! │  │   │   (pool.rs)   │  │  product       │  │  checkout        │  │   │
//! │  │   │               │◄─│  ledger        │◄─│  inventory       │  │   │
//! │  │   │ SqlitePool    │  │  sale          │  │  analytics       │  │   │
//! │  │   │ migrations    │  │  user          │  │                  │  │   │
//! │  │   └───────────────┘  └────────────────┘  └──────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite (WAL): users, products, sales, sale_lines,              │   │
//! │  │                ledger_entries                                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//! let ctx = db.users().resolve_context(&session_user_id).await?;
//!
//! let sale = db.checkout().create_sale(&ctx, &cart, PaymentMethod::Cash).await?;
//! let report = db.analytics().sales_analytics(DateWindow::Today).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use analytics::AnalyticsService;
pub use checkout::SaleOrchestrator;
pub use error::{DbError, DbResult};
pub use inventory::{StockMovement, StockService};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::ledger::LedgerRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::user::UserRepository;
