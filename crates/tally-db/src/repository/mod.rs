//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register command                                                      │
//! │       │  db.products().list(&filter)                                   │
//! │       ▼                                                                 │
//! │  ProductRepository / LedgerRepository / SaleRepository / UserRepository│
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-step writes that must be atomic (checkout, restock, adjustment)
//! live in [`crate::checkout`] and [`crate::inventory`] and reuse the
//! connection-level helpers exposed here to the crate.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD, listing, low stock
//! - [`ledger::LedgerRepository`] - Inventory ledger and reconciliation
//! - [`sale::SaleRepository`] - Sale and sale line reads
//! - [`user::UserRepository`] - Users and request context resolution

pub mod ledger;
pub mod product;
pub mod sale;
pub mod user;
