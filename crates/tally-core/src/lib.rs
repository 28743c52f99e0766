//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate contains the domain model of the sale-transaction and
//! inventory-ledger subsystem as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Register UI (excluded)                       │   │
//! │  │    Catalog ──► Cart ──► Checkout ──► Inventory ──► Reports      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ApiResponse { success, data }          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/register commands                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │ context │ │analytics│  │   │
//! │  │   │ Product │ │  Money  │ │CartLine │ │ Actor   │ │ windows │  │   │
//! │  │   │  Sale   │ │ parsing │ │ totals  │ │ require │ │ rollups │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │      repositories, checkout transaction, ledger, reports        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleLine, LedgerEntry, User)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Checkout cart lines and totals
//! - [`context`] - Explicit request context carrying the acting user
//! - [`analytics`] - Reporting windows and pure aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation and input coercion
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::cart::{Cart, CartLine};
//! use tally_core::Money;
//!
//! let cart = Cart::new(vec![
//!     CartLine::new("p-1", 2, Money::from_cents(1250)),
//!     CartLine::new("p-2", 1, Money::from_cents(499)),
//! ]);
//!
//! assert_eq!(cart.total().cents(), 2999);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod cart;
pub mod context;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use context::{Actor, RequestContext};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in a checkout.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Units at or below which an in-stock product counts as "low stock".
///
/// This is the only definition of the threshold; reports, product lists and
/// configuration defaults all read it from here.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Default number of ledger entries returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Number of products kept in the "top products" report.
pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// Ledger note attached to the restock entry written at product creation.
pub const INITIAL_STOCK_NOTE: &str = "Initial stock";
