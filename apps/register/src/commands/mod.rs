//! # Commands Module
//!
//! Everything the register UI can invoke.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── product.rs    ◄─── Catalog listing, barcode lookup, edits
//! ├── inventory.rs  ◄─── Restock, adjustment, history, reconciliation
//! ├── sale.rs       ◄─── Checkout and sale reads
//! ├── analytics.rs  ◄─── Dashboard reports
//! └── session.rs    ◄─── Cashier sign-in
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  async fn create_sale(                                                  │
//! │      db: &DbState,            ◄── only the state it needs               │
//! │      session: &SessionState,                                            │
//! │      request: CreateSaleRequest,  ◄── deserialized from the UI          │
//! │  ) -> ApiResponse<SaleDetail>                                           │
//! │         │                                                               │
//! │         │ (JSON serialization)                                          │
//! │         ▼                                                               │
//! │  UI receives: { success: true, data: {...} }                            │
//! │           or: { success: false, error: { code, message } }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod analytics;
pub mod inventory;
pub mod product;
pub mod sale;
pub mod session;
