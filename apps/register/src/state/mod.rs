//! # State Module
//!
//! Register state, split into focused types so each command asks only for
//! what it needs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐          │
//! │  │   DbState    │  │  SessionState    │  │    AppConfig     │          │
//! │  │              │  │                  │  │                  │          │
//! │  │  Database    │  │  RequestContext  │  │  store_name      │          │
//! │  │  (SQLite     │  │  (RwLock)        │  │  currency        │          │
//! │  │   pool)      │  │  SubmitLock      │  │  low_stock_...   │          │
//! │  └──────────────┘  └──────────────────┘  └──────────────────┘          │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • SessionState: RwLock context, atomic submit flag                    │
//! │  • AppConfig: Read-only after initialization                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod session;

pub use config::{AppConfig, ConfigError};
pub use db::DbState;
pub use session::{SessionState, SubmitGuard, SubmitLock};
