//! # Tally Register Library
//!
//! Command layer between the register UI and the Tally store.
//!
//! ## Module Organization
//! ```text
//! tally_register/
//! ├── lib.rs          ◄─── You are here (startup, logging)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── session.rs  ◄─── Request context + submit lock
//! │   └── config.rs   ◄─── AppConfig (env > file > defaults)
//! ├── commands/       ◄─── One module per UI area
//! ├── response.rs     ◄─── { success, data | error } envelope
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Startup Sequence
//! ```text
//! 1. init_tracing()          RUST_LOG or "info,tally=debug,sqlx=warn"
//! 2. AppConfig::load()       env > config.toml > defaults
//! 3. DbState::open(&config)  WAL SQLite, pending migrations applied
//! 4. SessionState::new()     signed out until resolve_session
//! ```

pub mod commands;
pub mod error;
pub mod response;
pub mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub use error::{ApiError, ErrorCode};
pub use response::ApiResponse;
pub use state::{AppConfig, DbState, SessionState};

/// Everything a register process holds.
#[derive(Debug)]
pub struct Register {
    pub db: DbState,
    pub session: SessionState,
    pub config: AppConfig,
}

impl Register {
    /// Loads configuration and opens the database. Starts signed out.
    pub async fn start() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config = AppConfig::load()?;
        let db = DbState::open(&config).await?;
        info!(store = %config.store_name, "Register ready");

        Ok(Register {
            db,
            session: SessionState::new(),
            config,
        })
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Show trace for tally crates only
/// - Default: INFO, DEBUG for tally crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::commands::product::{create_product, CreateProductRequest, ProductDto};
    use crate::state::{AppConfig, DbState, SessionState};
    use serde_json::json;
    use tally_core::UserRole;
    use tally_db::{Database, DbConfig};

    /// In-memory register with a cashier signed in.
    pub async fn signed_in() -> (DbState, SessionState, AppConfig) {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let user = db.inner().users().create("Till 1", UserRole::Cashier).await.unwrap();

        let session = SessionState::new();
        session.set_context(db.inner().users().resolve_context(&user.id).await.unwrap());

        (db, session, AppConfig::default())
    }

    pub async fn seed_product(
        db: &DbState,
        session: &SessionState,
        name: &str,
        price_cents: i64,
        stock: i64,
    ) -> ProductDto {
        let request: CreateProductRequest = serde_json::from_value(json!({
            "name": name,
            "category": "tops",
            "price": format!("{}.{:02}", price_cents / 100, price_cents % 100),
            "stock": stock,
        }))
        .unwrap();

        create_product(db, session, &AppConfig::default(), request)
            .await
            .into_result()
            .unwrap()
    }
}
