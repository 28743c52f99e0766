//! # Inventory Ledger
//!
//! Append-only log of stock-affecting events.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock_quantity  (fast counter, read by the register)         │
//! │           ║                                                             │
//! │           ║  must equal                                                 │
//! │           ║                                                             │
//! │  Σ ledger_entries.quantity_delta  (audit trail, source of truth)       │
//! │     +10  restock     "Initial stock"                                   │
//! │      -2  sale        "Sale 7f3c…"                                      │
//! │      +5  restock     "Supplier delivery"                               │
//! │      -1  adjustment  "Damaged"                                         │
//! │     ───                                                                 │
//! │      12                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ledger never touches `products`; callers that change stock append the
//! matching entry themselves (inside their own transaction).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use tally_core::validation::{validate_ledger_delta, validate_note};
use tally_core::{LedgerEntry, NewLedgerEntry, RequestContext, StockReconciliation, DEFAULT_HISTORY_LIMIT};

const LEDGER_COLUMNS: &str =
    "id, product_id, kind, quantity_delta, user_id, note, sale_id, created_at";

#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Appends an entry attributed to the context's actor.
    ///
    /// ## Errors
    /// * `Authentication` - the context has no actor
    /// * `Validation` - zero delta or oversized note
    /// * `ForeignKeyViolation` - unknown product
    pub async fn append(&self, ctx: &RequestContext, entry: NewLedgerEntry) -> DbResult<LedgerEntry> {
        let actor = ctx.require_actor()?;
        let mut conn = self.pool.acquire().await?;
        let stored = insert_entry(&mut conn, &actor.user_id, &entry, Utc::now()).await?;

        info!(
            product_id = %stored.product_id,
            kind = ?stored.kind,
            delta = stored.quantity_delta,
            user_id = %stored.user_id,
            "Ledger entry appended"
        );
        Ok(stored)
    }

    /// Entries for a product, newest first. `limit` defaults to 50.
    pub async fn history(&self, product_id: &str, limit: Option<u32>) -> DbResult<Vec<LedgerEntry>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        debug!(product_id = %product_id, limit, "Loading ledger history");

        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            SELECT {LEDGER_COLUMNS} FROM ledger_entries
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries written by a sale, in line order.
    pub async fn entries_for_sale(&self, sale_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Σ quantity_delta for a product.
    pub async fn ledger_stock(&self, product_id: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_delta), 0) FROM ledger_entries WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    /// Compares a product's stored counter with its ledger sum.
    pub async fn reconcile(&self, product_id: &str) -> DbResult<StockReconciliation> {
        let mut conn = self.pool.acquire().await?;
        let product = fetch_product(&mut conn, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        drop(conn);

        let report = StockReconciliation::new(&product, self.ledger_stock(product_id).await?);

        if !report.is_consistent() {
            warn!(
                product_id = %report.product_id,
                recorded = report.recorded_stock,
                ledger = report.ledger_stock,
                drift = report.drift,
                "Stock counter drifted from ledger"
            );
        }

        Ok(report)
    }

    /// Reconciles every active product and returns only the drifting ones.
    pub async fn reconcile_all(&self) -> DbResult<Vec<StockReconciliation>> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.id, p.name, p.stock_quantity,
                   COALESCE(SUM(l.quantity_delta), 0) AS ledger_stock
            FROM products p
            LEFT JOIN ledger_entries l ON l.product_id = p.id
            WHERE p.is_active = 1
            GROUP BY p.id, p.name, p.stock_quantity
            HAVING p.stock_quantity <> COALESCE(SUM(l.quantity_delta), 0)
            ORDER BY p.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let drifting: Vec<StockReconciliation> = rows
            .into_iter()
            .map(|(product_id, product_name, recorded_stock, ledger_stock)| StockReconciliation {
                product_id,
                product_name,
                recorded_stock,
                ledger_stock,
                drift: recorded_stock - ledger_stock,
            })
            .collect();

        if drifting.is_empty() {
            debug!("All active products reconcile with the ledger");
        } else {
            warn!(count = drifting.len(), "Products drifting from ledger");
        }

        Ok(drifting)
    }
}

/// Inserts a ledger entry on an existing connection or transaction.
pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    user_id: &str,
    entry: &NewLedgerEntry,
    now: DateTime<Utc>,
) -> DbResult<LedgerEntry> {
    validate_ledger_delta(entry.quantity_delta)?;
    validate_note(&entry.note)?;

    let stored = LedgerEntry {
        id: Uuid::new_v4().to_string(),
        product_id: entry.product_id.clone(),
        kind: entry.kind,
        quantity_delta: entry.quantity_delta,
        user_id: user_id.to_string(),
        note: entry.note.trim().to_string(),
        sale_id: entry.sale_id.clone(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, product_id, kind, quantity_delta, user_id, note, sale_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&stored.id)
    .bind(&stored.product_id)
    .bind(stored.kind)
    .bind(stored.quantity_delta)
    .bind(&stored.user_id)
    .bind(&stored.note)
    .bind(&stored.sale_id)
    .bind(stored.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(stored)
}

// =============================================================================
// Unit Tests
// =============================================================================
