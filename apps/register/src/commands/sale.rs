//! # Sale Commands
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "Charge" clicked                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SubmitLock::try_acquire ── held? ──► CHECKOUT_IN_PROGRESS             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parse payment method, build Cart                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleOrchestrator::create_sale (one store transaction)                 │
//! │       │                                                                 │
//! │       ├── ok ──► SaleDetail (sale, cashier name, lines)                │
//! │       └── err ─► INSUFFICIENT_STOCK / NOT_FOUND / ... (nothing applied)│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  guard dropped, lock released                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::{AppConfig, DbState, SessionState};
use tally_core::cart::{Cart, CartLine};
use tally_core::{PaymentMethod, SaleDetail, SaleWithCashier};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub lines: Vec<CartLineRequest>,
    /// "cash" or "transfer"
    pub payment_method: String,
}

impl CreateSaleRequest {
    fn cart(&self) -> Cart {
        self.lines
            .iter()
            .map(|l| CartLine {
                product_id: l.product_id.clone(),
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
            })
            .collect::<Vec<_>>()
            .into()
    }
}

/// Records a sale for the signed-in cashier.
pub async fn create_sale(
    db: &DbState,
    session: &SessionState,
    request: CreateSaleRequest,
) -> ApiResponse<SaleDetail> {
    debug!(lines = request.lines.len(), method = %request.payment_method, "create_sale command");

    let Some(_guard) = session.submit_lock().try_acquire() else {
        return ApiResponse::from_result("create_sale", Err(ApiError::checkout_in_progress()));
    };

    let ctx = session.context();
    let result = async {
        let method: PaymentMethod = request.payment_method.parse()?;
        let detail = db.inner().checkout().create_sale(&ctx, &request.cart(), method).await?;
        info!(
            sale_id = %detail.sale.id,
            total_cents = detail.sale.total_cents,
            "create_sale complete"
        );
        Ok::<_, ApiError>(detail)
    }
    .await;

    ApiResponse::from_result("create_sale", result)
}

pub async fn get_sale(db: &DbState, id: String) -> ApiResponse<SaleDetail> {
    debug!(id = %id, "get_sale command");

    let result = async {
        db.inner()
            .sales()
            .get_with_lines(&id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale", &id))
    }
    .await;

    ApiResponse::from_result("get_sale", result)
}

/// Most recent sales with cashier names, newest first.
pub async fn recent_sales(
    db: &DbState,
    config: &AppConfig,
    limit: Option<u32>,
) -> ApiResponse<Vec<SaleWithCashier>> {
    let limit = limit.unwrap_or(config.history_limit);
    debug!(limit, "recent_sales command");

    let result = db.inner().sales().list_recent(limit).await;
    ApiResponse::from_result("recent_sales", result)
}
