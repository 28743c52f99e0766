//! # Inventory Commands
//!
//! Restock, manual adjustment, ledger history and reconciliation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::product::ProductDto;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::{AppConfig, DbState, SessionState};
use tally_core::{LedgerEntry, StockReconciliation};
use tally_db::StockMovement;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChangeRequest {
    pub product_id: String,
    /// Units received (restock) or signed correction (adjustment).
    pub quantity: i64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementDto {
    pub product: ProductDto,
    pub entry: LedgerEntry,
}

impl StockMovementDto {
    fn new(movement: StockMovement, config: &AppConfig) -> Self {
        StockMovementDto {
            product: ProductDto::from_product(movement.product, config.low_stock_threshold),
            entry: movement.entry,
        }
    }
}

pub async fn restock_product(
    db: &DbState,
    session: &SessionState,
    config: &AppConfig,
    request: StockChangeRequest,
) -> ApiResponse<StockMovementDto> {
    debug!(product_id = %request.product_id, quantity = request.quantity, "restock_product command");
    let ctx = session.context();

    let result = db
        .inner()
        .stock()
        .restock(&ctx, &request.product_id, request.quantity, &request.note)
        .await
        .map(|m| StockMovementDto::new(m, config));

    ApiResponse::from_result("restock_product", result)
}

pub async fn adjust_stock(
    db: &DbState,
    session: &SessionState,
    config: &AppConfig,
    request: StockChangeRequest,
) -> ApiResponse<StockMovementDto> {
    debug!(product_id = %request.product_id, delta = request.quantity, "adjust_stock command");
    let ctx = session.context();

    let result = db
        .inner()
        .stock()
        .adjust(&ctx, &request.product_id, request.quantity, &request.note)
        .await
        .map(|m| StockMovementDto::new(m, config));

    ApiResponse::from_result("adjust_stock", result)
}

/// Ledger entries for a product, newest first.
pub async fn product_history(
    db: &DbState,
    config: &AppConfig,
    product_id: String,
    limit: Option<u32>,
) -> ApiResponse<Vec<LedgerEntry>> {
    let limit = limit.unwrap_or(config.history_limit);
    debug!(product_id = %product_id, limit, "product_history command");

    let result = db.inner().ledger().history(&product_id, Some(limit)).await;
    ApiResponse::from_result("product_history", result)
}

/// Compares stored counters with ledger sums.
///
/// With a product id, returns that product's report. Without one, returns
/// only the products that drift.
pub async fn reconcile_stock(
    db: &DbState,
    product_id: Option<String>,
) -> ApiResponse<Vec<StockReconciliation>> {
    debug!(?product_id, "reconcile_stock command");

    let result = async {
        let reports = match product_id {
            Some(id) => vec![db.inner().ledger().reconcile(&id).await?],
            None => db.inner().ledger().reconcile_all().await?,
        };
        Ok::<_, ApiError>(reports)
    }
    .await;

    ApiResponse::from_result("reconcile_stock", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{seed_product, signed_in};

    fn change(product_id: &str, quantity: i64, note: &str) -> StockChangeRequest {
        StockChangeRequest {
            product_id: product_id.to_string(),
            quantity,
            note: note.to_string(),
        }
    }

    #[tokio::test]
    async fn test_restock_then_history() {
        let (db, session, config) = signed_in().await;
        let tee = seed_product(&db, &session, "Tee", 1000, 2).await;

        let movement = restock_product(&db, &session, &config, change(&tee.id, 8, "Delivery"))
            .await
            .into_result()
            .unwrap();
        assert_eq!(movement.product.stock_quantity, 10);
        assert!(movement.product.is_low_stock);

        let history = product_history(&db, &config, tee.id.clone(), None)
            .await
            .into_result()
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].note, "Delivery");

        let limited = product_history(&db, &config, tee.id, Some(1)).await.into_result().unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_adjust_below_zero_is_insufficient_stock() {
        let (db, session, config) = signed_in().await;
        let tee = seed_product(&db, &session, "Tee", 1000, 1).await;

        let res = adjust_stock(&db, &session, &config, change(&tee.id, -2, "Count")).await;
        assert_eq!(res.error.unwrap().code, ErrorCode::InsufficientStock);
    }

    #[tokio::test]
    async fn test_signed_out_restock_is_rejected() {
        let (db, session, config) = signed_in().await;
        let tee = seed_product(&db, &session, "Tee", 1000, 1).await;
        session.sign_out();

        let res = restock_product(&db, &session, &config, change(&tee.id, 1, "")).await;
        assert_eq!(res.error.unwrap().code, ErrorCode::AuthenticationError);
    }

    #[tokio::test]
    async fn test_reconcile_detects_direct_edit() {
        let (db, session, _config) = signed_in().await;
        let tee = seed_product(&db, &session, "Tee", 1000, 5).await;

        let clean = reconcile_stock(&db, None).await.into_result().unwrap();
        assert!(clean.is_empty());

        edit_counter_directly(&db, &tee.id, 9).await;

        let drift = reconcile_stock(&db, None).await.into_result().unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].drift, 4);

        let single = reconcile_stock(&db, Some(tee.id)).await.into_result().unwrap();
        assert_eq!(single[0].recorded_stock, 9);
    }

    /// Edits the counter through an unversioned patch, bypassing the ledger.
    async fn edit_counter_directly(db: &DbState, id: &str, stock: i64) {
        db.inner()
            .products()
            .update(
                id,
                &tally_core::ProductPatch {
                    stock_quantity: Some(stock),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
}
