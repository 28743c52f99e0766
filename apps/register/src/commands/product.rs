//! # Product Commands
//!
//! Catalog listing, barcode lookup and operator edits.
//!
//! ## Edit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product form { "price": "12.50", "stock": "4", "onSale": true }       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  update_product(id, patch: serde_json::Value)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductPatch::from_json ── "12.5x"? ──► VALIDATION_ERROR              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductRepository::update ── stale version? ──► VERSION_CONFLICT      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiResponse<ProductDto>                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::{AppConfig, DbState, SessionState};
use tally_core::validation::{coerce_price, coerce_stock};
use tally_core::{NewProduct, Product, ProductCategory, ProductFilter, ProductPatch};

/// Product as the UI sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub category: ProductCategory,
    pub size: Option<String>,
    pub barcode: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub on_sale: bool,
    pub sale_price_cents: Option<i64>,
    /// Price charged at checkout (sale price when on sale).
    pub effective_price_cents: i64,
    pub stock_quantity: i64,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
    pub is_active: bool,
    pub version: i64,
}

impl ProductDto {
    pub fn from_product(p: Product, low_stock_threshold: i64) -> Self {
        ProductDto {
            effective_price_cents: p.effective_price().cents(),
            is_low_stock: p.is_low_stock(low_stock_threshold),
            is_out_of_stock: p.is_out_of_stock(),
            id: p.id,
            name: p.name,
            category: p.category,
            size: p.size,
            barcode: p.barcode,
            price_cents: p.price_cents,
            cost_cents: p.cost_cents,
            on_sale: p.on_sale,
            sale_price_cents: p.sale_price_cents,
            stock_quantity: p.stock_quantity,
            is_active: p.is_active,
            version: p.version,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListProductsRequest {
    pub category: Option<String>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

/// New product form. Money and stock arrive as loose JSON values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub price: Value,
    #[serde(default)]
    pub cost: Option<Value>,
    #[serde(default)]
    pub stock: Option<Value>,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub sale_price: Option<Value>,
}

impl CreateProductRequest {
    fn into_new_product(self) -> Result<NewProduct, ApiError> {
        let category: ProductCategory = self.category.parse()?;
        let mut data = NewProduct::new(self.name, category, coerce_price("price", &self.price)?);

        data.size = self.size;
        data.barcode = self.barcode;
        data.on_sale = self.on_sale;
        if let Some(cost) = self.cost.filter(|v| !v.is_null()) {
            data.cost_cents = Some(coerce_price("cost", &cost)?.cents());
        }
        if let Some(stock) = self.stock.filter(|v| !v.is_null()) {
            data.stock_quantity = coerce_stock(&stock)?;
        }
        if let Some(sale_price) = self.sale_price.filter(|v| !v.is_null()) {
            data.sale_price_cents = Some(coerce_price("sale_price", &sale_price)?.cents());
        }

        Ok(data)
    }
}

pub async fn list_products(
    db: &DbState,
    config: &AppConfig,
    request: ListProductsRequest,
) -> ApiResponse<Vec<ProductDto>> {
    debug!(?request, "list_products command");

    let result = async {
        let mut filter = ProductFilter::default();
        if let Some(category) = request.category.as_deref().filter(|c| !c.trim().is_empty()) {
            filter = filter.category(category.parse()?);
        }
        if let Some(search) = request.search {
            filter = filter.search(search);
        }
        if request.include_inactive {
            filter = filter.include_inactive();
        }

        let products = db.inner().products().list(&filter).await?;
        Ok::<_, ApiError>(
            products
                .into_iter()
                .map(|p| ProductDto::from_product(p, config.low_stock_threshold))
                .collect(),
        )
    }
    .await;

    ApiResponse::from_result("list_products", result)
}

pub async fn get_product(db: &DbState, config: &AppConfig, id: String) -> ApiResponse<ProductDto> {
    debug!(id = %id, "get_product command");

    let result = async {
        let product = db
            .inner()
            .products()
            .get_by_id(&id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", &id))?;
        Ok::<_, ApiError>(ProductDto::from_product(product, config.low_stock_threshold))
    }
    .await;

    ApiResponse::from_result("get_product", result)
}

/// Scanner lookup. A miss is `data: null`, not an error.
pub async fn get_product_by_barcode(
    db: &DbState,
    config: &AppConfig,
    barcode: String,
) -> ApiResponse<Option<ProductDto>> {
    let barcode = barcode.trim().to_string();
    debug!(barcode = %barcode, "get_product_by_barcode command");

    let result = db
        .inner()
        .products()
        .get_by_barcode(&barcode)
        .await
        .map(|found| found.map(|p| ProductDto::from_product(p, config.low_stock_threshold)));

    ApiResponse::from_result("get_product_by_barcode", result)
}

pub async fn create_product(
    db: &DbState,
    session: &SessionState,
    config: &AppConfig,
    request: CreateProductRequest,
) -> ApiResponse<ProductDto> {
    debug!(name = %request.name, "create_product command");
    let ctx = session.context();

    let result = async {
        let data = request.into_new_product()?;
        let product = db.inner().products().create(&ctx, &data).await?;
        info!(product_id = %product.id, "Product created");
        Ok::<_, ApiError>(ProductDto::from_product(product, config.low_stock_threshold))
    }
    .await;

    ApiResponse::from_result("create_product", result)
}

/// Applies a loose JSON patch (snake_case or camelCase keys).
pub async fn update_product(
    db: &DbState,
    config: &AppConfig,
    id: String,
    patch: Value,
) -> ApiResponse<ProductDto> {
    debug!(id = %id, "update_product command");

    let result = async {
        let patch = ProductPatch::from_json(&patch)?;
        let product = db.inner().products().update(&id, &patch).await?;
        Ok::<_, ApiError>(ProductDto::from_product(product, config.low_stock_threshold))
    }
    .await;

    ApiResponse::from_result("update_product", result)
}

/// Soft delete. Past sales keep their product name snapshot.
pub async fn delete_product(db: &DbState, id: String) -> ApiResponse<()> {
    debug!(id = %id, "delete_product command");
    let result = db.inner().products().soft_delete(&id).await;
    ApiResponse::from_result("delete_product", result)
}
