//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │   SaleLine      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  sale_id (FK)   │       │
//! │  │  barcode        │◄──┤  cashier_id     │──►│  product_id     │       │
//! │  │  price_cents    │   │  total_cents    │   │  product_name   │       │
//! │  │  stock_quantity │   │  payment_method │   │  line_total     │       │
//! │  │  version        │   └─────────────────┘   └─────────────────┘       │
//! │  └────────▲────────┘                                                    │
//! │           │ product_id (no back-reference, no cascade)                  │
//! │  ┌────────┴────────┐   ┌─────────────────┐                              │
//! │  │  LedgerEntry    │   │      User       │                              │
//! │  │  ─────────────  │   │  ─────────────  │                              │
//! │  │  kind           │   │  display_name   │                              │
//! │  │  quantity_delta │──►│  role           │                              │
//! │  │  sale_id?       │   └─────────────────┘                              │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales, sale lines and ledger entries are immutable once written. Products
//! are never physically deleted, only deactivated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product Category
// =============================================================================

/// The fixed set of catalog categories.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Tops,
    Bottoms,
    Dresses,
    Outerwear,
    Footwear,
    Accessories,
}

impl ProductCategory {
    /// Every category, in display order.
    pub const ALL: [ProductCategory; 6] = [
        ProductCategory::Tops,
        ProductCategory::Bottoms,
        ProductCategory::Dresses,
        ProductCategory::Outerwear,
        ProductCategory::Footwear,
        ProductCategory::Accessories,
    ];

    /// Returns the stored/serialized name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Tops => "tops",
            ProductCategory::Bottoms => "bottoms",
            ProductCategory::Dresses => "dresses",
            ProductCategory::Outerwear => "outerwear",
            ProductCategory::Footwear => "footwear",
            ProductCategory::Accessories => "accessories",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ProductCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: ProductCategory::ALL
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and snapshotted onto sale lines.
    pub name: String,

    pub category: ProductCategory,

    /// Free-form size label ("M", "42", "One size").
    pub size: Option<String>,

    /// Barcode; unique among active products only.
    pub barcode: Option<String>,

    /// Regular price in cents.
    pub price_cents: i64,

    /// Cost in cents (for inventory valuation at cost).
    pub cost_cents: Option<i64>,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// Whether the sale price currently applies.
    pub on_sale: bool,

    /// Discounted price in cents, used while `on_sale` is set.
    pub sale_price_cents: Option<i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency token, bumped on every mutation.
    pub version: i64,
}

impl Product {
    /// Returns the regular price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost price, if recorded.
    #[inline]
    pub fn cost(&self) -> Option<Money> {
        self.cost_cents.map(Money::from_cents)
    }

    /// The price a cart should capture right now.
    pub fn effective_price(&self) -> Money {
        match (self.on_sale, self.sale_price_cents) {
            (true, Some(cents)) => Money::from_cents(cents),
            _ => self.price(),
        }
    }

    /// In stock but at or below `threshold` units.
    #[inline]
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock_quantity > 0 && self.stock_quantity <= threshold
    }

    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity == 0
    }

    /// Checks whether `quantity` units can be sold from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock_quantity >= quantity
    }
}

/// Input for creating a product.
///
/// `stock_quantity` defaults to 0 when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub category: ProductCategory,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: Option<i64>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub sale_price_cents: Option<i64>,
}

impl NewProduct {
    /// Minimal product input: name, category and price.
    pub fn new(name: impl Into<String>, category: ProductCategory, price: Money) -> Self {
        NewProduct {
            name: name.into(),
            category,
            size: None,
            barcode: None,
            price_cents: price.cents(),
            cost_cents: None,
            stock_quantity: 0,
            on_sale: false,
            sale_price_cents: None,
        }
    }

    pub fn with_stock(mut self, quantity: i64) -> Self {
        self.stock_quantity = quantity;
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_cost(mut self, cost: Money) -> Self {
        self.cost_cents = Some(cost.cents());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }
}

/// A partial product update. `None` leaves the column unchanged.
///
/// Nullable columns use `Option<Option<_>>`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<ProductCategory>,
    pub size: Option<Option<String>>,
    pub barcode: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<Option<i64>>,
    pub stock_quantity: Option<i64>,
    pub on_sale: Option<bool>,
    pub sale_price_cents: Option<Option<i64>>,
    /// When set, the update only applies if the stored version matches.
    pub expected_version: Option<i64>,
}

impl ProductPatch {
    /// True when no column would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.size.is_none()
            && self.barcode.is_none()
            && self.price_cents.is_none()
            && self.cost_cents.is_none()
            && self.stock_quantity.is_none()
            && self.on_sale.is_none()
            && self.sale_price_cents.is_none()
    }

    /// Applies the patch to a product in memory.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(size) = &self.size {
            product.size = size.clone();
        }
        if let Some(barcode) = &self.barcode {
            product.barcode = barcode.clone();
        }
        if let Some(price) = self.price_cents {
            product.price_cents = price;
        }
        if let Some(cost) = self.cost_cents {
            product.cost_cents = cost;
        }
        if let Some(stock) = self.stock_quantity {
            product.stock_quantity = stock;
        }
        if let Some(on_sale) = self.on_sale {
            product.on_sale = on_sale;
        }
        if let Some(sale_price) = self.sale_price_cents {
            product.sale_price_cents = sale_price;
        }
    }
}

/// Filter for product listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    /// Exact category match.
    #[serde(default)]
    pub category: Option<ProductCategory>,
    /// Case-insensitive substring over name or barcode.
    #[serde(default)]
    pub search: Option<String>,
    /// Only active products (default true).
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            category: None,
            search: None,
            active_only: true,
        }
    }
}

impl ProductFilter {
    pub fn category(mut self, category: ProductCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn include_inactive(mut self) -> Self {
        self.active_only = false;
        self
    }
}

// =============================================================================
// Users
// =============================================================================

/// Role of a register user.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Cashier,
}

/// A person who can act on the register.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub role: UserRole,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Bank transfer.
    Transfer,
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" | "bank_transfer" => Ok(PaymentMethod::Transfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec!["cash".to_string(), "transfer".to_string()],
            }),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed checkout. Immutable once written.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Acting user who rang up the sale.
    pub cashier_id: String,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line of a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// unit_price × quantity, computed by the store layer.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// Sale row joined with the cashier's display name.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleWithCashier {
    pub id: String,
    pub cashier_id: String,
    pub cashier_name: String,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sale with its lines and cashier name, as read for receipts and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub cashier_name: String,
    pub lines: Vec<SaleLine>,
}

// =============================================================================
// Inventory Ledger
// =============================================================================

/// Kind of stock-affecting event.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Sale,
    Restock,
    Adjustment,
}

/// An immutable audit record of a stock-quantity change.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub product_id: String,
    pub kind: LedgerEntryKind,
    /// Negative for sales, positive for restocks, either for adjustments.
    pub quantity_delta: i64,
    /// Acting user.
    pub user_id: String,
    pub note: String,
    /// Sale this entry belongs to, for `Sale` entries.
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for appending to the ledger. The acting user and timestamp are
/// assigned by the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub product_id: String,
    pub kind: LedgerEntryKind,
    pub quantity_delta: i64,
    pub note: String,
    pub sale_id: Option<String>,
}

impl NewLedgerEntry {
    pub fn restock(product_id: impl Into<String>, quantity: i64, note: impl Into<String>) -> Self {
        NewLedgerEntry {
            product_id: product_id.into(),
            kind: LedgerEntryKind::Restock,
            quantity_delta: quantity,
            note: note.into(),
            sale_id: None,
        }
    }

    pub fn adjustment(product_id: impl Into<String>, delta: i64, note: impl Into<String>) -> Self {
        NewLedgerEntry {
            product_id: product_id.into(),
            kind: LedgerEntryKind::Adjustment,
            quantity_delta: delta,
            note: note.into(),
            sale_id: None,
        }
    }

    /// A sale entry: delta is `-quantity`, note references the sale.
    pub fn sale(product_id: impl Into<String>, quantity: i64, sale_id: &str) -> Self {
        NewLedgerEntry {
            product_id: product_id.into(),
            kind: LedgerEntryKind::Sale,
            quantity_delta: -quantity,
            note: format!("Sale {}", sale_id),
            sale_id: Some(sale_id.to_string()),
        }
    }
}

/// Result of comparing a product's stored counter with its ledger sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockReconciliation {
    pub product_id: String,
    pub product_name: String,
    /// Counter stored on the product row.
    pub recorded_stock: i64,
    /// Σ quantity_delta over the product's ledger entries.
    pub ledger_stock: i64,
    /// recorded_stock - ledger_stock.
    pub drift: i64,
}

impl StockReconciliation {
    pub fn new(product: &Product, ledger_stock: i64) -> Self {
        StockReconciliation {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            recorded_stock: product.stock_quantity,
            ledger_stock,
            drift: product.stock_quantity - ledger_stock,
        }
    }

    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            name: "Linen Shirt".to_string(),
            category: ProductCategory::Tops,
            size: Some("M".to_string()),
            barcode: Some("4006381333931".to_string()),
            price_cents: 2500,
            cost_cents: Some(1200),
            stock_quantity: stock,
            is_active: true,
            on_sale: false,
            sale_price_cents: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    #[test]
    fn test_category_round_trip_through_str() {
        assert_eq!("Tops".parse::<ProductCategory>().unwrap(), ProductCategory::Tops);
        assert_eq!(ProductCategory::Footwear.to_string(), "footwear");
        assert!("groceries".parse::<ProductCategory>().is_err());
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("CASH".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::Transfer);
        assert!("card".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_effective_price_uses_sale_price_only_when_on_sale() {
        let mut product = sample_product(5);
        product.sale_price_cents = Some(1999);
        assert_eq!(product.effective_price().cents(), 2500);

        product.on_sale = true;
        assert_eq!(product.effective_price().cents(), 1999);
    }

    #[test]
    fn test_stock_flags() {
        assert!(sample_product(0).is_out_of_stock());
        assert!(!sample_product(0).is_low_stock(10));
        assert!(sample_product(10).is_low_stock(10));
        assert!(!sample_product(11).is_low_stock(10));
    }

    #[test]
    fn test_patch_apply_and_clear() {
        let mut product = sample_product(5);
        let patch = ProductPatch {
            price_cents: Some(3000),
            barcode: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut product);
        assert_eq!(product.price_cents, 3000);
        assert_eq!(product.barcode, None);
        assert_eq!(product.name, "Linen Shirt");
    }

    #[test]
    fn test_sale_ledger_entry_is_negative() {
        let entry = NewLedgerEntry::sale("p-1", 3, "s-1");
        assert_eq!(entry.quantity_delta, -3);
        assert_eq!(entry.kind, LedgerEntryKind::Sale);
        assert_eq!(entry.note, "Sale s-1");
        assert_eq!(entry.sale_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn test_reconciliation_drift() {
        let product = sample_product(7);
        let rec = StockReconciliation::new(&product, 10);
        assert_eq!(rec.drift, -3);
        assert!(!rec.is_consistent());
    }

    #[test]
    fn test_filter_defaults_to_active_only() {
        let filter: ProductFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.active_only);
        assert!(ProductFilter::default().active_only);
    }
}
