//! # Validation Module
//!
//! Input validation and coercion for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Register UI (excluded)                                       │
//! │  └── Sends loose JSON: prices as numbers or "12.50" strings            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Command / repository entry (Rust)                            │
//! │  ├── Coercion: serde_json::Value → cents / integer stock               │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock_quantity >= 0), CHECK (quantity_delta <> 0)          │
//! │  ├── Partial UNIQUE index on active barcodes                           │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{coerce_price, validate_quantity};
//! use serde_json::json;
//!
//! validate_quantity(5).unwrap();
//! assert_eq!(coerce_price("price", &json!("12.50")).unwrap().cents(), 1250);
//! assert!(coerce_price("price", &json!("twelve")).is_err());
//! ```

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{NewProduct, ProductCategory, ProductPatch};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_BARCODE_LEN: usize = 64;
const MAX_SIZE_LEN: usize = 20;
const MAX_NOTE_LEN: usize = 500;
const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Linen Shirt").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a barcode (EAN/UPC or a shop-internal code).
///
/// ## Rules
/// - 1 to 64 characters after trimming
/// - Letters, digits and hyphens only
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::invalid_format(
            "barcode",
            "must contain only letters, digits and hyphens",
        ));
    }

    Ok(())
}

pub fn validate_size(size: &str) -> ValidationResult<()> {
    if size.trim().chars().count() > MAX_SIZE_LEN {
        return Err(ValidationError::TooLong {
            field: "size".to_string(),
            max: MAX_SIZE_LEN,
        });
    }
    Ok(())
}

/// Validates a free-text ledger note.
pub fn validate_note(note: &str) -> ValidationResult<()> {
    if note.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        });
    }
    Ok(())
}

/// Validates a search query.
///
/// Empty is fine (no filtering). Returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok(query.to_string())
}

/// Trims an optional string, mapping blank to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in cents for `field`.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("price", 1099).is_ok());
/// assert!(validate_price_cents("price", 0).is_ok());     // Free item
/// assert!(validate_price_cents("price", -100).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an absolute stock level.
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock_quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Ledger deltas are signed but never zero.
pub fn validate_ledger_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "quantity_delta".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id)
        .map_err(|_| ValidationError::invalid_format("id", "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Product Input
// =============================================================================

/// Validates and normalizes a product creation request.
///
/// Trims text fields and turns blank optional strings into `None`.
pub fn validate_new_product(data: &NewProduct) -> ValidationResult<NewProduct> {
    validate_product_name(&data.name)?;
    validate_price_cents("price", data.price_cents)?;
    if let Some(cost) = data.cost_cents {
        validate_price_cents("cost", cost)?;
    }
    if let Some(sale_price) = data.sale_price_cents {
        validate_price_cents("sale_price", sale_price)?;
    }
    validate_stock_quantity(data.stock_quantity)?;

    let barcode = normalize_optional(data.barcode.as_deref());
    if let Some(code) = &barcode {
        validate_barcode(code)?;
    }
    let size = normalize_optional(data.size.as_deref());
    if let Some(size) = &size {
        validate_size(size)?;
    }

    Ok(NewProduct {
        name: data.name.trim().to_string(),
        barcode,
        size,
        ..data.clone()
    })
}

// =============================================================================
// Loose Value Coercion
// =============================================================================

/// Coerces a JSON number or numeric string (major units) into non-negative Money.
///
/// Accepts `12`, `12.5`, `"12.50"`. Rejects negatives, more than two decimals
/// and anything non-numeric.
pub fn coerce_price(field: &str, value: &Value) -> ValidationResult<Money> {
    let money = match value {
        Value::Number(n) => {
            if let Some(whole) = n.as_i64() {
                whole
                    .checked_mul(100)
                    .map(Money::from_cents)
                    .ok_or_else(|| ValidationError::invalid_format(field, "value is too large"))?
            } else if let Some(amount) = n.as_f64() {
                let scaled = amount * 100.0;
                if (scaled - scaled.round()).abs() > 1e-6 {
                    return Err(ValidationError::invalid_format(
                        field,
                        "at most two decimal places are allowed",
                    ));
                }
                Money::from_float_amount(amount).map_err(|e| rename_field(e, field))?
            } else {
                return Err(ValidationError::invalid_format(field, "value is too large"));
            }
        }
        Value::String(s) if s.trim().is_empty() => {
            return Err(ValidationError::Required {
                field: field.to_string(),
            })
        }
        Value::String(s) => Money::parse_decimal(s).map_err(|e| rename_field(e, field))?,
        Value::Null => {
            return Err(ValidationError::Required {
                field: field.to_string(),
            })
        }
        _ => return Err(ValidationError::invalid_format(field, "must be a number")),
    };

    validate_price_cents(field, money.cents())?;
    Ok(money)
}

/// Coerces a JSON integer or integer string into a non-negative stock level.
pub fn coerce_stock(value: &Value) -> ValidationResult<i64> {
    const FIELD: &str = "stock_quantity";

    let qty = match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => f as i64,
            _ => return Err(ValidationError::invalid_format(FIELD, "must be a whole number")),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::invalid_format(FIELD, "must be a whole number"))?,
        Value::Null => {
            return Err(ValidationError::Required {
                field: FIELD.to_string(),
            })
        }
        _ => return Err(ValidationError::invalid_format(FIELD, "must be a whole number")),
    };

    validate_stock_quantity(qty)?;
    Ok(qty)
}

fn rename_field(err: ValidationError, field: &str) -> ValidationError {
    match err {
        ValidationError::InvalidFormat { reason, .. } => ValidationError::invalid_format(field, reason),
        other => other,
    }
}

fn coerce_string(field: &str, value: &Value) -> ValidationResult<String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Null => Err(ValidationError::Required {
            field: field.to_string(),
        }),
        _ => Err(ValidationError::invalid_format(field, "must be a string")),
    }
}

/// `null` or blank clears the column.
fn coerce_nullable_string(field: &str, value: &Value) -> ValidationResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(normalize_optional(Some(s))),
        _ => Err(ValidationError::invalid_format(field, "must be a string or null")),
    }
}

fn coerce_nullable_price(field: &str, value: &Value) -> ValidationResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        other => coerce_price(field, other).map(|m| Some(m.cents())),
    }
}

fn coerce_bool(field: &str, value: &Value) -> ValidationResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ValidationError::invalid_format(field, "must be true or false")),
        },
        _ => Err(ValidationError::invalid_format(field, "must be true or false")),
    }
}

impl ProductPatch {
    /// Builds a patch from the loose object the register UI submits.
    ///
    /// Keys may be snake_case or camelCase. Prices are in major units
    /// (`price`, `cost`, `salePrice`); `null` clears nullable columns.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::ProductPatch;
    /// use serde_json::json;
    ///
    /// let patch = ProductPatch::from_json(&json!({ "price": "19.90", "stockQuantity": "4" })).unwrap();
    /// assert_eq!(patch.price_cents, Some(1990));
    /// assert_eq!(patch.stock_quantity, Some(4));
    ///
    /// assert!(ProductPatch::from_json(&json!({ "price": "abc" })).is_err());
    /// ```
    pub fn from_json(value: &Value) -> ValidationResult<ProductPatch> {
        let object: &Map<String, Value> = value
            .as_object()
            .ok_or_else(|| ValidationError::invalid_format("patch", "must be a JSON object"))?;

        let mut patch = ProductPatch::default();

        for (key, value) in object {
            match key.as_str() {
                "name" => {
                    let name = coerce_string("name", value)?;
                    validate_product_name(&name)?;
                    patch.name = Some(name);
                }
                "category" => {
                    let raw = coerce_string("category", value)?;
                    patch.category = Some(raw.parse::<ProductCategory>()?);
                }
                "size" => {
                    let size = coerce_nullable_string("size", value)?;
                    if let Some(s) = &size {
                        validate_size(s)?;
                    }
                    patch.size = Some(size);
                }
                "barcode" => {
                    let barcode = coerce_nullable_string("barcode", value)?;
                    if let Some(code) = &barcode {
                        validate_barcode(code)?;
                    }
                    patch.barcode = Some(barcode);
                }
                "price" => patch.price_cents = Some(coerce_price("price", value)?.cents()),
                "cost" => patch.cost_cents = Some(coerce_nullable_price("cost", value)?),
                "stock_quantity" | "stockQuantity" | "stock" => {
                    patch.stock_quantity = Some(coerce_stock(value)?)
                }
                "on_sale" | "onSale" => patch.on_sale = Some(coerce_bool("on_sale", value)?),
                "sale_price" | "salePrice" => {
                    patch.sale_price_cents = Some(coerce_nullable_price("sale_price", value)?)
                }
                "expected_version" | "expectedVersion" | "version" => {
                    patch.expected_version = Some(value.as_i64().ok_or_else(|| {
                        ValidationError::invalid_format("version", "must be an integer")
                    })?)
                }
                // Identity and bookkeeping columns are never patchable.
                "id" | "created_at" | "createdAt" | "updated_at" | "updatedAt" => {}
                other => {
                    return Err(ValidationError::invalid_format(
                        other,
                        "is not an editable product field",
                    ))
                }
            }
        }

        Ok(patch)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Linen Shirt").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("4006381333931").is_ok());
        assert!(validate_barcode("TS-0042").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("has space").is_err());
        assert!(validate_barcode(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_ledger_delta() {
        assert!(validate_ledger_delta(-3).is_ok());
        assert!(validate_ledger_delta(4).is_ok());
        assert!(matches!(
            validate_ledger_delta(0),
            Err(ValidationError::MustBeNonZero { .. })
        ));
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }

    #[test]
    fn test_coerce_price() {
        assert_eq!(coerce_price("price", &json!(12)).unwrap().cents(), 1200);
        assert_eq!(coerce_price("price", &json!(12.5)).unwrap().cents(), 1250);
        assert_eq!(coerce_price("price", &json!(" 0.99 ")).unwrap().cents(), 99);

        assert!(coerce_price("price", &json!(-1)).is_err());
        assert!(coerce_price("price", &json!("-1.00")).is_err());
        assert!(coerce_price("price", &json!(1.234)).is_err());
        assert!(coerce_price("price", &json!("")).is_err());
        assert!(coerce_price("price", &json!(true)).is_err());
    }

    #[test]
    fn test_coerce_price_reports_field_name() {
        let err = coerce_price("cost", &json!("abc")).unwrap_err();
        assert!(err.to_string().starts_with("cost"));
    }

    #[test]
    fn test_coerce_stock() {
        assert_eq!(coerce_stock(&json!(7)).unwrap(), 7);
        assert_eq!(coerce_stock(&json!("12")).unwrap(), 12);
        assert_eq!(coerce_stock(&json!(3.0)).unwrap(), 3);

        assert!(coerce_stock(&json!(-1)).is_err());
        assert!(coerce_stock(&json!(2.5)).is_err());
        assert!(coerce_stock(&json!("many")).is_err());
        assert!(coerce_stock(&Value::Null).is_err());
    }

    #[test]
    fn test_validate_new_product_normalizes() {
        let mut data = NewProduct::new("  Denim Jacket ", ProductCategory::Outerwear, Money::from_cents(8900));
        data.barcode = Some("   ".to_string());
        let normalized = validate_new_product(&data).unwrap();
        assert_eq!(normalized.name, "Denim Jacket");
        assert_eq!(normalized.barcode, None);

        let negative = NewProduct::new("Scarf", ProductCategory::Accessories, Money::from_cents(-1));
        assert!(validate_new_product(&negative).is_err());
    }

    #[test]
    fn test_patch_from_json_mixed_keys() {
        let patch = ProductPatch::from_json(&json!({
            "name": "Wool Scarf",
            "category": "accessories",
            "cost": null,
            "on_sale": "true",
            "salePrice": 9.5,
            "expectedVersion": 3,
        }))
        .unwrap();

        assert_eq!(patch.name.as_deref(), Some("Wool Scarf"));
        assert_eq!(patch.category, Some(ProductCategory::Accessories));
        assert_eq!(patch.cost_cents, Some(None));
        assert_eq!(patch.on_sale, Some(true));
        assert_eq!(patch.sale_price_cents, Some(Some(950)));
        assert_eq!(patch.expected_version, Some(3));
        assert!(patch.stock_quantity.is_none());
    }

    #[test]
    fn test_patch_from_json_rejects_bad_input() {
        assert!(ProductPatch::from_json(&json!([1, 2])).is_err());
        assert!(ProductPatch::from_json(&json!({ "stockQuantity": "-2" })).is_err());
        assert!(ProductPatch::from_json(&json!({ "category": "groceries" })).is_err());
        assert!(ProductPatch::from_json(&json!({ "name": "" })).is_err());
        assert!(ProductPatch::from_json(&json!({ "is_active": false })).is_err());
    }
}
