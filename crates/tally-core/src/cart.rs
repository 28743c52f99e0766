//! # Cart
//!
//! The checkout payload: an ordered list of product/quantity/price lines.
//!
//! The cart is built by the UI and handed to the sale orchestrator in one
//! piece. Prices captured here are what the customer was shown; the store
//! layer recomputes every line total from them and never trusts a
//! client-computed total.
//!
//! ```text
//! CartLine { p-1, qty 2, 12.50 } ──► line total 25.00 ┐
//! CartLine { p-2, qty 1,  4.99 } ──► line total  4.99 ├──► sale total 29.99
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::validate_price_cents;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// One requested line of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price captured when the item was added to the cart.
    pub unit_price_cents: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: unit_price.cents(),
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// unit price × quantity in integer cents.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }
        if self.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        if self.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: self.quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        validate_price_cents("unit_price", self.unit_price_cents)?;
        Ok(())
    }
}

/// An ordered checkout cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Cart { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line totals. Call [`Cart::validate`] first for overflow-checked math.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Checks every cart rule and returns the exact total.
    ///
    /// ## Rules
    /// - At least one line (`EmptyCart`)
    /// - At most `MAX_CART_ITEMS` lines (`CartTooLarge`)
    /// - Each quantity in 1..=`MAX_ITEM_QUANTITY`
    /// - Each unit price ≥ 0
    pub fn validate(&self) -> CoreResult<Money> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        if self.lines.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let mut total = Money::zero();
        for line in &self.lines {
            line.validate()?;
            total = line
                .unit_price()
                .checked_multiply_quantity(line.quantity)
                .and_then(|lt| total.checked_add(lt))
                .ok_or_else(|| ValidationError::invalid_format("total", "amount overflow"))?;
        }

        Ok(total)
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Cart::new(lines)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
