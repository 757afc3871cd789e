//! # Cart Types
//!
//! Cart lines as submitted by the storefront, and the checkout attempt that
//! wraps them.

use crate::error::{CheckoutError, CheckoutResult};
use crate::idempotency::IdempotencyKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default upper bound for a single line's quantity
pub const DEFAULT_MAX_QUANTITY: u32 = 10;

/// A line in the submitted cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Storefront product identifier
    pub product_id: String,

    /// Product name shown on the hosted page
    pub name: String,

    /// Unit price in the smallest currency unit
    pub unit_price_minor_units: i64,

    /// Quantity (1..=max)
    pub quantity: u32,
}

impl CartLine {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price_minor_units: i64,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price_minor_units,
            quantity,
        }
    }

    /// Line total in minor units
    pub fn total_minor_units(&self) -> i64 {
        self.unit_price_minor_units * i64::from(self.quantity)
    }
}

/// Bounds applied to every submitted line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLimits {
    pub max_quantity: u32,
}

impl Default for CartLimits {
    fn default() -> Self {
        Self {
            max_quantity: DEFAULT_MAX_QUANTITY,
        }
    }
}

impl CartLimits {
    /// Check a cart before anything leaves the process.
    pub fn validate(&self, lines: &[CartLine]) -> CheckoutResult<()> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        for (index, line) in lines.iter().enumerate() {
            if line.name.trim().is_empty() {
                return Err(CheckoutError::InvalidLine {
                    index,
                    reason: "name is empty".to_string(),
                });
            }
            if line.unit_price_minor_units <= 0 {
                return Err(CheckoutError::InvalidLine {
                    index,
                    reason: format!(
                        "unit price must be positive, got {}",
                        line.unit_price_minor_units
                    ),
                });
            }
            if line.quantity < 1 || line.quantity > self.max_quantity {
                return Err(CheckoutError::InvalidLine {
                    index,
                    reason: format!(
                        "quantity must be between 1 and {}, got {}",
                        self.max_quantity, line.quantity
                    ),
                });
            }
            if line
                .unit_price_minor_units
                .checked_mul(i64::from(line.quantity))
                .is_none()
            {
                return Err(CheckoutError::InvalidLine {
                    index,
                    reason: "line total overflows".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Sum of all line totals in minor units
pub fn cart_total_minor_units(lines: &[CartLine]) -> i64 {
    lines.iter().map(CartLine::total_minor_units).sum()
}

/// One user-initiated checkout. Maps to at most one processor session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutAttempt {
    pub idempotency_key: IdempotencyKey,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
}

impl CheckoutAttempt {
    pub fn new(idempotency_key: IdempotencyKey, lines: Vec<CartLine>) -> Self {
        Self {
            idempotency_key,
            lines,
            created_at: Utc::now(),
        }
    }

    /// Business order reference recorded on the processor session.
    ///
    /// One attempt is one order, so the attempt key doubles as the order id.
    pub fn order_reference(&self) -> &str {
        self.idempotency_key.as_str()
    }

    pub fn total_minor_units(&self) -> i64 {
        cart_total_minor_units(&self.lines)
    }
}

/// The storefront's fixed cart (there is no catalog).
///
/// Loaded from `config/cart.toml` when present:
///
/// ```toml
/// [[lines]]
/// productId = "1"
/// name = "Shoes"
/// unitPriceMinorUnits = 200000
/// quantity = 2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoCart {
    pub lines: Vec<CartLine>,
}

impl DemoCart {
    /// Load from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

impl Default for DemoCart {
    fn default() -> Self {
        Self {
            lines: vec![
                CartLine::new("1", "Shoes", 200_000, 2),
                CartLine::new("2", "Shirts", 100_000, 3),
                CartLine::new("3", "Jeans", 600_000, 3),
            ],
        }
    }
}
