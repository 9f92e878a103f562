//! Cart models.
//!
//! A cart belongs to a user XOR an anonymous session token. It is mutable
//! until the commit engine converts it into an order, at which point it is
//! deleted in the same transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use altiplano_core::{CartId, CartLineId, UserId, VariantId};

/// A shopping cart.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a cart: a variant and a quantity, unique per variant.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub variant_id: VariantId,
    pub quantity: i32,
}

/// A cart line joined with the pricing data checkout needs.
#[derive(Debug, Clone, Serialize)]
pub struct PricedCartLine {
    pub variant_id: VariantId,
    pub sku: String,
    pub quantity: i32,
    /// Effective unit price: sale price if set, else list price.
    pub unit_price: Decimal,
}

impl PricedCartLine {
    /// Line subtotal (quantity x unit price).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Cart total: the sum of line subtotals.
#[must_use]
pub fn cart_total(lines: &[PricedCartLine]) -> Decimal {
    lines.iter().map(PricedCartLine::subtotal).sum()
}

/// The cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub lines: Vec<PricedCartLine>,
    pub total: Decimal,
    /// Present for anonymous carts so the client can persist the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(variant: i32, quantity: i32, unit_price: Decimal) -> PricedCartLine {
        PricedCartLine {
            variant_id: VariantId::new(variant),
            sku: format!("SKU-{variant}"),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn total_is_sum_of_line_subtotals() {
        let lines = vec![
            line(1, 2, Decimal::new(50_00, 2)),
            line(2, 3, Decimal::new(19_99, 2)),
        ];
        // 2 * 50.00 + 3 * 19.99 = 159.97
        assert_eq!(cart_total(&lines), Decimal::new(159_97, 2));
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(cart_total(&[]), Decimal::ZERO);
    }
}
