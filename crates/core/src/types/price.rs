//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A price with currency information.
///
/// Amounts are stored in the currency's standard unit (e.g. bolivianos, not
/// centavos). The payment gateway is billed in minor units, see
/// [`Price::minor_units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Amount in the smallest currency unit (centavos/cents), for gateway
    /// charge intents.
    ///
    /// Returns `None` if the amount does not fit in an `i64`, which in practice happens
    /// only for corrupt data.
    #[must_use]
    pub fn minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED).round_dp(0).to_i64()
    }
}

/// ISO 4217 currency codes accepted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BOB,
    USD,
}

impl CurrencyCode {
    /// Lowercase code as the payment gateway expects it.
    #[must_use]
    pub const fn gateway_code(self) -> &'static str {
        match self {
            Self::BOB => "bob",
            Self::USD => "usd",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_scales_to_centavos() {
        let price = Price::new(Decimal::new(19_99, 2), CurrencyCode::BOB);
        assert_eq!(price.minor_units(), Some(1999));
    }

    #[test]
    fn minor_units_rounds_sub_centavo_amounts() {
        let price = Price::new(Decimal::new(10_005, 3), CurrencyCode::USD);
        assert_eq!(price.minor_units(), Some(1001));
    }
}
