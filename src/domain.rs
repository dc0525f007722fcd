//! Value types shared by the service aggregators.
//!
//! These mirror the messages the services already exchange. Aggregators only
//! read them; nothing here validates business rules.

use crate::dimension::key_or_unknown;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Nanos per unit of [`Money`].
const NANOS_PER_UNIT: f64 = 1_000_000_000.0;

/// An amount of money in one currency.
///
/// `units` is the whole part, `nanos` the fractional part in billionths;
/// both carry the sign of the amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// ISO 4217 code, e.g. `USD`.
    pub currency_code: String,
    pub units: i64,
    pub nanos: i32,
}

impl Money {
    pub fn new(currency_code: impl Into<String>, units: i64, nanos: i32) -> Self {
        Self {
            currency_code: currency_code.into(),
            units,
            nanos,
        }
    }

    /// The amount as a float: `units + nanos / 1e9`.
    ///
    /// ```rust
    /// use riepilogo::domain::Money;
    ///
    /// assert_eq!(Money::new("USD", 12, 990_000_000).amount(), 12.99);
    /// ```
    pub fn amount(&self) -> f64 {
        self.units as f64 + self.nanos as f64 / NANOS_PER_UNIT
    }

    /// Currency code, or `"unknown"` when blank.
    pub fn currency(&self) -> &str {
        key_or_unknown(Some(&self.currency_code))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount(), self.currency())
    }
}

/// A postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: i32,
}

impl Address {
    /// The region used for breakdowns: the state, or `"unknown"` when blank.
    pub fn region(&self) -> &str {
        key_or_unknown(Some(&self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_amount() {
        assert_eq!(Money::new("EUR", 0, 500_000_000).amount(), 0.5);
        assert_eq!(Money::new("EUR", -3, -250_000_000).amount(), -3.25);
        assert_eq!(Money::default().amount(), 0.0);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new("USD", 7, 50_000_000).to_string(), "7.05 USD");
        assert_eq!(Money::new("", 1, 0).to_string(), "1.00 unknown");
    }

    #[test]
    fn test_address_region() {
        let mut address = Address {
            state: "CA".into(),
            country: "US".into(),
            ..Default::default()
        };
        assert_eq!(address.region(), "CA");

        address.state = " ".into();
        assert_eq!(address.region(), "unknown");
    }
}
