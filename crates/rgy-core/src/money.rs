//! # Money
//!
//! Currency amounts in integer minor units. Pricing itself is an opaque
//! collaborator; this type only has to carry a cost from the pricing
//! function to the billing record without loss.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An amount of money in minor units (cents) of an ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Three-letter currency code, upper case.
    pub currency: String,
    /// Amount in minor units.
    pub minor_units: i64,
}

impl Money {
    /// Create an amount, validating the currency code.
    pub fn new(currency: &str, minor_units: i64) -> Result<Self, CoreError> {
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(CoreError::InvalidCurrency(currency.to_string()));
        }
        Ok(Self {
            currency: currency.to_string(),
            minor_units,
        })
    }

    /// A zero amount in the given currency.
    pub fn zero(currency: &str) -> Result<Self, CoreError> {
        Self::new(currency, 0)
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    /// Multiply by a whole number of years (per-year prices).
    pub fn times(&self, factor: u32) -> Self {
        Self {
            currency: self.currency.clone(),
            minor_units: self.minor_units.saturating_mul(i64::from(factor)),
        }
    }

    /// Add two amounts of the same currency.
    pub fn checked_add(&self, other: &Money) -> Result<Self, CoreError> {
        if self.currency != other.currency {
            return Err(CoreError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(Self {
            currency: self.currency.clone(),
            minor_units: self.minor_units.saturating_add(other.minor_units),
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let abs = self.minor_units.unsigned_abs();
        write!(f, "{} {sign}{}.{:02}", self.currency, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::new("USD", 800).unwrap().to_string(), "USD 8.00");
        assert_eq!(Money::new("USD", -5).unwrap().to_string(), "USD -0.05");
    }

    #[test]
    fn rejects_bad_currency() {
        assert!(Money::new("usd", 1).is_err());
        assert!(Money::new("DOLLAR", 1).is_err());
    }

    #[test]
    fn times_scales_per_year_price() {
        let yearly = Money::new("USD", 1300).unwrap();
        assert_eq!(yearly.times(3).minor_units, 3900);
    }

    #[test]
    fn add_requires_same_currency() {
        let usd = Money::new("USD", 100).unwrap();
        let jpy = Money::new("JPY", 100).unwrap();
        assert_eq!(usd.checked_add(&usd).unwrap().minor_units, 200);
        assert!(usd.checked_add(&jpy).is_err());
    }
}
