//! Price type for catalog amounts
//!
//! Wraps a `rust_decimal::Decimal` so repeated increase/decrease/revert cycles
//! never drift the way binary floating point would. A `Price` is never
//! negative.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A non-negative catalog price with native decimal precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting negative values
    pub fn new(value: Decimal) -> Result<Self, PriceError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PriceError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Create a price, flooring negative values at zero
    pub fn clamped(value: Decimal) -> Self {
        if value.is_sign_negative() {
            Self::zero()
        } else {
            Self(value)
        }
    }

    /// Create a price from a whole number of cents
    ///
    /// # Examples
    /// ```
    /// use price_ledger::models::Price;
    /// let price = Price::from_cents(1050); // 10.50
    /// assert_eq!(price.to_string(), "10.50");
    /// ```
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::new(cents as i64, 2))
    }

    /// A zero price
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal value
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the price is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a price from a string
    ///
    /// Accepts formats: "10.50", "$10.50", "10", "1,250.00"
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        let unsigned = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let cleaned: String = unsigned.chars().filter(|c| *c != ',').collect();

        let value = Decimal::from_str(&cleaned)
            .map_err(|_| PriceError::InvalidFormat(s.to_string()))?;
        Self::new(value)
    }

    /// Format with a currency symbol, showing at least two decimal places
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        format!("{}{}", symbol, self)
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut shown = self.0.normalize();
        if shown.scale() < 2 {
            shown.rescale(2);
        }
        write!(f, "{}", shown)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// Error type for price construction and parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    InvalidFormat(String),
    Negative(Decimal),
}

impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceError::InvalidFormat(s) => write!(f, "Invalid price format: {}", s),
            PriceError::Negative(v) => write!(f, "Price cannot be negative: {}", v),
        }
    }
}

impl std::error::Error for PriceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let p = Price::from_cents(1050);
        assert_eq!(p.value(), Decimal::new(1050, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(1050).to_string(), "10.50");
        assert_eq!(Price::zero().to_string(), "0.00");
        assert_eq!(Price::parse("12.345").unwrap().to_string(), "12.345");
        assert_eq!(Price::parse("110.0000").unwrap().to_string(), "110.00");
        assert_eq!(Price::from_cents(500).format_with_symbol("$"), "$5.00");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Price::parse("10.50").unwrap(), Price::from_cents(1050));
        assert_eq!(Price::parse("$10.50").unwrap(), Price::from_cents(1050));
        assert_eq!(Price::parse("10").unwrap(), Price::from_cents(1000));
        assert_eq!(Price::parse("1,250.00").unwrap(), Price::from_cents(125000));
        assert!(matches!(
            Price::parse("abc"),
            Err(PriceError::InvalidFormat(_))
        ));
        assert!(matches!(Price::parse("-1"), Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_clamped() {
        assert_eq!(Price::clamped(Decimal::new(-50, 0)), Price::zero());
        assert_eq!(Price::clamped(Decimal::new(5, 0)), Price::from_cents(500));
    }

    #[test]
    fn test_equality_ignores_scale() {
        assert_eq!(Price::parse("110").unwrap(), Price::parse("110.0000").unwrap());
    }

    #[test]
    fn test_serialization_rejects_negative() {
        let p = Price::from_cents(1999);
        let json = serde_json::to_string(&p).unwrap();
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);

        assert!(serde_json::from_str::<Price>("\"-3.00\"").is_err());
    }
}
