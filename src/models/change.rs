//! Change specifications and the price delta
//!
//! A `ChangeSpecification` describes one bulk price change. It owns both the
//! per-price arithmetic and the selection predicate, so preview and apply can
//! never disagree about which services a change touches.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::catalog::{EntryFilter, ServiceCatalogEntry};
use super::ids::CategoryId;
use super::price::Price;

/// Direction of a price change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Increase,
    Decrease,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Increase => write!(f, "Increase"),
            ChangeKind::Decrease => write!(f, "Decrease"),
        }
    }
}

impl FromStr for ChangeKind {
    type Err = ChangeValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "increase" | "inc" | "up" => Ok(ChangeKind::Increase),
            "decrease" | "dec" | "down" => Ok(ChangeKind::Decrease),
            other => Err(ChangeValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// A strictly positive change amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Create an amount; zero and negative values are rejected
    pub fn new(value: Decimal) -> Result<Self, ChangeValidationError> {
        if value <= Decimal::ZERO {
            return Err(ChangeValidationError::NonPositiveAmount(value));
        }
        Ok(Self(value))
    }

    /// Parse an amount, accepting an optional leading `$` or trailing `%`
    pub fn parse(s: &str) -> Result<Self, ChangeValidationError> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed);
        let value = Decimal::from_str(trimmed.trim())
            .map_err(|_| ChangeValidationError::InvalidAmount(s.to_string()))?;
        Self::new(value)
    }

    /// The underlying decimal value
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ChangeValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// One bulk price change, as requested by an operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSpecification {
    pub kind: ChangeKind,
    pub amount: Amount,
    pub is_percentage: bool,
    /// `None` means every category
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl ChangeSpecification {
    /// Create a change specification for all categories
    pub fn new(kind: ChangeKind, amount: Amount, is_percentage: bool) -> Self {
        Self {
            kind,
            amount,
            is_percentage,
            category_id: None,
        }
    }

    /// Restrict the change to a single category
    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// The catalog filter this change selects with
    pub fn filter(&self) -> EntryFilter {
        EntryFilter {
            category_id: self.category_id,
            is_active: Some(true),
        }
    }

    /// Whether this change touches the given catalog entry
    pub fn selects(&self, entry: &ServiceCatalogEntry) -> bool {
        self.filter().matches(entry)
    }

    /// Compute the price that results from applying this change to `old`
    ///
    /// Decreases floor at zero: a 150% decrease on 100 yields 0.
    pub fn apply_to(&self, old: Price) -> Result<Price, ChangeValidationError> {
        let old_value = old.value();
        let delta = if self.is_percentage {
            old_value
                .checked_mul(self.amount.value())
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or(ChangeValidationError::Overflow)?
        } else {
            self.amount.value()
        };

        let new_value = match self.kind {
            ChangeKind::Increase => old_value.checked_add(delta),
            ChangeKind::Decrease => old_value.checked_sub(delta),
        }
        .ok_or(ChangeValidationError::Overflow)?;

        Ok(Price::clamped(new_value))
    }

    /// Short human-readable description, e.g. "+10%" or "-5.00"
    pub fn describe(&self) -> String {
        describe_change(self.kind, self.amount, self.is_percentage)
    }
}

/// Format a change as a signed amount with an optional percent sign
pub fn describe_change(kind: ChangeKind, amount: Amount, is_percentage: bool) -> String {
    let sign = match kind {
        ChangeKind::Increase => '+',
        ChangeKind::Decrease => '-',
    };
    if is_percentage {
        format!("{}{}%", sign, amount)
    } else {
        format!("{}{}", sign, amount)
    }
}

/// Validation errors for change specifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeValidationError {
    NonPositiveAmount(Decimal),
    InvalidAmount(String),
    UnknownKind(String),
    Overflow,
}

impl fmt::Display for ChangeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeValidationError::NonPositiveAmount(v) => {
                write!(f, "Change amount must be greater than zero, got {}", v)
            }
            ChangeValidationError::InvalidAmount(s) => write!(f, "Invalid change amount: {}", s),
            ChangeValidationError::UnknownKind(s) => {
                write!(f, "Unknown change kind '{}', expected increase or decrease", s)
            }
            ChangeValidationError::Overflow => write!(f, "Resulting price is out of range"),
        }
    }
}

impl std::error::Error for ChangeValidationError {}
