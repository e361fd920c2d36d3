//! Validation

use rust_decimal::Decimal;
use thiserror::Error;

use crate::discounts::DiscountKind;

/// Errors raised when constructor or input arguments are malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Percentage discounts must be a fraction in `(0, 1]`.
    #[error("percentage discount must be greater than 0 and at most 1, got {0}")]
    InvalidPercentage(Decimal),

    /// Fixed amount discounts must be greater than zero.
    #[error("fixed amount discount must be greater than 0, got {0}")]
    InvalidFixedAmount(Decimal),

    /// An amount-based rule was defined without an amount.
    #[error("{0} discount requires an amount")]
    MissingAmount(DiscountKind),

    /// An amount was supplied for a rule kind that does not take one.
    #[error("{0} discount must not have an amount")]
    UnexpectedAmount(DiscountKind),

    /// An expression rule was defined without an expression.
    #[error("expression discount requires an expression")]
    MissingExpression,

    /// An expression rule was defined with empty or whitespace-only text.
    #[error("expression discount cannot be empty")]
    EmptyExpression,

    /// An expression was supplied for a rule kind that does not take one.
    #[error("{0} discount must not have an expression")]
    UnexpectedExpression(DiscountKind),

    /// Schedule thresholds must be a positive quantity or the catch-all `-1`.
    #[error("threshold must be a positive quantity or -1, got {0}")]
    InvalidThreshold(i64),

    /// The schedule already holds an entry for this threshold.
    #[error("threshold {0} is already present in the schedule")]
    DuplicateThreshold(i64),

    /// Quantities must be at least one.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),

    /// Unit prices must be greater than zero.
    #[error("unit price must be greater than 0, got {0}")]
    InvalidUnitPrice(Decimal),

    /// Tax rates must be within `[0, 1)`.
    #[error("tax rate must be at least 0 and less than 1, got {0}")]
    InvalidTaxRate(Decimal),
}

/// Ensure a requested quantity is at least one.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidQuantity`] for zero or negative quantities.
pub fn ensure_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity < 1 {
        Err(ValidationError::InvalidQuantity(quantity))
    } else {
        Ok(())
    }
}
