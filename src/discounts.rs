//! Discounts
//!
//! A [`DiscountRule`] describes a single discount tier. Payloads are wrapped in
//! validated newtypes, so a percentage outside `(0, 1]`, a non-positive fixed
//! amount or a blank expression cannot be constructed.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// The kind of a discount rule, without its payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// No discount
    None,

    /// A fraction of the unit price
    Percentage,

    /// A fixed currency amount off each unit
    FixedAmount,

    /// A scripted expression yielding the per-unit discount amount
    Expression,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscountKind::None => "none",
            DiscountKind::Percentage => "percentage",
            DiscountKind::FixedAmount => "fixed amount",
            DiscountKind::Expression => "expression",
        };

        f.write_str(name)
    }
}

/// A percentage discount expressed as a fraction in `(0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DiscountRate(Decimal);

impl DiscountRate {
    /// Create a new rate.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPercentage`] unless `0 < rate <= 1`.
    pub fn new(rate: Decimal) -> Result<Self, ValidationError> {
        if rate <= Decimal::ZERO || rate > Decimal::ONE {
            return Err(ValidationError::InvalidPercentage(rate));
        }

        Ok(Self(rate))
    }

    /// Return the fraction.
    pub fn value(self) -> Decimal {
        self.0
    }
}

/// A fixed, positive per-unit discount in currency units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DiscountAmount(Decimal);

impl DiscountAmount {
    /// Create a new amount.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFixedAmount`] unless `amount > 0`.
    pub fn new(amount: Decimal) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidFixedAmount(amount));
        }

        Ok(Self(amount))
    }

    /// Return the amount.
    pub fn value(self) -> Decimal {
        self.0
    }
}

/// Script text for an expression rule. Never empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscountExpression(String);

impl DiscountExpression {
    /// Create a new expression, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyExpression`] if nothing remains after trimming.
    pub fn new(text: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = text.as_ref().trim();

        if trimmed.is_empty() {
            return Err(ValidationError::EmptyExpression);
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Return the script text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single discount rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "DiscountRuleRecord", into = "DiscountRuleRecord")]
pub enum DiscountRule {
    /// No discount applies.
    #[default]
    None,

    /// Discount each unit by a fraction of its price.
    Percentage(DiscountRate),

    /// Discount each unit by a fixed amount.
    FixedAmount(DiscountAmount),

    /// Discount each unit by the result of a scripted expression.
    Expression(DiscountExpression),
}

impl DiscountRule {
    /// Build a rule from a kind and its optional payloads.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a payload required by `kind` is missing, if a payload is
    /// supplied that `kind` forbids, or if the payload itself is out of range.
    pub fn new(
        kind: DiscountKind,
        amount: Option<Decimal>,
        expression: Option<&str>,
    ) -> Result<Self, ValidationError> {
        match kind {
            DiscountKind::None => {
                if amount.is_some() {
                    return Err(ValidationError::UnexpectedAmount(kind));
                }

                if expression.is_some() {
                    return Err(ValidationError::UnexpectedExpression(kind));
                }

                Ok(DiscountRule::None)
            }
            DiscountKind::Percentage | DiscountKind::FixedAmount => {
                if expression.is_some() {
                    return Err(ValidationError::UnexpectedExpression(kind));
                }

                let amount = amount.ok_or(ValidationError::MissingAmount(kind))?;

                if kind == DiscountKind::Percentage {
                    Self::percentage(amount)
                } else {
                    Self::fixed_amount(amount)
                }
            }
            DiscountKind::Expression => {
                if amount.is_some() {
                    return Err(ValidationError::UnexpectedAmount(kind));
                }

                Self::expression(expression.ok_or(ValidationError::MissingExpression)?)
            }
        }
    }

    /// Percentage discount, `rate` being a fraction in `(0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPercentage`] if `rate` is out of range.
    pub fn percentage(rate: Decimal) -> Result<Self, ValidationError> {
        DiscountRate::new(rate).map(DiscountRule::Percentage)
    }

    /// Fixed per-unit discount.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFixedAmount`] if `amount` is not positive.
    pub fn fixed_amount(amount: Decimal) -> Result<Self, ValidationError> {
        DiscountAmount::new(amount).map(DiscountRule::FixedAmount)
    }

    /// Scripted per-unit discount.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyExpression`] if `text` is blank.
    pub fn expression(text: impl AsRef<str>) -> Result<Self, ValidationError> {
        DiscountExpression::new(text).map(DiscountRule::Expression)
    }

    /// Return the kind of this rule.
    pub fn kind(&self) -> DiscountKind {
        match self {
            DiscountRule::None => DiscountKind::None,
            DiscountRule::Percentage(_) => DiscountKind::Percentage,
            DiscountRule::FixedAmount(_) => DiscountKind::FixedAmount,
            DiscountRule::Expression(_) => DiscountKind::Expression,
        }
    }

    /// Return the amount payload for percentage and fixed amount rules.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            DiscountRule::Percentage(rate) => Some(rate.value()),
            DiscountRule::FixedAmount(amount) => Some(amount.value()),
            DiscountRule::None | DiscountRule::Expression(_) => None,
        }
    }

    /// Return the script text for expression rules.
    pub fn expression_text(&self) -> Option<&str> {
        match self {
            DiscountRule::Expression(expression) => Some(expression.as_str()),
            _ => None,
        }
    }
}

/// Flat `kind` / `amount` / `expression` form used for (de)serialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DiscountRuleRecord {
    pub(crate) kind: DiscountKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) amount: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) expression: Option<String>,
}

impl TryFrom<DiscountRuleRecord> for DiscountRule {
    type Error = ValidationError;

    fn try_from(record: DiscountRuleRecord) -> Result<Self, Self::Error> {
        DiscountRule::new(record.kind, record.amount, record.expression.as_deref())
    }
}

impl From<DiscountRule> for DiscountRuleRecord {
    fn from(rule: DiscountRule) -> Self {
        DiscountRuleRecord {
            kind: rule.kind(),
            amount: rule.amount(),
            expression: rule.expression_text().map(str::to_string),
        }
    }
}
