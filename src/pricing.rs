//! Line pricing

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    bikes::Bike,
    discounts::DiscountRule,
    scripting::{ExpressionEvaluationError, ExpressionEvaluator, ScriptBindings, ScriptEvaluator},
    validation::{ValidationError, ensure_quantity},
};

/// Number of decimal places every derived amount and percentage is rounded to.
pub const DECIMAL_PLACES: u32 = 2;

/// Errors that can occur while pricing a line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Invalid quantity or discount definition.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Scripted discount rule failed.
    #[error(transparent)]
    Expression(#[from] ExpressionEvaluationError),

    /// Decimal arithmetic left the representable range.
    #[error("line arithmetic overflowed")]
    Overflow,
}

/// Round half away from zero to [`DECIMAL_PLACES`].
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

fn mul(a: Decimal, b: Decimal) -> Result<Decimal, PricingError> {
    a.checked_mul(b).ok_or(PricingError::Overflow)
}

fn div(a: Decimal, b: Decimal) -> Result<Decimal, PricingError> {
    a.checked_div(b).ok_or(PricingError::Overflow)
}

/// A priced order line.
///
/// Deserialising checks the quantity; the derived amounts are kept as recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LineRecord")]
pub struct Line {
    bike: Arc<Bike>,
    quantity: i64,
    total_price: Decimal,
    unit_discount_amount: Decimal,
    total_discount_amount: Decimal,
    unit_discount_percentage: Decimal,
    total_discount_percentage: Decimal,
    total_amount: Decimal,
}

impl Line {
    /// Price `quantity` of `bike` with the built-in script evaluator.
    ///
    /// # Errors
    ///
    /// See [`LinePricer::price`].
    pub fn new(bike: impl Into<Arc<Bike>>, quantity: i64) -> Result<Self, PricingError> {
        LinePricer::<ScriptEvaluator>::default().price(bike, quantity)
    }

    /// Returns the priced bike
    pub fn bike(&self) -> &Bike {
        &self.bike
    }

    /// Returns the quantity
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Unit price times quantity, before discount
    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    /// Discount attributable to one unit
    pub fn unit_discount_amount(&self) -> Decimal {
        self.unit_discount_amount
    }

    /// Discount across the whole line
    pub fn total_discount_amount(&self) -> Decimal {
        self.total_discount_amount
    }

    /// Unit discount as a fraction of the unit price
    pub fn unit_discount_percentage(&self) -> Decimal {
        self.unit_discount_percentage
    }

    /// Total discount as a fraction of the total price
    pub fn total_discount_percentage(&self) -> Decimal {
        self.total_discount_percentage
    }

    /// Amount payable for the line
    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }
}

#[derive(Debug, Deserialize)]
struct LineRecord {
    bike: Arc<Bike>,
    quantity: i64,
    total_price: Decimal,
    unit_discount_amount: Decimal,
    total_discount_amount: Decimal,
    unit_discount_percentage: Decimal,
    total_discount_percentage: Decimal,
    total_amount: Decimal,
}

impl TryFrom<LineRecord> for Line {
    type Error = ValidationError;

    fn try_from(record: LineRecord) -> Result<Self, Self::Error> {
        ensure_quantity(record.quantity)?;

        Ok(Line {
            bike: record.bike,
            quantity: record.quantity,
            total_price: record.total_price,
            unit_discount_amount: record.unit_discount_amount,
            total_discount_amount: record.total_discount_amount,
            unit_discount_percentage: record.unit_discount_percentage,
            total_discount_percentage: record.total_discount_percentage,
            total_amount: record.total_amount,
        })
    }
}

/// Discount figures for a line, before the total amount is derived.
#[derive(Debug, Default)]
struct LineDiscount {
    unit_amount: Decimal,
    total_amount: Decimal,
    unit_percentage: Decimal,
    total_percentage: Decimal,
}

/// Prices lines, delegating scripted rules to an [`ExpressionEvaluator`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LinePricer<E = ScriptEvaluator> {
    evaluator: E,
}

impl<E: ExpressionEvaluator> LinePricer<E> {
    /// Create a pricer with a custom evaluator.
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }

    /// Price `quantity` units of `bike`.
    ///
    /// # Errors
    ///
    /// - [`PricingError::Validation`]: `quantity` is less than one.
    /// - [`PricingError::Expression`]: the resolved rule is scripted and its evaluation failed.
    /// - [`PricingError::Overflow`]: an amount left the representable decimal range.
    pub fn price(&self, bike: impl Into<Arc<Bike>>, quantity: i64) -> Result<Line, PricingError> {
        let bike = bike.into();

        ensure_quantity(quantity)?;

        let units = Decimal::from(quantity);
        let unit_price = bike.price();
        let total_price = mul(unit_price, units)?;

        let rule = bike.discount_for(quantity)?;

        let discount = match rule {
            DiscountRule::None => LineDiscount::default(),
            DiscountRule::FixedAmount(amount) => {
                let unit_amount = round(amount.value());
                let total_amount = round(mul(unit_amount, units)?);

                if total_amount.is_zero() {
                    LineDiscount {
                        unit_amount,
                        total_amount,
                        ..LineDiscount::default()
                    }
                } else {
                    LineDiscount {
                        unit_amount,
                        total_amount,
                        unit_percentage: round(div(unit_amount, unit_price)?),
                        total_percentage: round(div(total_amount, total_price)?),
                    }
                }
            }
            DiscountRule::Percentage(rate) => {
                let percentage = round(rate.value());

                LineDiscount {
                    unit_amount: round(mul(unit_price, percentage)?),
                    total_amount: round(mul(total_price, percentage)?),
                    unit_percentage: percentage,
                    total_percentage: percentage,
                }
            }
            DiscountRule::Expression(expression) => {
                let bindings = ScriptBindings {
                    bike: &bike,
                    quantity,
                    subtotal: total_price,
                };

                let unit_amount = round(self.evaluator.evaluate(expression.as_str(), &bindings)?);
                let percentage = round(div(unit_amount, unit_price)?);

                LineDiscount {
                    unit_amount,
                    total_amount: round(mul(units, unit_amount)?),
                    unit_percentage: percentage,
                    total_percentage: percentage,
                }
            }
        };

        let total_amount = total_price
            .checked_sub(discount.total_amount)
            .ok_or(PricingError::Overflow)?;

        debug!(
            brand = bike.brand(),
            model = bike.model(),
            quantity,
            kind = %rule.kind(),
            %total_price,
            discount = %discount.total_amount,
            %total_amount,
            "priced line"
        );

        Ok(Line {
            bike,
            quantity,
            total_price,
            unit_discount_amount: discount.unit_amount,
            total_discount_amount: discount.total_amount,
            unit_discount_percentage: discount.unit_percentage,
            total_discount_percentage: discount.total_percentage,
            total_amount,
        })
    }
}
