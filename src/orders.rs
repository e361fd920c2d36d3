//! Orders

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    pricing::{Line, round},
    validation::ValidationError,
};

/// Tax rate applied when none is given: 7.25%.
pub fn default_tax_rate() -> Decimal {
    Decimal::new(725, 4)
}

fn ensure_tax_rate(tax_rate: Decimal) -> Result<(), ValidationError> {
    if tax_rate < Decimal::ZERO || tax_rate >= Decimal::ONE {
        Err(ValidationError::InvalidTaxRate(tax_rate))
    } else {
        Ok(())
    }
}

/// Errors that can occur while building an order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Running totals left the representable decimal range.
    #[error("order totals overflowed")]
    Overflow,
}

/// A purchase order for one company.
///
/// Tax is recomputed from the running subtotal each time a line is added, rather than summed
/// per line, so rounding happens once per order.
///
/// Deserialising checks the tax rate and each line's quantity; totals are kept as recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderRecord")]
pub struct Order {
    company: String,
    tax_rate: Decimal,
    lines: Vec<Line>,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
}

impl Order {
    /// Create an empty order at the default tax rate.
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            tax_rate: default_tax_rate(),
            lines: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Create an empty order with a custom tax rate.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTaxRate`] unless `0 <= tax_rate < 1`.
    pub fn with_tax_rate(
        company: impl Into<String>,
        tax_rate: Decimal,
    ) -> Result<Self, ValidationError> {
        ensure_tax_rate(tax_rate)?;

        Ok(Self {
            tax_rate,
            ..Self::new(company)
        })
    }

    /// Append a priced line and recompute the order totals.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Overflow`] if the totals leave the decimal range; the order is left
    /// unchanged.
    pub fn add_line(&mut self, line: Line) -> Result<&mut Self, OrderError> {
        let subtotal = self
            .subtotal
            .checked_add(line.total_amount())
            .ok_or(OrderError::Overflow)?;

        let tax = round(
            subtotal
                .checked_mul(self.tax_rate)
                .ok_or(OrderError::Overflow)?,
        );

        let total = subtotal.checked_add(tax).ok_or(OrderError::Overflow)?;

        debug!(
            company = %self.company,
            line_total = %line.total_amount(),
            %subtotal,
            %tax,
            %total,
            "added order line"
        );

        self.lines.push(line);
        self.subtotal = subtotal;
        self.tax = tax;
        self.total = total;

        Ok(self)
    }

    /// Returns the company name
    pub fn company(&self) -> &str {
        &self.company
    }

    /// Returns the tax rate
    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Returns the lines, in the order they were added
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Sum of line totals
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Tax on the subtotal
    pub fn tax(&self) -> Decimal {
        self.tax
    }

    /// Subtotal plus tax
    pub fn total(&self) -> Decimal {
        self.total
    }
}

#[derive(Debug, Deserialize)]
struct OrderRecord {
    company: String,
    tax_rate: Decimal,
    lines: Vec<Line>,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
}

impl TryFrom<OrderRecord> for Order {
    type Error = ValidationError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        ensure_tax_rate(record.tax_rate)?;

        Ok(Order {
            company: record.company,
            tax_rate: record.tax_rate,
            lines: record.lines,
            subtotal: record.subtotal,
            tax: record.tax,
            total: record.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use crate::{bikes::Bike, discounts::DiscountRule, schedules::DiscountSchedule};

    use super::*;

    fn defy() -> TestResult<Bike> {
        let schedule = DiscountSchedule::with_entries([(20, DiscountRule::percentage(dec!(0.1))?)])?;

        Ok(Bike::with_discounts("Giant", "Defy 1", dec!(1000), schedule)?)
    }

    #[test]
    fn new_order_is_empty() {
        let order = Order::new("Anywhere Bike Shop");

        assert_eq!(order.company(), "Anywhere Bike Shop");
        assert_eq!(order.tax_rate(), dec!(0.0725));
        assert!(order.lines().is_empty());
        assert_eq!(order.subtotal(), Decimal::ZERO);
        assert_eq!(order.tax(), Decimal::ZERO);
        assert_eq!(order.total(), Decimal::ZERO);
    }

    #[test]
    fn single_line_totals() -> TestResult {
        let mut order = Order::new("Anywhere Bike Shop");

        order.add_line(Line::new(defy()?, 1)?)?;

        assert_eq!(order.subtotal(), dec!(1000));
        assert_eq!(order.tax(), dec!(72.50));
        assert_eq!(order.total(), dec!(1072.50));

        Ok(())
    }

    #[test]
    fn tax_is_computed_on_running_subtotal() -> TestResult {
        let bike = Bike::new("Generic", "Commuter", dec!(0.10))?;
        let mut order = Order::new("Anywhere Bike Shop");

        // 0.10 * 0.0725 = 0.00725 rounds to 0.01 per line, but 0.30 * 0.0725 = 0.02175 rounds to 0.02
        order
            .add_line(Line::new(bike.clone(), 1)?)?
            .add_line(Line::new(bike.clone(), 1)?)?
            .add_line(Line::new(bike, 1)?)?;

        assert_eq!(order.lines().len(), 3);
        assert_eq!(order.subtotal(), dec!(0.30));
        assert_eq!(order.tax(), dec!(0.02));
        assert_eq!(order.total(), dec!(0.32));

        Ok(())
    }

    #[test]
    fn discounted_lines_contribute_their_total_amount() -> TestResult {
        let mut order = Order::new("Anywhere Bike Shop");

        order.add_line(Line::new(defy()?, 20)?)?;

        assert_eq!(order.subtotal(), dec!(18000.00));
        assert_eq!(order.tax(), dec!(1305.00));
        assert_eq!(order.total(), dec!(19305.00));

        Ok(())
    }

    #[test]
    fn custom_tax_rate() -> TestResult {
        let mut order = Order::with_tax_rate("Anywhere Bike Shop", dec!(0.2))?;

        order.add_line(Line::new(defy()?, 1)?)?;

        assert_eq!(order.tax(), dec!(200.00));
        assert_eq!(order.total(), dec!(1200.00));

        Ok(())
    }

    #[test]
    fn zero_tax_rate_is_allowed() -> TestResult {
        let mut order = Order::with_tax_rate("Anywhere Bike Shop", Decimal::ZERO)?;

        order.add_line(Line::new(defy()?, 1)?)?;

        assert_eq!(order.total(), order.subtotal());

        Ok(())
    }

    #[test]
    fn rejects_out_of_range_tax_rate() {
        assert_eq!(
            Order::with_tax_rate("Anywhere Bike Shop", dec!(1)),
            Err(ValidationError::InvalidTaxRate(dec!(1)))
        );
        assert_eq!(
            Order::with_tax_rate("Anywhere Bike Shop", dec!(-0.01)),
            Err(ValidationError::InvalidTaxRate(dec!(-0.01)))
        );
    }

    #[test]
    fn json_round_trip_preserves_numbers() -> TestResult {
        let scripted = DiscountSchedule::with_entries([(
            -1,
            DiscountRule::expression("quantity >= 3 ? bike.price / 3 : 0")?,
        )])?;
        let odd = Bike::with_discounts("Specialized", "Venge Elite", dec!(2000), scripted)?;

        let mut order = Order::new("Anywhere Bike Shop");
        order
            .add_line(Line::new(defy()?, 21)?)?
            .add_line(Line::new(odd, 4)?)?;

        let json = serde_json::to_string(&order)?;
        let restored: Order = serde_json::from_str(&json)?;

        assert_eq!(restored, order);

        for (before, after) in order.lines().iter().zip(restored.lines()) {
            assert_eq!(
                after.unit_discount_amount().to_string(),
                before.unit_discount_amount().to_string()
            );
            assert_eq!(after.total_amount().to_string(), before.total_amount().to_string());
        }

        assert_eq!(restored.total().to_string(), order.total().to_string());

        Ok(())
    }

    #[test]
    fn deserialising_checks_tax_rate() -> TestResult {
        let mut order = Order::new("Anywhere Bike Shop");
        order.add_line(Line::new(defy()?, 1)?)?;

        let mut value = serde_json::to_value(&order)?;
        value
            .as_object_mut()
            .ok_or("order serialises to an object")?
            .insert("tax_rate".to_string(), serde_json::Value::from(5));

        let result: Result<Order, _> = serde_json::from_value(value);

        assert!(
            result.is_err_and(|err| err.to_string().contains("tax rate must be at least 0")),
            "out of range tax rate should be rejected"
        );

        Ok(())
    }
}
