//! Discount Schedules
//!
//! A [`DiscountSchedule`] maps quantity thresholds to [`DiscountRule`]s. Positive thresholds are
//! kept in ascending order so resolution is a single reverse range lookup. The catch-all
//! threshold (`-1`) is stored separately and only applies when no positive threshold qualifies.

use std::{collections::BTreeMap, fmt};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    discounts::{DiscountKind, DiscountRule, DiscountRuleRecord},
    validation::{ValidationError, ensure_quantity},
};

/// Raw threshold value marking the catch-all entry.
pub const CATCH_ALL: i64 = -1;

pub(crate) static NO_DISCOUNT: DiscountRule = DiscountRule::None;

/// A schedule key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Threshold {
    /// Always considered, but loses to any qualifying minimum quantity.
    CatchAll,

    /// Qualifies once the requested quantity reaches this minimum.
    Minimum(i64),
}

impl Threshold {
    /// Return the raw threshold value (`-1` for the catch-all).
    pub fn value(self) -> i64 {
        match self {
            Threshold::CatchAll => CATCH_ALL,
            Threshold::Minimum(minimum) => minimum,
        }
    }
}

impl TryFrom<i64> for Threshold {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            CATCH_ALL => Ok(Threshold::CatchAll),
            minimum if minimum > 0 => Ok(Threshold::Minimum(minimum)),
            other => Err(ValidationError::InvalidThreshold(other)),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::CatchAll => f.write_str("catch-all"),
            Threshold::Minimum(minimum) => write!(f, "{minimum}+"),
        }
    }
}

/// Quantity-tiered discount rules for a catalog item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScheduleEntry>", into = "Vec<ScheduleEntry>")]
pub struct DiscountSchedule {
    tiers: BTreeMap<i64, DiscountRule>,
    catch_all: Option<DiscountRule>,
}

impl DiscountSchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schedule from `(threshold, rule)` pairs.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] raised by [`DiscountSchedule::add`].
    pub fn with_entries(
        entries: impl IntoIterator<Item = (i64, DiscountRule)>,
    ) -> Result<Self, ValidationError> {
        let mut schedule = Self::new();

        for (threshold, rule) in entries {
            schedule.add(threshold, rule)?;
        }

        Ok(schedule)
    }

    /// Add a rule at `threshold`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidThreshold`]: `threshold` is neither positive nor `-1`.
    /// - [`ValidationError::DuplicateThreshold`]: the schedule already has this threshold.
    pub fn add(&mut self, threshold: i64, rule: DiscountRule) -> Result<&mut Self, ValidationError> {
        match Threshold::try_from(threshold)? {
            Threshold::CatchAll => {
                if self.catch_all.is_some() {
                    return Err(ValidationError::DuplicateThreshold(threshold));
                }

                self.catch_all = Some(rule);
            }
            Threshold::Minimum(minimum) => {
                if self.tiers.contains_key(&minimum) {
                    return Err(ValidationError::DuplicateThreshold(threshold));
                }

                self.tiers.insert(minimum, rule);
            }
        }

        Ok(self)
    }

    /// Resolve the rule that applies to `quantity`.
    ///
    /// The largest positive threshold not exceeding `quantity` wins. The catch-all is used only
    /// when no positive threshold qualifies, and [`DiscountRule::None`] when neither exists.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidQuantity`] if `quantity` is less than one.
    pub fn resolve(&self, quantity: i64) -> Result<&DiscountRule, ValidationError> {
        ensure_quantity(quantity)?;

        let (threshold, rule) = match self.tiers.range(..=quantity).next_back() {
            Some((minimum, rule)) => (Threshold::Minimum(*minimum), rule),
            None => match &self.catch_all {
                Some(rule) => (Threshold::CatchAll, rule),
                None => return Ok(&NO_DISCOUNT),
            },
        };

        debug!(quantity, %threshold, kind = %rule.kind(), "resolved discount rule");

        Ok(rule)
    }

    /// Iterate over entries, catch-all first, then thresholds in ascending order.
    pub fn entries(&self) -> impl Iterator<Item = (Threshold, &DiscountRule)> {
        self.catch_all
            .iter()
            .map(|rule| (Threshold::CatchAll, rule))
            .chain(
                self.tiers
                    .iter()
                    .map(|(minimum, rule)| (Threshold::Minimum(*minimum), rule)),
            )
    }

    /// Number of entries, including the catch-all.
    pub fn len(&self) -> usize {
        self.tiers.len() + usize::from(self.catch_all.is_some())
    }

    /// Check if the schedule has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serialised schedule entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ScheduleEntry {
    threshold: i64,
    kind: DiscountKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
}

impl TryFrom<Vec<ScheduleEntry>> for DiscountSchedule {
    type Error = ValidationError;

    fn try_from(entries: Vec<ScheduleEntry>) -> Result<Self, Self::Error> {
        let mut schedule = Self::new();

        for entry in entries {
            let rule = DiscountRule::try_from(DiscountRuleRecord {
                kind: entry.kind,
                amount: entry.amount,
                expression: entry.expression,
            })?;

            schedule.add(entry.threshold, rule)?;
        }

        Ok(schedule)
    }
}

impl From<DiscountSchedule> for Vec<ScheduleEntry> {
    fn from(schedule: DiscountSchedule) -> Self {
        schedule
            .entries()
            .map(|(threshold, rule)| {
                let record = DiscountRuleRecord::from(rule.clone());

                ScheduleEntry {
                    threshold: threshold.value(),
                    kind: record.kind,
                    amount: record.amount,
                    expression: record.expression,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use super::*;

    fn tiered() -> Result<DiscountSchedule, ValidationError> {
        DiscountSchedule::with_entries([
            (5, DiscountRule::percentage(dec!(0.05))?),
            (20, DiscountRule::percentage(dec!(0.1))?),
            (50, DiscountRule::fixed_amount(dec!(150))?),
        ])
    }

    #[test]
    fn resolve_picks_largest_qualifying_threshold() -> TestResult {
        let schedule = tiered()?;

        assert_eq!(schedule.resolve(5)?, &DiscountRule::percentage(dec!(0.05))?);
        assert_eq!(schedule.resolve(49)?, &DiscountRule::percentage(dec!(0.1))?);
        assert_eq!(schedule.resolve(50)?, &DiscountRule::fixed_amount(dec!(150))?);
        assert_eq!(schedule.resolve(1000)?, &DiscountRule::fixed_amount(dec!(150))?);

        Ok(())
    }

    #[test]
    fn resolve_returns_none_below_every_threshold() -> TestResult {
        let schedule = tiered()?;

        assert_eq!(schedule.resolve(4)?, &DiscountRule::None);
        assert_eq!(DiscountSchedule::new().resolve(1)?, &DiscountRule::None);

        Ok(())
    }

    #[test]
    fn positive_threshold_beats_catch_all() -> TestResult {
        let mut schedule = DiscountSchedule::new();
        schedule
            .add(CATCH_ALL, DiscountRule::expression("bike.price * 0.5")?)?
            .add(10, DiscountRule::percentage(dec!(0.2))?)?;

        assert_eq!(schedule.resolve(10)?, &DiscountRule::percentage(dec!(0.2))?);
        assert_eq!(schedule.resolve(11)?, &DiscountRule::percentage(dec!(0.2))?);

        Ok(())
    }

    #[test]
    fn catch_all_applies_when_nothing_else_qualifies() -> TestResult {
        let mut schedule = DiscountSchedule::new();
        schedule
            .add(CATCH_ALL, DiscountRule::expression("bike.price * 0.5")?)?
            .add(10, DiscountRule::percentage(dec!(0.2))?)?;

        assert_eq!(
            schedule.resolve(9)?,
            &DiscountRule::expression("bike.price * 0.5")?
        );

        Ok(())
    }

    #[test]
    fn resolve_is_idempotent() -> TestResult {
        let schedule = tiered()?;

        assert_eq!(schedule.resolve(21)?, schedule.resolve(21)?);

        Ok(())
    }

    #[test]
    fn resolve_rejects_non_positive_quantity() -> TestResult {
        let schedule = tiered()?;

        assert_eq!(schedule.resolve(0), Err(ValidationError::InvalidQuantity(0)));
        assert_eq!(schedule.resolve(-1), Err(ValidationError::InvalidQuantity(-1)));

        Ok(())
    }

    #[test]
    fn add_rejects_duplicates() -> TestResult {
        let mut schedule = tiered()?;

        assert_eq!(
            schedule.add(20, DiscountRule::None).err(),
            Some(ValidationError::DuplicateThreshold(20))
        );

        schedule.add(CATCH_ALL, DiscountRule::None)?;

        assert_eq!(
            schedule.add(CATCH_ALL, DiscountRule::None).err(),
            Some(ValidationError::DuplicateThreshold(CATCH_ALL))
        );

        Ok(())
    }

    #[test]
    fn add_rejects_invalid_thresholds() {
        let mut schedule = DiscountSchedule::new();

        for threshold in [0, -2, i64::MIN] {
            assert_eq!(
                schedule.add(threshold, DiscountRule::None).err(),
                Some(ValidationError::InvalidThreshold(threshold))
            );
        }

        assert!(schedule.is_empty());
    }

    #[test]
    fn entries_list_catch_all_first_then_ascending() -> TestResult {
        let mut schedule = tiered()?;
        schedule.add(CATCH_ALL, DiscountRule::None)?;

        let thresholds: Vec<i64> = schedule.entries().map(|(t, _)| t.value()).collect();

        assert_eq!(thresholds, vec![-1, 5, 20, 50]);
        assert_eq!(schedule.len(), 4);

        Ok(())
    }

    #[test]
    fn deserialising_rejects_duplicate_thresholds() {
        let yaml = "
- threshold: 10
  kind: percentage
  amount: 0.1
- threshold: 10
  kind: fixed_amount
  amount: 20
";
        let result: Result<DiscountSchedule, _> = serde_norway::from_str(yaml);

        assert!(result.is_err());
    }

    #[test]
    fn deserialises_from_yaml() -> TestResult {
        let yaml = r#"
- threshold: 20
  kind: percentage
  amount: 0.1
- threshold: -1
  kind: expression
  expression: "quantity >= 50 ? 100 : 0"
"#;
        let schedule: DiscountSchedule = serde_norway::from_str(yaml)?;

        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.resolve(20)?, &DiscountRule::percentage(dec!(0.1))?);
        assert_eq!(schedule.resolve(19)?.kind(), DiscountKind::Expression);

        Ok(())
    }

    #[test]
    fn threshold_display() {
        assert_eq!(Threshold::CatchAll.to_string(), "catch-all");
        assert_eq!(Threshold::Minimum(20).to_string(), "20+");
    }
}
