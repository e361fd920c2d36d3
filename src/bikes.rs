//! Bikes

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    discounts::DiscountRule,
    schedules::{DiscountSchedule, NO_DISCOUNT},
    validation::{ValidationError, ensure_quantity},
};

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BikeRecord", into = "BikeRecord")]
pub struct Bike {
    brand: String,
    model: String,
    price: Decimal,
    discounts: Option<DiscountSchedule>,
}

impl Bike {
    /// Create a bike without a discount schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidUnitPrice`] if `price` is not positive.
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, ValidationError> {
        if price <= Decimal::ZERO {
            return Err(ValidationError::InvalidUnitPrice(price));
        }

        Ok(Self {
            brand: brand.into(),
            model: model.into(),
            price,
            discounts: None,
        })
    }

    /// Create a bike with a discount schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidUnitPrice`] if `price` is not positive.
    pub fn with_discounts(
        brand: impl Into<String>,
        model: impl Into<String>,
        price: Decimal,
        discounts: DiscountSchedule,
    ) -> Result<Self, ValidationError> {
        let mut bike = Self::new(brand, model, price)?;
        bike.discounts = Some(discounts);

        Ok(bike)
    }

    /// Returns the brand
    pub fn brand(&self) -> &str {
        &self.brand
    }

    /// Returns the model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the unit price
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Returns the discount schedule, if any
    pub fn discounts(&self) -> Option<&DiscountSchedule> {
        self.discounts.as_ref()
    }

    /// Resolve the discount rule for `quantity`. Bikes without a schedule never discount.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidQuantity`] if `quantity` is less than one.
    pub fn discount_for(&self, quantity: i64) -> Result<&DiscountRule, ValidationError> {
        match &self.discounts {
            Some(schedule) => schedule.resolve(quantity),
            None => {
                ensure_quantity(quantity)?;

                Ok(&NO_DISCOUNT)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BikeRecord {
    brand: String,
    model: String,
    price: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    discounts: Option<DiscountSchedule>,
}

impl TryFrom<BikeRecord> for Bike {
    type Error = ValidationError;

    fn try_from(record: BikeRecord) -> Result<Self, Self::Error> {
        let mut bike = Bike::new(record.brand, record.model, record.price)?;
        bike.discounts = record.discounts;

        Ok(bike)
    }
}

impl From<Bike> for BikeRecord {
    fn from(bike: Bike) -> Self {
        BikeRecord {
            brand: bike.brand,
            model: bike.model,
            price: bike.price,
            discounts: bike.discounts,
        }
    }
}
