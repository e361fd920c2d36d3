//! Fixtures
//!
//! Catalogs and orders are read from YAML files under a base directory:
//!
//! - `catalogs/<name>.yml`: bikes keyed by a short name, each with an optional discount schedule
//! - `orders/<name>.yml`: a company, an optional tax rate and a list of `{bike, quantity}` lines

use std::{fs, path::PathBuf, sync::Arc};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    bikes::Bike,
    orders::{Order, OrderError},
    pricing::{LinePricer, PricingError},
    validation::ValidationError,
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// An order line references a bike missing from the catalog
    #[error("Bike not found: {0}")]
    BikeNotFound(String),

    /// Invalid order settings
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An order line could not be priced
    #[error("Failed to price line for {bike}: {source}")]
    Pricing {
        /// Catalog key of the offending bike
        bike: String,
        /// Underlying pricing failure
        source: PricingError,
    },

    /// Order totals could not be updated
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Catalog file layout
#[derive(Debug, Deserialize)]
struct CatalogFixture {
    bikes: FxHashMap<String, Bike>,
}

/// Order file layout
#[derive(Debug, Deserialize)]
struct OrderFixture {
    company: String,

    #[serde(default)]
    tax_rate: Option<Decimal>,

    #[serde(default)]
    lines: Vec<LineFixture>,
}

#[derive(Debug, Deserialize)]
struct LineFixture {
    bike: String,
    quantity: i64,
}

/// Fixture
#[derive(Debug, Default)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Bikes loaded so far, by catalog key
    bikes: FxHashMap<String, Arc<Bike>>,

    /// Prices order lines
    pricer: LinePricer,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// Load bikes from a catalog file. Later catalogs replace bikes with the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a bike or discount definition
    /// is invalid.
    pub fn load_catalog(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("catalogs").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: CatalogFixture = serde_norway::from_str(&contents)?;

        debug!(catalog = name, bikes = fixture.bikes.len(), "loaded catalog");

        self.bikes.extend(
            fixture
                .bikes
                .into_iter()
                .map(|(key, bike)| (key, Arc::new(bike))),
        );

        Ok(self)
    }

    /// Get a bike by its catalog key
    ///
    /// # Errors
    ///
    /// Returns an error if the bike is not found.
    pub fn bike(&self, key: &str) -> Result<&Arc<Bike>, FixtureError> {
        self.bikes
            .get(key)
            .ok_or_else(|| FixtureError::BikeNotFound(key.to_string()))
    }

    /// Number of bikes loaded
    pub fn len(&self) -> usize {
        self.bikes.len()
    }

    /// Whether no bikes have been loaded
    pub fn is_empty(&self) -> bool {
        self.bikes.is_empty()
    }

    /// Load and price an order, using the tax rate from the file if it has one.
    ///
    /// # Errors
    ///
    /// See [`Fixture::load_order_with_tax_rate`].
    pub fn load_order(&self, name: &str) -> Result<Order, FixtureError> {
        self.load_order_with_tax_rate(name, None)
    }

    /// Load and price an order. `tax_rate` overrides the file's rate; with neither, the default
    /// rate applies. Pricing stops at the first line that fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, the tax rate is invalid, a line
    /// references an unknown bike, or a line cannot be priced.
    pub fn load_order_with_tax_rate(
        &self,
        name: &str,
        tax_rate: Option<Decimal>,
    ) -> Result<Order, FixtureError> {
        let file_path = self.base_path.join("orders").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: OrderFixture = serde_norway::from_str(&contents)?;

        let mut order = match tax_rate.or(fixture.tax_rate) {
            Some(rate) => Order::with_tax_rate(fixture.company, rate)?,
            None => Order::new(fixture.company),
        };

        for line in fixture.lines {
            let bike = self.bike(&line.bike)?;

            let priced = self
                .pricer
                .price(Arc::clone(bike), line.quantity)
                .map_err(|source| FixtureError::Pricing {
                    bike: line.bike.clone(),
                    source,
                })?;

            order.add_line(priced)?;
        }

        debug!(
            order = name,
            lines = order.lines().len(),
            total = %order.total(),
            "loaded order"
        );

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rust_decimal_macros::dec;
    use tempfile::TempDir;
    use testresult::TestResult;

    use crate::discounts::DiscountRule;

    use super::*;

    const CATALOG: &str = r#"
bikes:
  defy:
    brand: Giant
    model: Defy 1
    price: 1000
    discounts:
      - threshold: 20
        kind: percentage
        amount: 0.1
  venge:
    brand: Specialized
    model: Venge Elite
    price: 2000
"#;

    fn write(dir: &Path, relative: &str, contents: &str) -> TestResult {
        let path = dir.join(relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;

        Ok(())
    }

    fn fixture_dir() -> TestResult<TempDir> {
        let dir = TempDir::new()?;

        write(dir.path(), "catalogs/default.yml", CATALOG)?;

        Ok(dir)
    }

    #[test]
    fn loads_catalog() -> TestResult {
        let dir = fixture_dir()?;
        let mut fixture = Fixture::with_base_path(dir.path());

        fixture.load_catalog("default")?;

        assert_eq!(fixture.len(), 2);

        let defy = fixture.bike("defy")?;

        assert_eq!(defy.brand(), "Giant");
        assert_eq!(defy.price(), dec!(1000));
        assert_eq!(defy.discount_for(20)?, &DiscountRule::percentage(dec!(0.1))?);

        assert!(fixture.bike("venge")?.discounts().is_none());

        Ok(())
    }

    #[test]
    fn missing_bike_is_reported() -> TestResult {
        let dir = fixture_dir()?;
        let mut fixture = Fixture::with_base_path(dir.path());

        fixture.load_catalog("default")?;

        assert!(matches!(
            fixture.bike("madone"),
            Err(FixtureError::BikeNotFound(key)) if key == "madone"
        ));

        Ok(())
    }

    #[test]
    fn missing_catalog_is_io_error() -> TestResult {
        let dir = TempDir::new()?;
        let mut fixture = Fixture::with_base_path(dir.path());

        assert!(matches!(
            fixture.load_catalog("default"),
            Err(FixtureError::Io(_))
        ));

        Ok(())
    }

    #[test]
    fn invalid_discount_is_yaml_error() -> TestResult {
        let dir = TempDir::new()?;

        write(
            dir.path(),
            "catalogs/default.yml",
            "bikes:\n  defy:\n    brand: Giant\n    model: Defy 1\n    price: 1000\n    discounts:\n      - threshold: 20\n        kind: percentage\n        amount: 1.5\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());

        assert!(matches!(
            fixture.load_catalog("default"),
            Err(FixtureError::Yaml(_))
        ));

        Ok(())
    }

    #[test]
    fn loads_and_prices_order() -> TestResult {
        let dir = fixture_dir()?;

        write(
            dir.path(),
            "orders/bulk.yml",
            "company: Anywhere Bike Shop\nlines:\n  - bike: defy\n    quantity: 20\n  - bike: venge\n    quantity: 1\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());
        fixture.load_catalog("default")?;

        let order = fixture.load_order("bulk")?;

        assert_eq!(order.company(), "Anywhere Bike Shop");
        assert_eq!(order.lines().len(), 2);
        assert_eq!(order.subtotal(), dec!(20000.00));
        assert_eq!(order.tax(), dec!(1450.00));
        assert_eq!(order.total(), dec!(21450.00));

        Ok(())
    }

    #[test]
    fn tax_rate_override_beats_file() -> TestResult {
        let dir = fixture_dir()?;

        write(
            dir.path(),
            "orders/taxed.yml",
            "company: Anywhere Bike Shop\ntax_rate: 0.1\nlines:\n  - bike: venge\n    quantity: 1\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());
        fixture.load_catalog("default")?;

        assert_eq!(fixture.load_order("taxed")?.tax(), dec!(200.00));
        assert_eq!(
            fixture
                .load_order_with_tax_rate("taxed", Some(dec!(0.05)))?
                .tax(),
            dec!(100.00)
        );

        Ok(())
    }

    #[test]
    fn order_with_unknown_bike_fails() -> TestResult {
        let dir = fixture_dir()?;

        write(
            dir.path(),
            "orders/unknown.yml",
            "company: Anywhere Bike Shop\nlines:\n  - bike: madone\n    quantity: 1\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());
        fixture.load_catalog("default")?;

        assert!(matches!(
            fixture.load_order("unknown"),
            Err(FixtureError::BikeNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn order_with_bad_quantity_fails() -> TestResult {
        let dir = fixture_dir()?;

        write(
            dir.path(),
            "orders/zero.yml",
            "company: Anywhere Bike Shop\nlines:\n  - bike: defy\n    quantity: 0\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());
        fixture.load_catalog("default")?;

        assert!(matches!(
            fixture.load_order("zero"),
            Err(FixtureError::Pricing {
                source: PricingError::Validation(ValidationError::InvalidQuantity(0)),
                ..
            })
        ));

        Ok(())
    }

    #[test]
    fn order_with_bad_tax_rate_fails() -> TestResult {
        let dir = fixture_dir()?;

        write(
            dir.path(),
            "orders/taxed.yml",
            "company: Anywhere Bike Shop\ntax_rate: 1.5\nlines: []\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());
        fixture.load_catalog("default")?;

        assert!(matches!(
            fixture.load_order("taxed"),
            Err(FixtureError::Validation(ValidationError::InvalidTaxRate(_)))
        ));

        Ok(())
    }
}
