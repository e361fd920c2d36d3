//! Bike receipt CLI
//!
//! Loads a catalog and an order from YAML fixtures, prices every line and prints the receipt.

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;
use rusty_money::iso;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bike_distributor::{
    fixtures::Fixture,
    renderers::{RenderFormat, renderer_for},
};

/// Bike receipt configuration
#[derive(Debug, Parser)]
#[command(name = "bike-receipt", about = "Price a bike order and print its receipt", long_about = None)]
struct Args {
    /// Fixture directory containing `catalogs/` and `orders/`
    #[arg(long, env = "BIKE_FIXTURES", default_value = "./fixtures")]
    fixtures: PathBuf,

    /// Catalog fixture name
    #[arg(long, env = "BIKE_CATALOG", default_value = "default")]
    catalog: String,

    /// Order fixture name
    #[arg(long)]
    order: String,

    /// Receipt format
    #[arg(long, env = "BIKE_RECEIPT_FORMAT", value_enum, default_value_t = RenderFormat::Text)]
    format: RenderFormat,

    /// Tax rate override, e.g. 0.0725
    #[arg(long, env = "BIKE_TAX_RATE")]
    tax_rate: Option<Decimal>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "BIKE_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let mut fixture = Fixture::with_base_path(&args.fixtures);

    fixture
        .load_catalog(&args.catalog)
        .with_context(|| format!("loading catalog `{}`", args.catalog))?;

    let order = fixture
        .load_order_with_tax_rate(&args.order, args.tax_rate)
        .with_context(|| format!("loading order `{}`", args.order))?;

    info!(
        order = %args.order,
        format = %args.format,
        lines = order.lines().len(),
        "rendering receipt"
    );

    let receipt = renderer_for(args.format, iso::USD).render(&order)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{receipt}")?;

    Ok(())
}
