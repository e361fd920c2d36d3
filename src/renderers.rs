//! Receipt renderers

use std::fmt::{self, Write};

use rust_decimal::Decimal;
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::{orders::Order, pricing::Line};

/// Errors that can occur while rendering a receipt.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing into the output buffer failed.
    #[error("failed to format receipt")]
    Format(#[from] fmt::Error),

    /// JSON serialization failed.
    #[error("failed to serialize receipt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Receipt output format.
#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderFormat {
    /// Plain text, one line per order line.
    Text,

    /// A single HTML document.
    Html,

    /// Pretty-printed JSON of the whole order.
    Json,

    /// A boxed table followed by the totals.
    Table,
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderFormat::Text => "text",
            RenderFormat::Html => "html",
            RenderFormat::Json => "json",
            RenderFormat::Table => "table",
        })
    }
}

/// Renders an order as a receipt.
pub trait OrderRenderer {
    /// The format this renderer produces.
    fn format(&self) -> RenderFormat;

    /// Render `order`.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if the receipt cannot be produced.
    fn render(&self, order: &Order) -> Result<String, RenderError>;
}

/// Build the renderer for `format`, displaying amounts in `currency`.
pub fn renderer_for(
    format: RenderFormat,
    currency: &'static Currency,
) -> Box<dyn OrderRenderer> {
    match format {
        RenderFormat::Text => Box::new(TextRenderer::with_currency(currency)),
        RenderFormat::Html => Box::new(HtmlRenderer::with_currency(currency)),
        RenderFormat::Json => Box::new(JsonRenderer),
        RenderFormat::Table => Box::new(TableRenderer::with_currency(currency)),
    }
}

fn money(amount: Decimal, currency: &'static Currency) -> Money<'static, Currency> {
    Money::from_decimal(amount, currency)
}

fn bike_name(line: &Line) -> String {
    format!("{} {}", line.bike().brand(), line.bike().model())
}

/// Plain text receipt.
#[derive(Debug, Clone, Copy)]
pub struct TextRenderer {
    currency: &'static Currency,
}

impl TextRenderer {
    /// Display amounts in `currency`.
    pub fn with_currency(currency: &'static Currency) -> Self {
        Self { currency }
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::with_currency(iso::USD)
    }
}

impl OrderRenderer for TextRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Text
    }

    fn render(&self, order: &Order) -> Result<String, RenderError> {
        let mut out = String::new();

        writeln!(out, "Order Receipt for {}", order.company())?;

        for line in order.lines() {
            writeln!(
                out,
                "\t{} x {} = {}",
                line.quantity(),
                bike_name(line),
                money(line.total_amount(), self.currency)
            )?;
        }

        writeln!(out, "Sub-Total: {}", money(order.subtotal(), self.currency))?;
        writeln!(out, "Tax: {}", money(order.tax(), self.currency))?;
        write!(out, "Total: {}", money(order.total(), self.currency))?;

        Ok(out)
    }
}

/// Single-document HTML receipt.
#[derive(Debug, Clone, Copy)]
pub struct HtmlRenderer {
    currency: &'static Currency,
}

impl HtmlRenderer {
    /// Display amounts in `currency`.
    pub fn with_currency(currency: &'static Currency) -> Self {
        Self { currency }
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::with_currency(iso::USD)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }

    escaped
}

impl OrderRenderer for HtmlRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Html
    }

    fn render(&self, order: &Order) -> Result<String, RenderError> {
        let mut out = String::new();

        write!(
            out,
            "<html><body><h1>Order Receipt for {}</h1>",
            escape_html(order.company())
        )?;

        out.push_str("<ul>");

        for line in order.lines() {
            write!(
                out,
                "<li>{} x {} = {}</li>",
                line.quantity(),
                escape_html(&bike_name(line)),
                money(line.total_amount(), self.currency)
            )?;
        }

        out.push_str("</ul>");

        write!(out, "<h3>Sub-Total: {}</h3>", money(order.subtotal(), self.currency))?;
        write!(out, "<h3>Tax: {}</h3>", money(order.tax(), self.currency))?;
        write!(out, "<h2>Total: {}</h2>", money(order.total(), self.currency))?;

        out.push_str("</body></html>");

        Ok(out)
    }
}

/// Pretty-printed JSON of the full order, lines included.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl OrderRenderer for JsonRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Json
    }

    fn render(&self, order: &Order) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(order)?)
    }
}

/// Boxed table receipt for terminals.
#[derive(Debug, Clone, Copy)]
pub struct TableRenderer {
    currency: &'static Currency,
}

impl TableRenderer {
    /// Display amounts in `currency`.
    pub fn with_currency(currency: &'static Currency) -> Self {
        Self { currency }
    }

    fn discount_cell(&self, line: &Line) -> String {
        if line.total_discount_amount().is_zero() {
            return String::new();
        }

        let percent = (line.total_discount_percentage() * Decimal::ONE_HUNDRED).normalize();

        format!(
            "{percent}% ({})",
            money(line.total_discount_amount(), self.currency)
        )
    }
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::with_currency(iso::USD)
    }
}

impl OrderRenderer for TableRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Table
    }

    fn render(&self, order: &Order) -> Result<String, RenderError> {
        let mut builder = Builder::default();

        builder.push_record(["Qty", "Bike", "Unit Price", "Discount", "Line Total"]);

        for line in order.lines() {
            builder.push_record([
                line.quantity().to_string(),
                bike_name(line),
                money(line.bike().price(), self.currency).to_string(),
                self.discount_cell(line),
                money(line.total_amount(), self.currency).to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(2..5), Alignment::right());
        table.modify(Columns::first(), Alignment::right());

        let mut out = String::new();

        writeln!(out, "Order Receipt for {}", order.company())?;
        writeln!(out, "{table}")?;
        writeln!(out, "Sub-Total: {}", money(order.subtotal(), self.currency))?;
        writeln!(out, "Tax: {}", money(order.tax(), self.currency))?;
        write!(out, "Total: {}", money(order.total(), self.currency))?;

        Ok(out)
    }
}
