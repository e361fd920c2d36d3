//! Bike Distributor prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    bikes::Bike,
    discounts::{DiscountKind, DiscountRule},
    fixtures::{Fixture, FixtureError},
    orders::{Order, OrderError},
    pricing::{Line, LinePricer, PricingError},
    renderers::{
        HtmlRenderer, JsonRenderer, OrderRenderer, RenderError, RenderFormat, TableRenderer,
        TextRenderer, renderer_for,
    },
    schedules::{CATCH_ALL, DiscountSchedule, Threshold},
    scripting::{
        ExpressionEvaluationError, ExpressionEvaluator, ScriptBindings, ScriptEvaluator,
    },
    validation::ValidationError,
};
