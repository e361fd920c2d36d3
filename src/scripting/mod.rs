//! Scripted discount rules
//!
//! Expression rules carry a small script whose completion value is the per-unit discount amount
//! in currency units. Scripts see three read-only bindings:
//!
//! - `bike`: the catalog item, with `bike.brand`, `bike.model` and `bike.price`
//! - `quantity`: the requested quantity
//! - `subtotal`: the line subtotal before any discount
//!
//! The language is a loop-free subset of JavaScript: `let`/`var`/`const`, assignment, `if`/`else`,
//! `switch` with fall-through, the usual arithmetic, comparison and logical operators, `?:`, and
//! the built-ins `min`, `max`, `abs`, `floor`, `ceil` and `round` (optionally `Math.` prefixed).
//! Numbers are decimals, so `0.1 + 0.2 == 0.3`.
//!
//! Where it departs from JavaScript:
//!
//! - `==` and `===` are the same strict comparison, with no type coercion, so `'21' == 21` is
//!   false. `!=` and `!==` likewise.
//! - Every declaration lives in one script-wide scope; a `let` inside a block is still visible
//!   after the block.
//! - Statements, expressions and operator chains nest at most
//!   [`MAX_NESTING`](parser::MAX_NESTING) levels deep.
//!
//! ```text
//! switch (bike.brand) {
//!     case 'Giant': quantity >= 20 ? bike.price * 0.2 : 0; break;
//!     default: 0
//! }
//! ```

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::trace;

use crate::bikes::Bike;

pub mod ast;
mod interpreter;
pub mod parser;

/// Binding name for the catalog item.
pub const BIKE: &str = "bike";

/// Binding name for the requested quantity.
pub const QUANTITY: &str = "quantity";

/// Binding name for the pre-discount line subtotal.
pub const SUBTOTAL: &str = "subtotal";

/// Errors raised while evaluating a scripted rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionEvaluationError {
    /// The script could not be parsed.
    #[error("syntax error in discount expression:\n{0}")]
    Syntax(String),

    /// The script referenced a name that is neither a binding nor a declared local.
    #[error("undefined reference `{0}`")]
    UndefinedReference(String),

    /// The script read a property the target does not have.
    #[error("{target} has no property `{property}`")]
    UnknownProperty {
        /// Type of the value being read
        target: &'static str,
        /// Property name
        property: String,
    },

    /// The script called a function that does not exist.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    /// A built-in was called with the wrong number of arguments.
    #[error("`{function}` expects {expected} argument(s), got {found}")]
    Arity {
        /// Function name
        function: String,
        /// Accepted argument count
        expected: &'static str,
        /// Supplied argument count
        found: usize,
    },

    /// A built-in was called with an argument outside its domain.
    #[error("invalid argument {argument} for `{function}`")]
    InvalidArgument {
        /// Function name
        function: String,
        /// Offending argument
        argument: String,
    },

    /// An operator or built-in received a value of the wrong type.
    #[error("`{operation}` cannot be applied to a {found}")]
    TypeMismatch {
        /// Operator symbol or function name
        operation: &'static str,
        /// Type of the offending operand
        found: &'static str,
    },

    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Decimal arithmetic left the representable range.
    #[error("arithmetic overflow")]
    Overflow,

    /// The script tried to declare or assign one of the read-only bindings.
    #[error("`{0}` is read-only")]
    ReadOnlyBinding(String),

    /// `break` was used outside of a `switch`.
    #[error("`break` outside of switch")]
    BreakOutsideSwitch,

    /// The script finished on something other than a number.
    #[error("discount expression must produce a number, got {0}")]
    NonNumericResult(&'static str),
}

/// Named, read-only inputs for a scripted rule.
#[derive(Debug, Clone, Copy)]
pub struct ScriptBindings<'a> {
    /// The catalog item being priced
    pub bike: &'a Bike,

    /// The requested quantity
    pub quantity: i64,

    /// Line subtotal before discount
    pub subtotal: Decimal,
}

/// Evaluates scripted discount rules.
///
/// Implementations must not keep state between calls; the pricing engine may evaluate many
/// lines concurrently through a shared evaluator.
pub trait ExpressionEvaluator {
    /// Evaluate `expression` and return the per-unit discount amount.
    ///
    /// # Errors
    ///
    /// Returns an [`ExpressionEvaluationError`] if the expression cannot be parsed, references
    /// an undefined name, or does not produce a number.
    fn evaluate(
        &self,
        expression: &str,
        bindings: &ScriptBindings<'_>,
    ) -> Result<Decimal, ExpressionEvaluationError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str, &ScriptBindings<'_>) -> Result<Decimal, ExpressionEvaluationError>,
{
    fn evaluate(
        &self,
        expression: &str,
        bindings: &ScriptBindings<'_>,
    ) -> Result<Decimal, ExpressionEvaluationError> {
        self(expression, bindings)
    }
}

/// The built-in script evaluator. Parses and runs each script in a fresh context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptEvaluator;

impl ExpressionEvaluator for ScriptEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        bindings: &ScriptBindings<'_>,
    ) -> Result<Decimal, ExpressionEvaluationError> {
        let script = parser::parse_script(expression)?;

        let result = interpreter::Interpreter::new(bindings).run(&script);

        trace!(
            expression,
            quantity = bindings.quantity,
            subtotal = %bindings.subtotal,
            ?result,
            "evaluated discount expression"
        );

        result
    }
}
