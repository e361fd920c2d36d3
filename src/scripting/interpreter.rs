//! Script interpreter
//!
//! Walks a parsed [`Script`] against a set of [`ScriptBindings`]. Each run owns its locals, so
//! nothing survives between evaluations.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rustc_hash::FxHashMap;

use crate::bikes::Bike;

use super::{
    BIKE, ExpressionEvaluationError, QUANTITY, SUBTOTAL, ScriptBindings,
    ast::{BinaryOp, Expr, Script, Stmt, UnaryOp},
};

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value<'a> {
    Undefined,
    Number(Decimal),
    Bool(bool),
    Text(String),
    Bike(&'a Bike),
}

impl Value<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Text(_) => "string",
            Value::Bike(_) => "bike",
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Number(number) => !number.is_zero(),
            Value::Bool(flag) => *flag,
            Value::Text(text) => !text.is_empty(),
            Value::Bike(_) => true,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Number(number) => write!(f, "{}", number.normalize()),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Text(text) => f.write_str(text),
            Value::Bike(bike) => write!(f, "{} {}", bike.brand(), bike.model()),
        }
    }
}

enum Flow {
    Normal,
    Break,
}

/// A single-use evaluation context.
pub(crate) struct Interpreter<'a> {
    bindings: &'a ScriptBindings<'a>,
    locals: FxHashMap<String, Value<'a>>,
    completion: Option<Value<'a>>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(bindings: &'a ScriptBindings<'a>) -> Self {
        Self {
            bindings,
            locals: FxHashMap::default(),
            completion: None,
        }
    }

    /// Run `script` and return its numeric completion value.
    pub(crate) fn run(mut self, script: &Script) -> Result<Decimal, ExpressionEvaluationError> {
        if let Flow::Break = self.execute_all(&script.statements)? {
            return Err(ExpressionEvaluationError::BreakOutsideSwitch);
        }

        match self.completion {
            Some(Value::Number(number)) => Ok(number),
            Some(other) => Err(ExpressionEvaluationError::NonNumericResult(other.type_name())),
            None => Err(ExpressionEvaluationError::NonNumericResult(
                Value::Undefined.type_name(),
            )),
        }
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow, ExpressionEvaluationError> {
        for statement in statements {
            if let Flow::Break = self.execute(statement)? {
                return Ok(Flow::Break);
            }
        }

        Ok(Flow::Normal)
    }

    fn execute(&mut self, statement: &Stmt) -> Result<Flow, ExpressionEvaluationError> {
        match statement {
            Stmt::Declare(name, init) => {
                ensure_writable(name)?;

                let value = match init {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Undefined,
                };

                self.locals.insert(name.clone(), value);
            }
            Stmt::Assign(name, compound, expr) => {
                ensure_writable(name)?;

                let current = self
                    .locals
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ExpressionEvaluationError::UndefinedReference(name.clone()))?;

                let rhs = self.evaluate(expr)?;

                let value = match compound {
                    Some(op) => apply(*op, current, rhs)?,
                    None => rhs,
                };

                self.locals.insert(name.clone(), value.clone());
                self.completion = Some(value);
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    return self.execute_all(then);
                }

                if let Some(otherwise) = otherwise {
                    return self.execute_all(otherwise);
                }
            }
            Stmt::Switch {
                discriminant,
                clauses,
            } => {
                let discriminant = self.evaluate(discriminant)?;

                let mut entry = None;

                for (index, clause) in clauses.iter().enumerate() {
                    if let Some(test) = &clause.test
                        && self.evaluate(test)? == discriminant
                    {
                        entry = Some(index);
                        break;
                    }
                }

                let entry = entry.or_else(|| clauses.iter().position(|clause| clause.test.is_none()));

                if let Some(entry) = entry {
                    for clause in clauses.iter().skip(entry) {
                        if let Flow::Break = self.execute_all(&clause.body)? {
                            break;
                        }
                    }
                }
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Block(statements) => return self.execute_all(statements),
            Stmt::Expr(expr) => {
                let value = self.evaluate(expr)?;
                self.completion = Some(value);
            }
        }

        Ok(Flow::Normal)
    }

    fn evaluate(&self, expr: &Expr) -> Result<Value<'a>, ExpressionEvaluationError> {
        match expr {
            Expr::Number(number) => Ok(Value::Number(*number)),
            Expr::Text(text) => Ok(Value::Text(text.clone())),
            Expr::Bool(flag) => Ok(Value::Bool(*flag)),
            Expr::Ident(name) => self.lookup(name),
            Expr::Member(object, property) => member(&self.evaluate(object)?, property),
            Expr::Call(function, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<_>, _>>()?;

                call(function, &args)
            }
            Expr::Unary(UnaryOp::Neg, operand) => match self.evaluate(operand)? {
                Value::Number(number) => Ok(Value::Number(-number)),
                other => Err(ExpressionEvaluationError::TypeMismatch {
                    operation: "-",
                    found: other.type_name(),
                }),
            },
            Expr::Unary(UnaryOp::Not, operand) => {
                Ok(Value::Bool(!self.evaluate(operand)?.is_truthy()))
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                let lhs = self.evaluate(lhs)?;

                if lhs.is_truthy() {
                    self.evaluate(rhs)
                } else {
                    Ok(lhs)
                }
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                let lhs = self.evaluate(lhs)?;

                if lhs.is_truthy() {
                    Ok(lhs)
                } else {
                    self.evaluate(rhs)
                }
            }
            Expr::Binary(op, lhs, rhs) => apply(*op, self.evaluate(lhs)?, self.evaluate(rhs)?),
            Expr::Conditional(test, consequent, alternate) => {
                if self.evaluate(test)?.is_truthy() {
                    self.evaluate(consequent)
                } else {
                    self.evaluate(alternate)
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value<'a>, ExpressionEvaluationError> {
        match name {
            BIKE => Ok(Value::Bike(self.bindings.bike)),
            QUANTITY => Ok(Value::Number(Decimal::from(self.bindings.quantity))),
            SUBTOTAL => Ok(Value::Number(self.bindings.subtotal)),
            _ => self
                .locals
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionEvaluationError::UndefinedReference(name.to_string())),
        }
    }
}

fn ensure_writable(name: &str) -> Result<(), ExpressionEvaluationError> {
    if matches!(name, BIKE | QUANTITY | SUBTOTAL) {
        Err(ExpressionEvaluationError::ReadOnlyBinding(name.to_string()))
    } else {
        Ok(())
    }
}

fn member<'a>(object: &Value<'a>, property: &str) -> Result<Value<'a>, ExpressionEvaluationError> {
    match (object, property) {
        (Value::Bike(bike), "brand") => Ok(Value::Text(bike.brand().to_string())),
        (Value::Bike(bike), "model") => Ok(Value::Text(bike.model().to_string())),
        (Value::Bike(bike), "price") => Ok(Value::Number(bike.price())),
        _ => Err(ExpressionEvaluationError::UnknownProperty {
            target: object.type_name(),
            property: property.to_string(),
        }),
    }
}

fn apply<'a>(
    op: BinaryOp,
    lhs: Value<'a>,
    rhs: Value<'a>,
) -> Result<Value<'a>, ExpressionEvaluationError> {
    match (op, &lhs, &rhs) {
        (BinaryOp::Eq, ..) => Ok(Value::Bool(lhs == rhs)),
        (BinaryOp::Ne, ..) => Ok(Value::Bool(lhs != rhs)),
        (BinaryOp::And, ..) => Ok(if lhs.is_truthy() { rhs } else { lhs }),
        (BinaryOp::Or, ..) => Ok(if lhs.is_truthy() { lhs } else { rhs }),
        (BinaryOp::Add, Value::Text(_), _) | (BinaryOp::Add, _, Value::Text(_)) => {
            Ok(Value::Text(format!("{lhs}{rhs}")))
        }
        (_, Value::Number(a), Value::Number(b)) => arithmetic(op, *a, *b),
        (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, Value::Text(a), Value::Text(b)) => {
            Ok(Value::Bool(compare(op, a, b)))
        }
        (_, Value::Number(_), other) | (_, other, _) => Err(ExpressionEvaluationError::TypeMismatch {
            operation: op.symbol(),
            found: other.type_name(),
        }),
    }
}

fn arithmetic<'a>(
    op: BinaryOp,
    a: Decimal,
    b: Decimal,
) -> Result<Value<'a>, ExpressionEvaluationError> {
    let number = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b.is_zero() => {
            return Err(ExpressionEvaluationError::DivisionByZero);
        }
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Rem => a.checked_rem(b),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            return Ok(Value::Bool(compare(op, &a, &b)));
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::And | BinaryOp::Or => {
            return Err(ExpressionEvaluationError::TypeMismatch {
                operation: op.symbol(),
                found: "number",
            });
        }
    };

    number
        .map(Value::Number)
        .ok_or(ExpressionEvaluationError::Overflow)
}

fn compare<T: PartialOrd + ?Sized>(op: BinaryOp, a: &T, b: &T) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

fn numbers(
    function: &'static str,
    args: &[Value<'_>],
) -> Result<Vec<Decimal>, ExpressionEvaluationError> {
    args.iter()
        .map(|arg| match arg {
            Value::Number(number) => Ok(*number),
            other => Err(ExpressionEvaluationError::TypeMismatch {
                operation: function,
                found: other.type_name(),
            }),
        })
        .collect()
}

fn arity(function: &str, expected: &'static str, found: usize) -> ExpressionEvaluationError {
    ExpressionEvaluationError::Arity {
        function: function.to_string(),
        expected,
        found,
    }
}

fn single(function: &'static str, args: &[Value<'_>]) -> Result<Decimal, ExpressionEvaluationError> {
    match numbers(function, args)?.as_slice() {
        &[value] => Ok(value),
        _ => Err(arity(function, "1", args.len())),
    }
}

fn call<'a>(function: &str, args: &[Value<'a>]) -> Result<Value<'a>, ExpressionEvaluationError> {
    let result = match function {
        "min" => numbers("min", args)?
            .into_iter()
            .min()
            .ok_or_else(|| arity(function, "at least 1", 0))?,
        "max" => numbers("max", args)?
            .into_iter()
            .max()
            .ok_or_else(|| arity(function, "at least 1", 0))?,
        "abs" => single("abs", args)?.abs(),
        "floor" => single("floor", args)?.floor(),
        "ceil" => single("ceil", args)?.ceil(),
        "round" => match numbers("round", args)?.as_slice() {
            &[value] => value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            &[value, places] => {
                let places = places
                    .to_u32()
                    .filter(|places| *places <= 28)
                    .ok_or_else(|| ExpressionEvaluationError::InvalidArgument {
                        function: function.to_string(),
                        argument: places.to_string(),
                    })?;

                value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
            }
            _ => return Err(arity(function, "1 or 2", args.len())),
        },
        other => return Err(ExpressionEvaluationError::UnknownFunction(other.to_string())),
    };

    Ok(Value::Number(result))
}
