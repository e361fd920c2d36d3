//! Script syntax tree

use rust_decimal::Decimal;

/// A parsed script: a sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    /// Top-level statements, in source order.
    pub statements: Vec<Stmt>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let name = value;` (also `var` / `const`). A missing initialiser declares `undefined`.
    Declare(String, Option<Expr>),

    /// `name = value;` or a compound form such as `name += value;`.
    Assign(String, Option<BinaryOp>, Expr),

    /// `if (test) then else otherwise`
    If {
        /// Condition
        test: Expr,
        /// Statements run when the condition is truthy
        then: Vec<Stmt>,
        /// Statements run otherwise, if present
        otherwise: Option<Vec<Stmt>>,
    },

    /// `switch (discriminant) { case ..: .. default: .. }`
    Switch {
        /// Value compared against each case
        discriminant: Expr,
        /// Clauses, in source order
        clauses: Vec<SwitchClause>,
    },

    /// `break;`
    Break,

    /// `{ .. }`
    Block(Vec<Stmt>),

    /// An expression whose value becomes the completion value.
    Expr(Expr),
}

/// A `case` or `default` clause of a switch.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchClause {
    /// The case value, or `None` for `default`.
    pub test: Option<Expr>,

    /// Statements run when this clause is entered, falling through until `break`.
    pub body: Vec<Stmt>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(Decimal),

    /// String literal
    Text(String),

    /// `true` / `false`
    Bool(bool),

    /// Variable or binding reference
    Ident(String),

    /// `object.property`
    Member(Box<Expr>, String),

    /// Built-in function call
    Call(String, Vec<Expr>),

    /// Prefix operator
    Unary(UnaryOp, Box<Expr>),

    /// Infix operator
    Binary(BinaryOp, Box<Expr>, Box<Expr>),

    /// `test ? consequent : alternate`
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Number of expression levels in this tree, counting this node.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Number(_) | Expr::Text(_) | Expr::Bool(_) | Expr::Ident(_) => 1,
            Expr::Member(operand, _) | Expr::Unary(_, operand) => operand.depth() + 1,
            Expr::Call(_, args) => args.iter().map(Expr::depth).max().unwrap_or(0) + 1,
            Expr::Binary(_, lhs, rhs) => lhs.depth().max(rhs.depth()) + 1,
            Expr::Conditional(test, consequent, alternate) => {
                test.depth().max(consequent.depth()).max(alternate.depth()) + 1
            }
        }
    }
}

/// Prefix operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `!`
    Not,
}

/// Infix operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==` / `===`
    Eq,
    /// `!=` / `!==`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl BinaryOp {
    /// Source symbol, used in error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}
