//! Script parser
//!
//! A `nom` parser for the discount scripting language: a small, loop-free subset of
//! JavaScript-style statements and expressions.
//!
//! Nesting is capped at [`MAX_NESTING`] levels, both while parsing and in the resulting tree, so
//! the parser and interpreter recurse a bounded number of times.

use std::{cell::Cell, str::FromStr};

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, not_line_ending, satisfy},
    combinator::{all_consuming, cut, map, map_res, not, opt, recognize, value, verify},
    error::{VerboseError, VerboseErrorKind, context, convert_error},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};
use rust_decimal::Decimal;

use super::{
    ExpressionEvaluationError,
    ast::{BinaryOp, Expr, Script, Stmt, SwitchClause, UnaryOp},
};

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

const KEYWORDS: &[&str] = &[
    "let", "var", "const", "if", "else", "switch", "case", "default", "break", "true", "false",
];

/// Deepest nesting of statements, expressions and operators a script may use.
pub const MAX_NESTING: usize = 64;

thread_local! {
    static NESTING: Cell<usize> = const { Cell::new(0) };
}

/// One level of parser nesting, released on drop.
struct Nesting;

impl Nesting {
    fn enter(input: &str) -> Result<Self, nom::Err<VerboseError<&str>>> {
        let depth = NESTING.with(|nesting| {
            let depth = nesting.get() + 1;
            nesting.set(depth);
            depth
        });

        let level = Self;

        if depth > MAX_NESTING {
            return Err(too_deep(input));
        }

        Ok(level)
    }
}

impl Drop for Nesting {
    fn drop(&mut self) {
        NESTING.with(|nesting| nesting.set(nesting.get().saturating_sub(1)));
    }
}

/// Run `parser` one nesting level deeper.
fn nested<'a, T>(
    mut parser: impl FnMut(&'a str) -> ParseResult<'a, T>,
) -> impl FnMut(&'a str) -> ParseResult<'a, T> {
    move |input| {
        let _level = Nesting::enter(input)?;

        parser(input)
    }
}

fn too_deep(input: &str) -> nom::Err<VerboseError<&str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context("nesting too deep"))],
    })
}

fn within_limit(input: &str, depth: usize) -> Result<(), nom::Err<VerboseError<&str>>> {
    if depth > MAX_NESTING {
        Err(too_deep(input))
    } else {
        Ok(())
    }
}

/// Parse script text into a [`Script`].
///
/// # Errors
///
/// Returns [`ExpressionEvaluationError::Syntax`] describing where parsing stopped.
pub fn parse_script(input: &str) -> Result<Script, ExpressionEvaluationError> {
    match all_consuming(terminated(many0(statement), sp))(input) {
        Ok((_, statements)) => Ok(Script { statements }),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => {
            Err(ExpressionEvaluationError::Syntax(convert_error(input, err)))
        }
        Err(nom::Err::Incomplete(_)) => Err(ExpressionEvaluationError::Syntax(
            "incomplete input".to_string(),
        )),
    }
}

// Whitespace and tokens

fn sp(input: &str) -> ParseResult<'_, ()> {
    value((), many0(alt((multispace1, comment))))(input)
}

fn comment(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(tag("//"), not_line_ending))(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn sym<'a>(symbol: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    preceded(sp, tag(symbol))
}

/// A symbol that must not be directly followed by `=`, so `<` never eats the front of `<=`.
fn op<'a>(
    symbol: &'static str,
    operator: BinaryOp,
) -> impl FnMut(&'a str) -> ParseResult<'a, BinaryOp> {
    value(operator, preceded(sp, terminated(tag(symbol), not(char('=')))))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    preceded(sp, terminated(tag(word), not(satisfy(is_ident_char))))
}

fn name(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn identifier(input: &str) -> ParseResult<'_, String> {
    map(
        preceded(sp, verify(name, |word: &str| !KEYWORDS.contains(&word))),
        str::to_string,
    )(input)
}

fn assign_symbol(input: &str) -> ParseResult<'_, ()> {
    value((), preceded(sp, terminated(char('='), not(char('=')))))(input)
}

// Statements

fn statement(input: &str) -> ParseResult<'_, Stmt> {
    let _level = Nesting::enter(input)?;

    let (input, stmt) = alt((
        declaration,
        if_statement,
        switch_statement,
        value(Stmt::Break, keyword("break")),
        map(block, Stmt::Block),
        assignment,
        map(expression, Stmt::Expr),
    ))(input)?;

    let (input, _) = many0(sym(";"))(input)?;

    Ok((input, stmt))
}

fn block(input: &str) -> ParseResult<'_, Vec<Stmt>> {
    delimited(
        sym("{"),
        many0(statement),
        cut(context("closing brace", sym("}"))),
    )(input)
}

fn branch(input: &str) -> ParseResult<'_, Vec<Stmt>> {
    alt((block, map(statement, |stmt| vec![stmt])))(input)
}

fn parenthesised(input: &str) -> ParseResult<'_, Expr> {
    delimited(
        sym("("),
        cut(expression),
        cut(context("closing parenthesis", sym(")"))),
    )(input)
}

fn declaration(input: &str) -> ParseResult<'_, Stmt> {
    let (input, _) = alt((keyword("let"), keyword("var"), keyword("const")))(input)?;
    let (input, variable) = cut(context("variable name", identifier))(input)?;
    let (input, init) = opt(preceded(assign_symbol, cut(expression)))(input)?;

    Ok((input, Stmt::Declare(variable, init)))
}

fn assignment(input: &str) -> ParseResult<'_, Stmt> {
    let (input, variable) = identifier(input)?;
    let (input, compound) = alt((
        value(Some(BinaryOp::Add), sym("+=")),
        value(Some(BinaryOp::Sub), sym("-=")),
        value(Some(BinaryOp::Mul), sym("*=")),
        value(Some(BinaryOp::Div), sym("/=")),
        value(None, assign_symbol),
    ))(input)?;
    let (input, expr) = cut(expression)(input)?;

    Ok((input, Stmt::Assign(variable, compound, expr)))
}

fn if_statement(input: &str) -> ParseResult<'_, Stmt> {
    let (input, _) = keyword("if")(input)?;
    let (input, test) = cut(context("if condition", parenthesised))(input)?;
    let (input, then) = cut(branch)(input)?;
    let (input, otherwise) = opt(preceded(keyword("else"), cut(branch)))(input)?;

    Ok((
        input,
        Stmt::If {
            test,
            then,
            otherwise,
        },
    ))
}

fn switch_statement(input: &str) -> ParseResult<'_, Stmt> {
    let (input, _) = keyword("switch")(input)?;
    let (input, discriminant) = cut(context("switch value", parenthesised))(input)?;
    let (input, clauses) = cut(delimited(
        sym("{"),
        many0(switch_clause),
        context("closing brace", sym("}")),
    ))(input)?;

    Ok((
        input,
        Stmt::Switch {
            discriminant,
            clauses,
        },
    ))
}

fn switch_clause(input: &str) -> ParseResult<'_, SwitchClause> {
    let (input, test) = alt((
        map(preceded(keyword("case"), cut(expression)), Some),
        value(None, keyword("default")),
    ))(input)?;
    let (input, _) = cut(context("colon", sym(":")))(input)?;
    let (input, body) = many0(statement)(input)?;

    Ok((input, SwitchClause { test, body }))
}

// Expressions, lowest precedence first

pub(crate) fn expression(input: &str) -> ParseResult<'_, Expr> {
    let _level = Nesting::enter(input)?;

    let (input, test) = logical_or(input)?;
    let (input, branches) = opt(pair(
        preceded(sym("?"), cut(expression)),
        preceded(cut(context("colon", sym(":"))), cut(expression)),
    ))(input)?;

    let expr = match branches {
        Some((consequent, alternate)) => {
            Expr::Conditional(Box::new(test), Box::new(consequent), Box::new(alternate))
        }
        None => test,
    };

    Ok((input, expr))
}

fn chain<'a>(
    input: &'a str,
    operand: fn(&'a str) -> ParseResult<'a, Expr>,
    operator: impl FnMut(&'a str) -> ParseResult<'a, BinaryOp>,
) -> ParseResult<'a, Expr> {
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(operator, cut(operand)))(input)?;

    let mut depth = first.depth();
    let mut expr = first;

    for (op, rhs) in rest {
        depth = depth.max(rhs.depth()) + 1;
        within_limit(input, depth)?;

        expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
    }

    Ok((input, expr))
}

fn logical_or(input: &str) -> ParseResult<'_, Expr> {
    chain(input, logical_and, value(BinaryOp::Or, sym("||")))
}

fn logical_and(input: &str) -> ParseResult<'_, Expr> {
    chain(input, equality, value(BinaryOp::And, sym("&&")))
}

fn equality(input: &str) -> ParseResult<'_, Expr> {
    chain(
        input,
        comparison,
        alt((
            value(BinaryOp::Eq, sym("===")),
            value(BinaryOp::Ne, sym("!==")),
            op("==", BinaryOp::Eq),
            op("!=", BinaryOp::Ne),
        )),
    )
}

fn comparison(input: &str) -> ParseResult<'_, Expr> {
    chain(
        input,
        additive,
        alt((
            op("<=", BinaryOp::Le),
            op(">=", BinaryOp::Ge),
            op("<", BinaryOp::Lt),
            op(">", BinaryOp::Gt),
        )),
    )
}

fn additive(input: &str) -> ParseResult<'_, Expr> {
    chain(
        input,
        multiplicative,
        alt((op("+", BinaryOp::Add), op("-", BinaryOp::Sub))),
    )
}

fn multiplicative(input: &str) -> ParseResult<'_, Expr> {
    chain(
        input,
        unary,
        alt((
            op("*", BinaryOp::Mul),
            op("/", BinaryOp::Div),
            op("%", BinaryOp::Rem),
        )),
    )
}

fn unary(input: &str) -> ParseResult<'_, Expr> {
    alt((
        map(preceded(sym("-"), nested(cut(unary))), |expr| {
            Expr::Unary(UnaryOp::Neg, Box::new(expr))
        }),
        map(
            preceded(
                preceded(sp, terminated(tag("!"), not(char('=')))),
                nested(cut(unary)),
            ),
            |expr| Expr::Unary(UnaryOp::Not, Box::new(expr)),
        ),
        postfix,
    ))(input)
}

fn postfix(input: &str) -> ParseResult<'_, Expr> {
    let (input, base) = primary(input)?;
    let (input, properties) =
        many0(preceded(sym("."), cut(context("property name", name))))(input)?;

    within_limit(input, base.depth() + properties.len())?;

    let expr = properties.into_iter().fold(base, |object, property| {
        Expr::Member(Box::new(object), property.to_string())
    });

    Ok((input, expr))
}

fn primary(input: &str) -> ParseResult<'_, Expr> {
    preceded(
        sp,
        alt((
            number,
            string_literal,
            value(Expr::Bool(true), keyword("true")),
            value(Expr::Bool(false), keyword("false")),
            call,
            map(identifier, Expr::Ident),
            delimited(
                char('('),
                cut(expression),
                cut(context("closing parenthesis", sym(")"))),
            ),
        )),
    )(input)
}

fn number(input: &str) -> ParseResult<'_, Expr> {
    map(
        map_res(
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            Decimal::from_str,
        ),
        Expr::Number,
    )(input)
}

fn string_literal(input: &str) -> ParseResult<'_, Expr> {
    map(
        alt((
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        )),
        |text: &str| Expr::Text(text.to_string()),
    )(input)
}

fn call(input: &str) -> ParseResult<'_, Expr> {
    let (input, _) = opt(tag("Math."))(input)?;
    let (input, function) = identifier(input)?;
    let (input, args) = delimited(
        sym("("),
        separated_list0(sym(","), expression),
        cut(context("closing parenthesis", sym(")"))),
    )(input)?;

    Ok((input, Expr::Call(function, args)))
}
