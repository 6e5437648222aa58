use winnow::ascii::till_line_ending;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, repeat, separated, terminated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::types::{ArithOp, CompareOp, Expr, UnaryOp};
use crate::Value;

// -- Whitespace & comments --------------------------------------------------

pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers ------------------------------------------------------------

pub(crate) fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

pub(crate) fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any)
            .context(StrContext::Expected(StrContextValue::CharLiteral('"')))
            .parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = cut_err(any).parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

/// Unsigned numeric literal. A fractional part or an `m` suffix makes it a decimal.
pub(crate) fn number_literal(input: &mut &str) -> ModalResult<Value> {
    let (text, suffix) = (
        (
            take_while(1.., |c: char| c.is_ascii_digit()),
            opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
        )
            .take(),
        opt(alt(('m', 'M'))),
    )
        .parse_next(input)?;

    if text.contains('.') || suffix.is_some() {
        let f: f64 = text
            .parse()
            .map_err(|_| ErrMode::Cut(ContextError::new()))?;
        Ok(Value::Float(f))
    } else {
        let i: i64 = text
            .parse()
            .map_err(|_| ErrMode::Cut(ContextError::new()))?;
        Ok(Value::Int(i))
    }
}

/// A literal as it may appear in action context blocks: strings, booleans and
/// optionally negative numbers.
pub(crate) fn literal(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    alt((
        string_literal.map(Value::String),
        "true".value(Value::Bool(true)),
        "false".value(Value::Bool(false)),
        preceded('-', cut_err(number_literal)).map(negate_literal),
        number_literal,
    ))
    .context(StrContext::Expected(StrContextValue::Description("literal")))
    .parse_next(input)
}

fn negate_literal(value: Value) -> Value {
    match value {
        Value::Int(i) => Value::Int(-i),
        Value::Float(f) => Value::Float(-f),
        other => other,
    }
}

// -- Operators --------------------------------------------------------------

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    ws.parse_next(input)?;
    alt((
        ">=".value(CompareOp::Gte),
        ">".value(CompareOp::Gt),
        "<=".value(CompareOp::Lte),
        "<".value(CompareOp::Lt),
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
    ))
    .parse_next(input)
}

fn additive_op(input: &mut &str) -> ModalResult<ArithOp> {
    ws.parse_next(input)?;
    alt(('+'.value(ArithOp::Add), '-'.value(ArithOp::Sub))).parse_next(input)
}

fn multiplicative_op(input: &mut &str) -> ModalResult<ArithOp> {
    ws.parse_next(input)?;
    alt((
        '*'.value(ArithOp::Mul),
        '/'.value(ArithOp::Div),
        '%'.value(ArithOp::Rem),
    ))
    .parse_next(input)
}

// -- Expressions ------------------------------------------------------------
// precedence: || < && < comparison < additive < multiplicative < unary < postfix

fn primary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expr, (ws, cut_err(')'))),
        string_literal.map(|s| Expr::Literal(Value::String(s))),
        number_literal.map(Expr::Literal),
        ident.map(|name: &str| match name {
            "true" => Expr::Literal(Value::Bool(true)),
            "false" => Expr::Literal(Value::Bool(false)),
            other => Expr::Ident(other.to_owned()),
        }),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn lambda(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    let param = ident.parse_next(input)?;
    (ws, "=>").parse_next(input)?;
    let body = cut_err(expr).parse_next(input)?;
    Ok(Expr::Lambda {
        param: param.to_owned(),
        body: Box::new(body),
    })
}

fn call_args(input: &mut &str) -> ModalResult<Vec<Expr>> {
    (ws, '(').parse_next(input)?;
    let args: Vec<Expr> = separated(0.., alt((lambda, expr)), (ws, ',')).parse_next(input)?;
    (ws, cut_err(')')).parse_next(input)?;
    Ok(args)
}

fn member_suffix(input: &mut &str) -> ModalResult<(String, Option<Vec<Expr>>)> {
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "member name",
        )))
        .parse_next(input)?;
    let args = opt(call_args).parse_next(input)?;
    Ok((name.to_owned(), args))
}

fn postfix(input: &mut &str) -> ModalResult<Expr> {
    let base = primary(input)?;
    let suffixes: Vec<(String, Option<Vec<Expr>>)> =
        repeat(0.., preceded((ws, '.'), member_suffix)).parse_next(input)?;
    Ok(suffixes
        .into_iter()
        .fold(base, |target, (name, args)| match args {
            Some(args) => Expr::Call {
                target: Box::new(target),
                method: name,
                args,
            },
            None => Expr::Member {
                target: Box::new(target),
                member: name,
            },
        }))
}

fn unary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    if opt('!').parse_next(input)?.is_some() {
        let inner = cut_err(unary).parse_next(input)?;
        return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
    }
    if opt('-').parse_next(input)?.is_some() {
        let inner = cut_err(unary).parse_next(input)?;
        return Ok(match inner {
            Expr::Literal(v @ (Value::Int(_) | Value::Float(_))) => {
                Expr::Literal(negate_literal(v))
            }
            other => Expr::Unary(UnaryOp::Neg, Box::new(other)),
        });
    }
    postfix(input)
}

fn multiplicative(input: &mut &str) -> ModalResult<Expr> {
    let first = unary(input)?;
    let rest: Vec<(ArithOp, Expr)> =
        repeat(0.., (multiplicative_op, cut_err(unary))).parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, r)| {
        Expr::Arith(op, Box::new(acc), Box::new(r))
    }))
}

fn additive(input: &mut &str) -> ModalResult<Expr> {
    let first = multiplicative(input)?;
    let rest: Vec<(ArithOp, Expr)> =
        repeat(0.., (additive_op, cut_err(multiplicative))).parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, r)| {
        Expr::Arith(op, Box::new(acc), Box::new(r))
    }))
}

fn comparison(input: &mut &str) -> ModalResult<Expr> {
    let left = additive(input)?;
    match opt((compare_op, cut_err(additive))).parse_next(input)? {
        Some((op, right)) => Ok(Expr::Compare(op, Box::new(left), Box::new(right))),
        None => Ok(left),
    }
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = comparison(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, "&&"), cut_err(comparison))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = and_expr(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, "||"), cut_err(and_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::Or(Box::new(acc), Box::new(r))))
}

pub(crate) fn expr(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Top-level parser -------------------------------------------------------

pub(crate) fn expression(input: &mut &str) -> ModalResult<Expr> {
    terminated(expr, ws).parse_next(input)
}
