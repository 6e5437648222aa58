use std::fmt;

use crate::builtins::{self, len_as_int, unexpected};
use crate::parse::{parse_expression, ParseError};
use crate::types::{ArithOp, EvalError, Expr, UnaryOp};
use crate::{Parameters, Record, RulecraftError, Value};

/// One link of the identifier lookup chain.
#[derive(Debug, Clone, Copy)]
enum Frame<'a> {
    Parameters(&'a Parameters),
    /// Fields of the collection element under test.
    Record(&'a Record),
    /// A lambda parameter bound to the element under test.
    Binding(&'a str, &'a Value),
}

/// Identifier resolution chain, searched innermost frame first.
#[derive(Debug)]
pub(crate) struct Scope<'a> {
    frame: Frame<'a>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub(crate) fn root(parameters: &'a Parameters) -> Self {
        Self {
            frame: Frame::Parameters(parameters),
            parent: None,
        }
    }

    fn lookup(&self, name: &str) -> Option<&'a Value> {
        let found = match self.frame {
            Frame::Parameters(p) => p.get(name),
            Frame::Record(r) => r.get(name),
            Frame::Binding(bound, value) => (bound == name).then_some(value),
        };
        found.or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }
}

pub(crate) fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => scope
            .lookup(name)
            .cloned()
            .or_else(|| builtins::constant(name))
            .ok_or_else(|| EvalError::UnknownIdentifier { name: name.clone() }),
        Expr::Member { target, member } => {
            if let Some(ns) = builtin_namespace(target, scope) {
                return builtins::namespace_member(ns, member);
            }
            let value = evaluate(target, scope)?;
            builtins::value_member(&value, member)
        }
        Expr::Call {
            target,
            method,
            args,
        } => {
            if let Some(ns) = builtin_namespace(target, scope) {
                let args = evaluate_args(args, scope)?;
                return builtins::namespace_call(ns, method, &args);
            }
            let value = evaluate(target, scope)?;
            if let Value::List(items) = &value {
                return list_method(items, method, args, scope);
            }
            let args = evaluate_args(args, scope)?;
            builtins::value_method(&value, method, &args)
        }
        Expr::Lambda { param, .. } => Err(EvalError::MisplacedLambda {
            param: param.clone(),
        }),
        Expr::Unary(UnaryOp::Not, inner) => Ok(Value::Bool(!operand_bool(evaluate(inner, scope)?)?)),
        Expr::Unary(UnaryOp::Neg, inner) => match evaluate(inner, scope)? {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(unexpected("number", &other)),
        },
        Expr::Compare(op, a, b) => {
            let left = evaluate(a, scope)?;
            let right = evaluate(b, scope)?;
            left.compare(*op, &right)
                .map(Value::Bool)
                .ok_or_else(|| EvalError::TypeMismatch {
                    op: op.to_string(),
                    left: left.type_name().to_owned(),
                    right: right.type_name().to_owned(),
                })
        }
        Expr::Arith(op, a, b) => arith(*op, evaluate(a, scope)?, evaluate(b, scope)?),
        Expr::And(a, b) => {
            if !operand_bool(evaluate(a, scope)?)? {
                return Ok(Value::Bool(false));
            }
            operand_bool(evaluate(b, scope)?).map(Value::Bool)
        }
        Expr::Or(a, b) => {
            if operand_bool(evaluate(a, scope)?)? {
                return Ok(Value::Bool(true));
            }
            operand_bool(evaluate(b, scope)?).map(Value::Bool)
        }
    }
}

/// Evaluate a rule condition, which must produce a boolean.
pub(crate) fn evaluate_condition(expr: &Expr, parameters: &Parameters) -> Result<bool, EvalError> {
    match evaluate(expr, &Scope::root(parameters))? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::NotBoolean {
            found: other.type_name().to_owned(),
        }),
    }
}

/// A bare identifier names a built-in namespace only when no parameter or
/// record field shadows it.
fn builtin_namespace<'e>(target: &'e Expr, scope: &Scope<'_>) -> Option<&'e str> {
    target
        .as_ident()
        .filter(|name| scope.lookup(name).is_none() && builtins::is_namespace(name))
}

fn evaluate_args(args: &[Expr], scope: &Scope<'_>) -> Result<Vec<Value>, EvalError> {
    args.iter().map(|arg| evaluate(arg, scope)).collect()
}

fn operand_bool(value: Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| unexpected("bool", &value))
}

// -- Collections ------------------------------------------------------------

fn list_method(
    items: &[Value],
    method: &str,
    args: &[Expr],
    scope: &Scope<'_>,
) -> Result<Value, EvalError> {
    let name = format!("list.{method}");
    match (method, args) {
        ("Count", []) => Ok(Value::Int(len_as_int(items.len()))),
        ("Count", [pred]) => {
            let mut count = 0;
            for item in items {
                if test_item(pred, item, scope)? {
                    count += 1;
                }
            }
            Ok(Value::Int(count))
        }
        ("Any", []) => Ok(Value::Bool(!items.is_empty())),
        ("Any", [pred]) => {
            for item in items {
                if test_item(pred, item, scope)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        ("All", [pred]) => {
            for item in items {
                if !test_item(pred, item, scope)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        ("Where", [pred]) => {
            let mut kept = Vec::new();
            for item in items {
                if test_item(pred, item, scope)? {
                    kept.push(item.clone());
                }
            }
            Ok(Value::List(kept))
        }
        ("Contains", [arg]) => {
            let needle = evaluate(arg, scope)?;
            Ok(Value::Bool(items.contains(&needle)))
        }
        ("Count" | "Any" | "All" | "Where" | "Contains", _) => Err(EvalError::ArityMismatch {
            function: name,
            expected: 1,
            found: args.len(),
        }),
        _ => Err(EvalError::UnknownMember {
            type_name: "list".into(),
            member: method.to_owned(),
        }),
    }
}

/// Run a collection predicate against one element.
///
/// `x => body` binds the element to `x` and leaves the outer scope untouched.
/// A bare predicate instead sees a record element's fields unqualified, so
/// `Where(Amount > 10)` works without a lambda.
fn test_item(pred: &Expr, item: &Value, scope: &Scope<'_>) -> Result<bool, EvalError> {
    let inner;
    let body = match (pred, item) {
        (Expr::Lambda { param, body }, _) => {
            inner = Scope {
                frame: Frame::Binding(param, item),
                parent: Some(scope),
            };
            body.as_ref()
        }
        (bare, Value::Record(record)) => {
            inner = Scope {
                frame: Frame::Record(record),
                parent: Some(scope),
            };
            bare
        }
        _ => return Err(unexpected("record", item)),
    };

    match evaluate(body, &inner)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::NotBoolean {
            found: other.type_name().to_owned(),
        }),
    }
}

// -- Arithmetic -------------------------------------------------------------

fn arith(op: ArithOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b).map(Value::Int),
        (Value::String(a), Value::String(b)) if op == ArithOp::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => float_arith(op, a, b).map(Value::Float),
            _ => Err(EvalError::TypeMismatch {
                op: op.to_string(),
                left: left.type_name().to_owned(),
                right: right.type_name().to_owned(),
            }),
        },
    }
}

fn int_arith(op: ArithOp, a: i64, b: i64) -> Result<i64, EvalError> {
    if matches!(op, ArithOp::Div | ArithOp::Rem) && b == 0 {
        return Err(EvalError::DivisionByZero);
    }
    match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => a.checked_div(b),
        ArithOp::Rem => a.checked_rem(b),
    }
    .ok_or(EvalError::Overflow)
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> Result<f64, EvalError> {
    if matches!(op, ArithOp::Div | ArithOp::Rem) && b == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Rem => a % b,
    };
    if result.is_finite() {
        Ok(result)
    } else {
        Err(EvalError::Overflow)
    }
}

// -- Public surface ---------------------------------------------------------

/// A parsed expression, reusable across many parameter sets.
///
/// ```
/// use rulecraft::{Expression, Parameters, Value};
///
/// let expr = Expression::parse("Amount * 0.9").unwrap();
/// let params = Parameters::new().set("Amount", 100_i64);
/// assert_eq!(expr.evaluate(&params), Ok(Value::Float(90.0)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// # Errors
    ///
    /// Returns [`ParseError`] if `source` is not a well-formed expression.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Ok(Self {
            source: source.to_owned(),
            ast: parse_expression(source)?,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// # Errors
    ///
    /// Returns [`EvalError`] if the expression cannot be evaluated against
    /// `parameters`.
    pub fn evaluate(&self, parameters: &Parameters) -> Result<Value, EvalError> {
        evaluate(&self.ast, &Scope::root(parameters))
    }

    /// Evaluate and require a boolean result.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::NotBoolean`] for a non-boolean result, or any
    /// other evaluation failure.
    pub fn evaluate_bool(&self, parameters: &Parameters) -> Result<bool, EvalError> {
        evaluate_condition(&self.ast, parameters)
    }
}

/// Parse `source` and evaluate it once against `parameters`.
///
/// ```
/// use rulecraft::{eval, Parameters, Value};
///
/// let params = Parameters::new().set("Amount", 120_i64);
/// assert_eq!(eval("Amount > 100", &params).unwrap(), Value::Bool(true));
/// ```
///
/// # Errors
///
/// Returns [`RulecraftError::Parse`] for malformed source and
/// [`RulecraftError::Eval`] when evaluation fails.
pub fn eval(source: &str, parameters: &Parameters) -> Result<Value, RulecraftError> {
    Ok(Expression::parse(source)?.evaluate(parameters)?)
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
