//! The fixed table of built-in names.
//!
//! Consulted only after parameter lookup fails, so a parameter named `Math`
//! shadows the `Math` namespace.

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};

use crate::types::{weekday_name, EvalError};
use crate::Value;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const NAMESPACES: [&str; 6] = ["DayOfWeek", "DateTime", "int", "decimal", "Convert", "Math"];

fn weekday_from_name(name: &str) -> Option<Weekday> {
    WEEKDAYS.into_iter().find(|d| weekday_name(*d) == name)
}

/// Bare built-in constants: the weekday names.
pub(crate) fn constant(name: &str) -> Option<Value> {
    weekday_from_name(name).map(Value::Weekday)
}

pub(crate) fn is_namespace(name: &str) -> bool {
    NAMESPACES.contains(&name)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `Namespace.Member` without a call, e.g. `DayOfWeek.Monday` or `DateTime.Today`.
pub(crate) fn namespace_member(namespace: &str, member: &str) -> Result<Value, EvalError> {
    match (namespace, member) {
        ("DayOfWeek", day) => weekday_from_name(day).map(Value::Weekday),
        ("DateTime", "Today" | "Now") => Some(Value::Date(today())),
        _ => None,
    }
    .ok_or_else(|| EvalError::UnknownMember {
        type_name: namespace.to_owned(),
        member: member.to_owned(),
    })
}

/// `Namespace.Function(args)`, e.g. `int.Parse("42")`.
pub(crate) fn namespace_call(
    namespace: &str,
    function: &str,
    args: &[Value],
) -> Result<Value, EvalError> {
    let name = format!("{namespace}.{function}");
    match (namespace, function) {
        ("int", "Parse") => {
            let s = string_arg(&name, args)?;
            s.trim().parse::<i64>().map(Value::Int).map_err(|_| conversion(s, "int"))
        }
        ("decimal", "Parse") => parse_decimal(string_arg(&name, args)?).map(Value::Float),
        ("Convert", "ToInt32") => to_int32(single_arg(&name, args)?).map(Value::Int),
        ("Convert", "ToDecimal") => to_decimal(single_arg(&name, args)?).map(Value::Float),
        ("Convert", "ToString") => Ok(Value::String(single_arg(&name, args)?.render())),
        ("DateTime", "Parse") => {
            let s = string_arg(&name, args)?;
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| conversion(s, "date"))
        }
        ("Math", "Abs") => match single_arg(&name, args)? {
            Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(EvalError::Overflow),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(unexpected("number", other)),
        },
        ("Math", "Min") => min_max(&name, args, true),
        ("Math", "Max") => min_max(&name, args, false),
        _ => Err(EvalError::UnknownFunction { name }),
    }
}

/// Property access on a value, e.g. `Date.DayOfWeek` or `Text.Length`.
pub(crate) fn value_member(value: &Value, member: &str) -> Result<Value, EvalError> {
    let found = match (value, member) {
        (Value::Date(d), "DayOfWeek") => Some(Value::Weekday(d.weekday())),
        (Value::Date(d), "Day") => Some(Value::Int(i64::from(d.day()))),
        (Value::Date(d), "Month") => Some(Value::Int(i64::from(d.month()))),
        (Value::Date(d), "Year") => Some(Value::Int(i64::from(d.year()))),
        (Value::Date(d), "DayOfYear") => Some(Value::Int(i64::from(d.ordinal()))),
        (Value::String(s), "Length") => Some(Value::Int(char_count(s))),
        (Value::List(items), "Count") => Some(Value::Int(len_as_int(items.len()))),
        (Value::Record(r), field) => r.get(field).cloned(),
        _ => None,
    };
    found.ok_or_else(|| unknown_member(value, member))
}

/// Method call on a non-collection value, e.g. `Date.AddDays(-7)`.
pub(crate) fn value_method(value: &Value, method: &str, args: &[Value]) -> Result<Value, EvalError> {
    let name = format!("{}.{method}", value.type_name());
    match (value, method) {
        (Value::Date(d), "AddDays") => {
            let n = int_arg(&name, args)?;
            let days = Days::new(n.unsigned_abs());
            if n >= 0 {
                d.checked_add_days(days)
            } else {
                d.checked_sub_days(days)
            }
            .map(Value::Date)
            .ok_or(EvalError::Overflow)
        }
        (Value::Date(d), "AddMonths") => {
            let n = int_arg(&name, args)?;
            let months = u32::try_from(n.unsigned_abs()).map_err(|_| EvalError::Overflow)?;
            if n >= 0 {
                d.checked_add_months(Months::new(months))
            } else {
                d.checked_sub_months(Months::new(months))
            }
            .map(Value::Date)
            .ok_or(EvalError::Overflow)
        }
        (Value::String(s), "Contains") => Ok(Value::Bool(s.contains(string_arg(&name, args)?))),
        (Value::String(s), "StartsWith") => {
            Ok(Value::Bool(s.starts_with(string_arg(&name, args)?)))
        }
        (Value::String(s), "EndsWith") => Ok(Value::Bool(s.ends_with(string_arg(&name, args)?))),
        (Value::String(s), "ToUpper") => {
            arity(&name, args, 0)?;
            Ok(Value::String(s.to_uppercase()))
        }
        (Value::String(s), "ToLower") => {
            arity(&name, args, 0)?;
            Ok(Value::String(s.to_lowercase()))
        }
        _ => Err(unknown_member(value, method)),
    }
}

// -- Conversions ------------------------------------------------------------

/// `Convert.ToInt32`: decimals round half to even, and the result must fit
/// in 32 bits.
#[allow(clippy::cast_possible_truncation)]
fn to_int32(value: &Value) -> Result<i64, EvalError> {
    let wide = match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => {
            let rounded = f.round_ties_even();
            (rounded.is_finite()
                && rounded >= f64::from(i32::MIN)
                && rounded <= f64::from(i32::MAX))
            .then_some(rounded as i64)
        }
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    wide.and_then(|i| i32::try_from(i).ok())
        .map(i64::from)
        .ok_or_else(|| conversion(&value.render(), "int"))
}

/// Parse a decimal, rejecting `NaN` and infinities.
fn parse_decimal(s: &str) -> Result<f64, EvalError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| conversion(s, "decimal"))
}

#[allow(clippy::cast_precision_loss)]
fn to_decimal(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) if f.is_finite() => Ok(*f),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_decimal(s),
        other => Err(conversion(&other.render(), "decimal")),
    }
}

fn min_max(name: &str, args: &[Value], min: bool) -> Result<Value, EvalError> {
    arity(name, args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(if min { *a.min(b) } else { *a.max(b) })),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Float(if min { x.min(y) } else { x.max(y) })),
            (None, _) => Err(unexpected("number", a)),
            (_, None) => Err(unexpected("number", b)),
        },
    }
}

// -- Argument helpers -------------------------------------------------------

fn arity(name: &str, args: &[impl Sized], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::ArityMismatch {
            function: name.to_owned(),
            expected,
            found: args.len(),
        })
    }
}

fn single_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, EvalError> {
    arity(name, args, 1)?;
    Ok(&args[0])
}

fn string_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a str, EvalError> {
    let arg = single_arg(name, args)?;
    arg.as_str().ok_or_else(|| unexpected("string", arg))
}

fn int_arg(name: &str, args: &[Value]) -> Result<i64, EvalError> {
    let arg = single_arg(name, args)?;
    arg.as_int().ok_or_else(|| unexpected("int", arg))
}

pub(crate) fn unexpected(expected: &str, found: &Value) -> EvalError {
    EvalError::UnexpectedType {
        expected: expected.to_owned(),
        found: found.type_name().to_owned(),
    }
}

pub(crate) fn unknown_member(value: &Value, member: &str) -> EvalError {
    EvalError::UnknownMember {
        type_name: value.type_name().to_owned(),
        member: member.to_owned(),
    }
}

fn conversion(value: &str, target: &str) -> EvalError {
    EvalError::Conversion {
        value: value.to_owned(),
        target: target.to_owned(),
    }
}

pub(crate) fn len_as_int(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn char_count(s: &str) -> i64 {
    len_as_int(s.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekday_constants() {
        assert_eq!(constant("Monday"), Some(Value::Weekday(Weekday::Mon)));
        assert_eq!(constant("Sunday"), Some(Value::Weekday(Weekday::Sun)));
        assert_eq!(constant("monday"), None);
        assert_eq!(
            namespace_member("DayOfWeek", "Saturday"),
            Ok(Value::Weekday(Weekday::Sat))
        );
        assert!(namespace_member("DayOfWeek", "Someday").is_err());
    }

    #[test]
    fn today_is_a_date() {
        assert!(matches!(namespace_member("DateTime", "Today"), Ok(Value::Date(_))));
    }

    #[test]
    fn parse_helpers() {
        let s = |v: &str| vec![Value::String(v.into())];
        assert_eq!(namespace_call("int", "Parse", &s(" 42 ")), Ok(Value::Int(42)));
        assert_eq!(namespace_call("decimal", "Parse", &s("2.5")), Ok(Value::Float(2.5)));
        assert_eq!(
            namespace_call("DateTime", "Parse", &s("2024-06-08")),
            Ok(Value::Date(date(2024, 6, 8)))
        );
        assert!(matches!(
            namespace_call("int", "Parse", &s("forty")),
            Err(EvalError::Conversion { .. })
        ));
        assert!(matches!(
            namespace_call("int", "Parse", &[Value::Int(1)]),
            Err(EvalError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn convert_helpers() {
        assert_eq!(
            namespace_call("Convert", "ToInt32", &[Value::Float(2.6)]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            namespace_call("Convert", "ToDecimal", &[Value::Int(4)]),
            Ok(Value::Float(4.0))
        );
        assert_eq!(
            namespace_call("Convert", "ToString", &[Value::String("x".into())]),
            Ok(Value::String("x".into()))
        );
        assert!(matches!(
            namespace_call("Convert", "ToInt32", &[Value::Float(f64::NAN)]),
            Err(EvalError::Conversion { .. })
        ));
    }

    #[test]
    fn decimals_must_be_finite() {
        for raw in ["NaN", "inf", "-infinity", "1e400"] {
            assert!(
                matches!(
                    namespace_call("decimal", "Parse", &[Value::String(raw.into())]),
                    Err(EvalError::Conversion { .. })
                ),
                "{raw}"
            );
            assert!(
                matches!(
                    namespace_call("Convert", "ToDecimal", &[Value::String(raw.into())]),
                    Err(EvalError::Conversion { .. })
                ),
                "{raw}"
            );
        }
    }

    #[test]
    fn to_int32_rounds_half_to_even_within_range() {
        let to_int32 = |v: Value| namespace_call("Convert", "ToInt32", &[v]);
        assert_eq!(to_int32(Value::Float(2.5)), Ok(Value::Int(2)));
        assert_eq!(to_int32(Value::Float(3.5)), Ok(Value::Int(4)));
        assert_eq!(to_int32(Value::Float(-2.5)), Ok(Value::Int(-2)));
        assert_eq!(to_int32(Value::Int(2_147_483_647)), Ok(Value::Int(2_147_483_647)));
        assert_eq!(to_int32(Value::String("-17".into())), Ok(Value::Int(-17)));
        for out_of_range in [
            Value::Int(3_000_000_000),
            Value::Float(2_147_483_648.0),
            Value::String("3000000000".into()),
        ] {
            assert!(matches!(to_int32(out_of_range), Err(EvalError::Conversion { .. })));
        }
    }

    #[test]
    fn math_helpers() {
        assert_eq!(namespace_call("Math", "Abs", &[Value::Int(-3)]), Ok(Value::Int(3)));
        assert_eq!(
            namespace_call("Math", "Min", &[Value::Int(3), Value::Int(7)]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            namespace_call("Math", "Max", &[Value::Int(3), Value::Float(7.5)]),
            Ok(Value::Float(7.5))
        );
        assert!(matches!(
            namespace_call("Math", "Abs", &[Value::Int(i64::MIN)]),
            Err(EvalError::Overflow)
        ));
        assert!(matches!(
            namespace_call("Math", "Min", &[Value::Int(1)]),
            Err(EvalError::ArityMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn unknown_function() {
        assert_eq!(
            namespace_call("Math", "Sqrt", &[Value::Int(4)]),
            Err(EvalError::UnknownFunction {
                name: "Math.Sqrt".into()
            })
        );
    }

    #[test]
    fn date_members_and_methods() {
        let saturday = Value::Date(date(2024, 6, 8));
        assert_eq!(
            value_member(&saturday, "DayOfWeek"),
            Ok(Value::Weekday(Weekday::Sat))
        );
        assert_eq!(value_member(&saturday, "Day"), Ok(Value::Int(8)));
        assert_eq!(value_member(&saturday, "Month"), Ok(Value::Int(6)));
        assert_eq!(value_member(&saturday, "Year"), Ok(Value::Int(2024)));
        assert_eq!(
            value_method(&saturday, "AddDays", &[Value::Int(2)]),
            Ok(Value::Date(date(2024, 6, 10)))
        );
        assert_eq!(
            value_method(&saturday, "AddDays", &[Value::Int(-8)]),
            Ok(Value::Date(date(2024, 5, 31)))
        );
        assert_eq!(
            value_method(&saturday, "AddMonths", &[Value::Int(-1)]),
            Ok(Value::Date(date(2024, 5, 8)))
        );
    }

    #[test]
    fn string_members_and_methods() {
        let text = Value::String("Coffee beans".into());
        assert_eq!(value_member(&text, "Length"), Ok(Value::Int(12)));
        assert_eq!(
            value_method(&text, "StartsWith", &[Value::String("Cof".into())]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            value_method(&text, "ToUpper", &[]),
            Ok(Value::String("COFFEE BEANS".into()))
        );
    }

    #[test]
    fn record_fields() {
        let rec = Value::Record(Record::new().set("Amount", 12_i64));
        assert_eq!(value_member(&rec, "Amount"), Ok(Value::Int(12)));
        assert_eq!(
            value_member(&rec, "Missing"),
            Err(EvalError::UnknownMember {
                type_name: "record".into(),
                member: "Missing".into()
            })
        );
    }

    #[test]
    fn unknown_member_on_scalar() {
        assert!(matches!(
            value_member(&Value::Int(1), "Length"),
            Err(EvalError::UnknownMember { .. })
        ));
    }
}
