use winnow::combinator::{cut_err, opt, preceded, repeat, separated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;

use crate::types::{ActionBinding, ActionContext, Rule, Workflow};
use crate::Value;

use super::expr::{expr, ident, literal, string_literal, ws};

fn keyword<'i>(kw: &'static str) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    ident.verify(move |s: &str| s == kw)
}

// -- Action bindings --------------------------------------------------------

fn context_entry(input: &mut &str) -> ModalResult<(String, Value)> {
    ws.parse_next(input)?;
    let key = ident.parse_next(input)?;
    (ws, cut_err(':')).parse_next(input)?;
    let value = cut_err(literal).parse_next(input)?;
    Ok((key.to_owned(), value))
}

fn action_context(input: &mut &str) -> ModalResult<ActionContext> {
    (ws, '{').parse_next(input)?;
    let entries: Vec<(String, Value)> =
        separated(0.., context_entry, (ws, ',')).parse_next(input)?;
    (ws, cut_err('}')).parse_next(input)?;
    Ok(entries.into_iter().collect())
}

fn action_binding(input: &mut &str) -> ModalResult<ActionBinding> {
    ws.parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "action name",
        )))
        .parse_next(input)?;
    let context = opt(action_context).parse_next(input)?.unwrap_or_default();
    Ok(ActionBinding {
        action_name: name.to_owned(),
        context,
    })
}

// -- Rule clauses -----------------------------------------------------------

enum Clause {
    Error(String),
    Event(String),
    OnSuccess(ActionBinding),
    OnFailure(ActionBinding),
}

fn clause(input: &mut &str) -> ModalResult<Clause> {
    ws.parse_next(input)?;
    let kw = ident
        .verify(|s: &str| matches!(s, "error" | "event" | "on_success" | "on_failure"))
        .parse_next(input)?;
    match kw {
        "error" => preceded(ws, cut_err(string_literal))
            .map(Clause::Error)
            .parse_next(input),
        "event" => preceded(ws, cut_err(string_literal))
            .map(Clause::Event)
            .parse_next(input),
        "on_success" => action_binding.map(Clause::OnSuccess).parse_next(input),
        _ => action_binding.map(Clause::OnFailure).parse_next(input),
    }
}

// -- Rule and workflow definitions ------------------------------------------

fn rule_def(input: &mut &str) -> ModalResult<Rule> {
    ws.parse_next(input)?;
    keyword("rule").parse_next(input)?;
    ws.parse_next(input)?;

    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "rule name",
        )))
        .parse_next(input)?;

    (ws, cut_err(':')).parse_next(input)?;

    let source = cut_err(expr.take())
        .context(StrContext::Expected(StrContextValue::Description(
            "rule expression",
        )))
        .parse_next(input)?;

    let mut rule = Rule::new(name, source.trim());

    let clauses: Vec<Clause> = repeat(0.., clause).parse_next(input)?;
    for clause in clauses {
        let already_set = match clause {
            Clause::Error(msg) => rule.error_message.replace(msg).is_some(),
            Clause::Event(event) => rule.success_event.replace(event).is_some(),
            Clause::OnSuccess(binding) => rule.on_success.replace(binding).is_some(),
            Clause::OnFailure(binding) => rule.on_failure.replace(binding).is_some(),
        };
        if already_set {
            return Err(ErrMode::Cut(ContextError::new()));
        }
    }

    Ok(rule)
}

fn workflow_def(input: &mut &str) -> ModalResult<Workflow> {
    ws.parse_next(input)?;
    keyword("workflow").parse_next(input)?;
    ws.parse_next(input)?;

    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "workflow name",
        )))
        .parse_next(input)?;

    let rules: Vec<Rule> = repeat(0.., rule_def).parse_next(input)?;

    Ok(Workflow {
        name: name.to_owned(),
        rules,
    })
}

// -- Top-level parser -------------------------------------------------------

pub(crate) fn workflows(input: &mut &str) -> ModalResult<Vec<Workflow>> {
    let defs: Vec<Workflow> = repeat(1.., workflow_def).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(defs)
}

#[cfg(test)]
mod tests {
    use crate::parse::parse_workflows;
    use crate::Value;

    #[test]
    fn parse_single_workflow() {
        let input = r#"
workflow TransactionProcessing

rule MondayValidation:
    Date.DayOfWeek != DayOfWeek.Monday
    error "Transactions are not allowed on Mondays..."
"#;
        let workflows = parse_workflows(input).unwrap();
        assert_eq!(workflows.len(), 1);
        let wf = &workflows[0];
        assert_eq!(wf.name, "TransactionProcessing");
        assert_eq!(wf.rules.len(), 1);
        assert_eq!(wf.rules[0].name, "MondayValidation");
        assert_eq!(
            wf.rules[0].expression,
            "Date.DayOfWeek != DayOfWeek.Monday"
        );
        assert_eq!(
            wf.rules[0].error_message.as_deref(),
            Some("Transactions are not allowed on Mondays...")
        );
    }

    #[test]
    fn parse_action_bindings() {
        let input = r#"
workflow Bonus
rule MinimumAgeValidation:
    Age >= 18
    on_success ApplyBonus { percent: 5, label: "adult", strict: true }
    on_failure LogRejection
"#;
        let wf = parse_workflows(input).unwrap().remove(0);
        let rule = &wf.rules[0];
        let success = rule.on_success.as_ref().unwrap();
        assert_eq!(success.action_name, "ApplyBonus");
        assert_eq!(success.context.get("percent"), Some(&Value::Int(5)));
        assert_eq!(
            success.context.get("label"),
            Some(&Value::String("adult".into()))
        );
        assert_eq!(success.context.get("strict"), Some(&Value::Bool(true)));
        let failure = rule.on_failure.as_ref().unwrap();
        assert_eq!(failure.action_name, "LogRejection");
        assert!(failure.context.is_empty());
    }

    #[test]
    fn parse_event_clause_and_multiline_expression() {
        let input = r#"
workflow W
rule WeekendDiscount:
    Date.DayOfWeek == Saturday
        || Date.DayOfWeek == Sunday
    event "WeekendDiscountApplied"
"#;
        let wf = parse_workflows(input).unwrap().remove(0);
        let rule = &wf.rules[0];
        assert!(rule.expression.starts_with("Date.DayOfWeek == Saturday"));
        assert!(rule.expression.ends_with("Date.DayOfWeek == Sunday"));
        assert_eq!(rule.success_event.as_deref(), Some("WeekendDiscountApplied"));
    }

    #[test]
    fn parse_multiple_workflows_with_comments() {
        let input = r#"
# first
workflow A
rule a1:
    x == 1
rule a2:
    y == 2

# second
workflow B
rule b1:
    z > 0 # inline
"#;
        let workflows = parse_workflows(input).unwrap();
        assert_eq!(workflows.len(), 2);
        assert_eq!(workflows[0].rules.len(), 2);
        assert_eq!(workflows[1].name, "B");
        assert_eq!(workflows[1].rules[0].expression, "z > 0");
    }

    #[test]
    fn parse_negative_context_literal() {
        let input = "workflow W\nrule r:\n  x\n  on_success Adjust { delta: -3.5 }";
        let wf = parse_workflows(input).unwrap().remove(0);
        let binding = wf.rules[0].on_success.as_ref().unwrap();
        assert_eq!(binding.context.get("delta"), Some(&Value::Float(-3.5)));
    }

    #[test]
    fn reject_duplicate_clause() {
        let input = "workflow W\nrule r:\n  x\n  error \"a\"\n  error \"b\"";
        assert!(parse_workflows(input).is_err());
    }

    #[test]
    fn reject_missing_colon() {
        assert!(parse_workflows("workflow W\nrule r\n  x == 1").is_err());
    }

    #[test]
    fn reject_bad_expression() {
        assert!(parse_workflows("workflow W\nrule r:\n  x = 1").is_err());
    }

    #[test]
    fn reject_empty_input() {
        assert!(parse_workflows("# nothing here").is_err());
    }
}
