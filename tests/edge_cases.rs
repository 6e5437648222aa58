use chrono::{Days, Local, NaiveDate};
use rulecraft::{
    eval, ActionRegistry, Engine, EvalError, ExecuteError, Expression, Parameters, Record, Rule,
    RulecraftError, Value, Workflow, WorkflowError,
};

fn engine(workflow: Workflow) -> Engine {
    Engine::new([workflow], ActionRegistry::new()).unwrap()
}

async fn run(workflow: Workflow, params: &Parameters) -> Vec<rulecraft::RuleResult> {
    let name = workflow.name.clone();
    engine(workflow).execute_all(&name, params).await.unwrap()
}

#[tokio::test]
async fn short_circuit_hides_unknown_identifier() {
    let wf = Workflow::builder("wf")
        .rule("guarded", |r| r.when("false && Missing.Field > 3"))
        .rule("or_guarded", |r| r.when("true || Missing"))
        .build();
    let results = run(wf, &Parameters::new()).await;

    assert!(!results[0].is_success());
    assert!(results[0].evaluation_error().is_none());
    assert!(results[1].is_success());
}

#[tokio::test]
async fn unknown_workflow_is_an_error_not_an_empty_list() {
    let engine = engine(Workflow::builder("wf").rule("r", |r| r.when("true")).build());
    let err = engine
        .execute_all("Nope", &Parameters::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ExecuteError::WorkflowNotFound {
            name: "Nope".into()
        }
    );
}

#[tokio::test]
async fn failing_rule_does_not_stop_later_rules() {
    let wf = Workflow::builder("wf")
        .rule("broken", |r| r.when("Amount / 0 > 1"))
        .rule("mismatch", |r| r.when("Amount > \"ten\""))
        .rule("not_bool", |r| r.when("Amount + 1"))
        .rule("fine", |r| r.when("Amount == 10"))
        .build();
    let results = run(wf, &Parameters::new().set("Amount", 10_i64)).await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].evaluation_error(), Some(&EvalError::DivisionByZero));
    assert!(matches!(
        results[1].evaluation_error(),
        Some(EvalError::TypeMismatch { .. })
    ));
    assert_eq!(
        results[2].evaluation_error(),
        Some(&EvalError::NotBoolean {
            found: "int".into()
        })
    );
    assert!(results[3].is_success());
}

#[tokio::test]
async fn results_follow_declared_order() {
    let names = ["zeta", "alpha", "mid", "beta"];
    let mut builder = Workflow::builder("wf");
    for name in names {
        builder = builder.rule(name, |r| r.when("true"));
    }
    let results = run(builder.build(), &Parameters::new()).await;
    let got: Vec<&str> = results.iter().map(|r| r.rule_name()).collect();
    assert_eq!(got, names);
}

#[tokio::test]
async fn nested_collection_predicates() {
    let line = |sku: &str, qty: i64| Value::Record(Record::new().set("Sku", sku).set("Qty", qty));
    let order = |id: i64, lines: Vec<Value>| {
        Value::Record(Record::new().set("Id", id).set("Lines", Value::List(lines)))
    };
    let params = Parameters::new().set(
        "Orders",
        Value::List(vec![
            order(1, vec![line("A-1", 2), line("B-7", 12)]),
            order(2, vec![line("A-1", 1)]),
            order(3, vec![]),
        ]),
    );

    let wf = Workflow::builder("wf")
        .rule("has_bulk_order", |r| {
            r.when("Orders.Any(o => o.Lines.Any(l => l.Qty >= 10))")
        })
        .rule("every_order_has_lines", |r| r.when("Orders.All(Lines.Count > 0)"))
        .rule("two_orders_with_a1", |r| {
            r.when("Orders.Where(Lines.Any(Sku.StartsWith(\"A-\"))).Count == 2")
        })
        .build();
    let results = run(wf, &params).await;

    let verdicts: Vec<bool> = results.iter().map(|r| r.is_success()).collect();
    assert_eq!(verdicts, [true, false, true]);
}

#[tokio::test]
async fn dates_compare_and_shift() {
    let params = Parameters::new()
        .set("Date", NaiveDate::from_ymd_opt(2024, 2, 28).unwrap())
        .set("Cutoff", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    let wf = Workflow::builder("wf")
        .rule("before_cutoff", |r| r.when("Date < Cutoff"))
        .rule("leap_day", |r| r.when("Date.AddDays(1).Day == 29"))
        .rule("next_month", |r| r.when("Date.AddMonths(1).Month == 3"))
        .build();
    let results = run(wf, &params).await;
    assert!(results.iter().all(|r| r.is_success()));
}

#[test]
fn empty_workflow_is_rejected() {
    let err = Engine::new([Workflow::new("empty", Vec::new())], ActionRegistry::new())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::EmptyWorkflow { .. }));
}

#[test]
fn malformed_expression_names_rule_and_workflow() {
    let wf = Workflow::new("wf", vec![Rule::new("bad", "Amount >")]);
    let err = Engine::new([wf], ActionRegistry::new()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("'bad'"), "{msg}");
    assert!(msg.contains("'wf'"), "{msg}");
}

#[test]
fn deeply_nested_expression() {
    let mut src = String::from("x");
    for _ in 0..64 {
        src = format!("({src} + 1)");
    }
    let expr = Expression::parse(&src).unwrap();
    assert_eq!(
        expr.evaluate(&Parameters::new().set("x", 0_i64)),
        Ok(Value::Int(64))
    );
}

#[test]
fn unicode_strings_count_chars() {
    let expr = Expression::parse("Name.Length == 5 && Name.ToUpper() == \"ÅNGEL\"").unwrap();
    let params = Parameters::new().set("Name", "ångel");
    assert_eq!(expr.evaluate_bool(&params), Ok(true));
}

#[test]
fn dates_compare_against_relative_today() {
    let today = Local::now().date_naive();
    let recent = Parameters::new().set("Date", today - Days::new(3));
    let stale = Parameters::new().set("Date", today - Days::new(30));
    let src = "Date >= DateTime.Today.AddDays(-7)";
    assert_eq!(eval(src, &recent).unwrap(), Value::Bool(true));
    assert_eq!(eval(src, &stale).unwrap(), Value::Bool(false));
}

#[test]
fn one_shot_eval_reports_parse_and_eval_errors() {
    let params = Parameters::new();
    assert!(matches!(eval("1 +", &params), Err(RulecraftError::Parse(_))));
    assert!(matches!(
        eval("Missing > 1", &params),
        Err(RulecraftError::Eval(EvalError::UnknownIdentifier { .. }))
    ));
}
