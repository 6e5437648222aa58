use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use rulecraft::{
    async_trait, ActionBinding, ActionContext, ActionError, ActionHandler, CancellationToken,
    Engine, Parameters, Value,
};

/// Pretends to call a slow downstream service.
struct Notify;

#[async_trait]
impl ActionHandler for Notify {
    async fn execute(
        &mut self,
        context: &ActionContext,
        _parameters: &Parameters,
    ) -> Result<Value, ActionError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(context.get("channel").cloned().unwrap_or(Value::Bool(true)))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rulecraft=info".into()),
        )
        .init();

    let mut engine = Engine::from_dsl(
        r#"
workflow TransactionProcessing

rule MondayValidation:
    Date.DayOfWeek != Monday
    error "Transactions are not allowed on Mondays..."
    on_failure Notify { channel: "ops" }

rule WeekendDiscount:
    Date.DayOfWeek == Saturday || Date.DayOfWeek == Sunday
    on_success OutputExpression { expression: "Amount * 0.9" }
"#,
    )?;
    engine.register_action("Notify", || Notify);
    let engine = Arc::new(engine);

    let start = NaiveDate::from_ymd_opt(2024, 6, 3).ok_or("invalid date")?;
    let mut handles = Vec::new();
    for offset in 0..7 {
        let engine = Arc::clone(&engine);
        let date = start + Days::new(offset);
        handles.push(tokio::spawn(async move {
            let params = Parameters::new().set("Date", date).set("Amount", 100_i64);
            let results = engine.execute_all("TransactionProcessing", &params).await;
            (date, results)
        }));
    }
    for handle in handles {
        let (date, results) = handle.await?;
        let summary: Vec<String> = results?.iter().map(ToString::to_string).collect();
        println!("{date}: {}", summary.join("; "));
    }

    // A caller that gives up early: the verdicts still arrive, the slow
    // notification reports cancellation.
    let token = CancellationToken::new();
    let timeout = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        timeout.cancel();
    });
    let params = Parameters::new().set("Date", start).set("Amount", 100_i64);
    for result in engine
        .execute_all_with_cancellation("TransactionProcessing", &params, &token)
        .await?
    {
        println!("cancelled run: {result}");
    }

    Ok(())
}
