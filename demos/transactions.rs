use chrono::NaiveDate;
use rulecraft::{
    async_trait, ActionBinding, ActionContext, ActionError, ActionHandler, ActionRegistry, Engine,
    Parameters, Value, Workflow,
};

/// Grants a percentage of the transaction amount as a loyalty bonus.
struct AgeBonus;

#[async_trait]
impl ActionHandler for AgeBonus {
    async fn execute(
        &mut self,
        context: &ActionContext,
        parameters: &Parameters,
    ) -> Result<Value, ActionError> {
        let percent = context.get("percent").and_then(Value::as_f64).unwrap_or(0.0);
        let amount = parameters
            .get("Amount")
            .and_then(Value::as_f64)
            .ok_or_else(|| ActionError::failed("AgeBonus", "no Amount parameter"))?;
        Ok(Value::Float(amount * percent / 100.0))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rulecraft=debug".into()),
        )
        .init();

    let transactions = Workflow::builder("TransactionProcessing")
        .rule("MondayValidation", |r| {
            r.when("Date.DayOfWeek != DayOfWeek.Monday")
                .error_message("Transactions are not allowed on Mondays...")
        })
        .rule("WeekendDiscount", |r| {
            r.when("Date.DayOfWeek == Saturday || Date.DayOfWeek == Sunday")
                .success_event("WeekendDiscountApplied")
                .on_success(
                    ActionBinding::new("OutputExpression").with("expression", "Amount * 0.9"),
                )
        })
        .build();

    let customers = Workflow::builder("CustomerValidation")
        .rule("MinimumAgeValidation", |r| {
            r.when("Age >= 18")
                .error_message("Customer is $(Age), must be at least 18")
                .on_success(ActionBinding::new("AgeBonus").with("percent", 5_i64))
        })
        .build();

    let actions = ActionRegistry::new().with("AgeBonus", || AgeBonus);
    let engine = Engine::new([transactions, customers], actions)?;

    for (date, amount) in [((2024, 6, 8), 100_i64), ((2024, 6, 10), 100), ((2024, 6, 12), 250)] {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).ok_or("invalid date")?;
        let params = Parameters::new().set("Date", date).set("Amount", amount);
        let results = engine.execute_all("TransactionProcessing", &params).await?;

        let accepted = results
            .iter()
            .find(|r| r.rule_name() == "MondayValidation")
            .is_some_and(|r| r.is_success());
        let final_amount = results
            .iter()
            .find(|r| r.rule_name() == "WeekendDiscount")
            .and_then(|r| r.action_result())
            .map_or_else(|| amount.to_string(), Value::render);

        println!("{date} ({}):", date.format("%A"));
        for result in &results {
            println!("  {result}");
        }
        if accepted {
            println!("  -> accepted, FinalAmount = {final_amount}");
        } else {
            println!("  -> rejected");
        }
    }

    for age in [16_i64, 42] {
        let params = Parameters::new().set("Age", age).set("Amount", 200_i64);
        for result in engine.execute_all("CustomerValidation", &params).await? {
            println!("age {age}: {result}");
        }
    }

    Ok(())
}
