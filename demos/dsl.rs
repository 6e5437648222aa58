use chrono::NaiveDate;
use rulecraft::{Engine, Parameters};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::from_file("demos/transactions.rules")?;

    for name in engine.workflow_names() {
        if let Some(workflow) = engine.get_workflow(name) {
            println!("{workflow}");
        }
    }

    let params = Parameters::new()
        .set("Date", NaiveDate::from_ymd_opt(2024, 6, 9).ok_or("invalid date")?)
        .set("Amount", 7500_i64);

    for result in engine.execute_all("TransactionProcessing", &params).await? {
        println!("  {result}");
    }

    Ok(())
}
