//! Run the booking workflow against a live deployment.
//!
//! Run with:
//!   FLOWPROBE_BASE_URL=https://stage-api.example.com \
//!   FLOWPROBE_USERNAME=... FLOWPROBE_PASSWORD=... FLOWPROBE_TENANT=... \
//!   cargo run -p flowprobe-http --example booking_flow

use flowprobe_core::{Seeder, SequentialWorkflowRunner, WorkflowSpec};
use flowprobe_http::ReqwestClient;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let base_url = std::env::var("FLOWPROBE_BASE_URL")?;
    let client = ReqwestClient::builder()
        .base_url(base_url)
        .timeout(Duration::from_secs(30))
        .build()?;

    let workflow = WorkflowSpec::load(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../flows/ecare_booking.toml"
    ))?;

    let mut vars = BTreeMap::new();
    for (key, env) in [
        ("username", "FLOWPROBE_USERNAME"),
        ("password", "FLOWPROBE_PASSWORD"),
        ("tenant", "FLOWPROBE_TENANT"),
    ] {
        vars.insert(key.to_string(), Value::String(std::env::var(env)?));
    }

    let context = Seeder::default().seed(&workflow, &vars)?;
    let runner = SequentialWorkflowRunner::new(Arc::new(client));
    let report = runner.run(&workflow, context).await?;

    for step in &report.steps {
        println!(
            "{:<28} {:?} {}",
            step.name,
            step.status,
            step.status_code.map(|s| s.to_string()).unwrap_or_default()
        );
        for failure in &step.failures {
            println!("    {}", failure);
        }
    }
    for step in &report.not_executed {
        println!("{:<28} not executed", step);
    }

    println!("\nWorkflow {}", if report.passed() { "passed" } else { "failed" });
    Ok(())
}
