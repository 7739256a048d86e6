use crate::config::CliConfig;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use flowprobe_core::{
    lint, Clock, FixedClock, FixedSource, Seeder, SequentialWorkflowRunner, SystemClock,
    TimestampSource, UniqueSource, UuidSource, WorkflowReport, WorkflowSpec,
};
use flowprobe_http::ReqwestClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How `unique` generators make values unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SeedStrategy {
    #[default]
    Uuid,
    Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct SeedOptions {
    pub strategy: SeedStrategy,
    /// Use this token for every `{{unique}}`
    pub fixed_unique: Option<String>,
    /// Pretend today is this date
    pub today: Option<NaiveDate>,
}

impl SeedOptions {
    pub fn seeder(&self) -> Seeder {
        let clock: Arc<dyn Clock> = match self.today {
            Some(date) => Arc::new(FixedClock::on(date)),
            None => Arc::new(SystemClock),
        };

        let unique: Arc<dyn UniqueSource> = match (&self.fixed_unique, self.strategy) {
            (Some(token), _) => Arc::new(FixedSource(token.clone())),
            (None, SeedStrategy::Uuid) => Arc::new(UuidSource),
            (None, SeedStrategy::Timestamp) => Arc::new(TimestampSource::new(clock.clone())),
        };

        Seeder::new(clock, unique)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub flow: PathBuf,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub vars: Vec<(String, String)>,
    pub seed: SeedOptions,
}

/// Load a workflow and fail if the lint pass finds anything
pub fn load_and_lint(flow: &Path, seeded: &[String]) -> Result<WorkflowSpec> {
    let workflow = WorkflowSpec::load(flow)
        .with_context(|| format!("Failed to load workflow {}", flow.display()))?;

    let issues = lint(&workflow, seeded);
    if !issues.is_empty() {
        for issue in &issues {
            tracing::warn!("{}", issue);
        }
        let details = issues
            .iter()
            .map(|i| format!("  - {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        bail!(
            "Workflow {} has {} lint issue(s):\n{}",
            flow.display(),
            issues.len(),
            details
        );
    }

    Ok(workflow)
}

/// Run a workflow file end to end against the configured service
pub async fn execute(options: &RunOptions, config: &CliConfig) -> Result<(WorkflowSpec, WorkflowReport)> {
    let vars = config.resolve_vars(&options.vars)?;
    let seeded: Vec<String> = vars.keys().cloned().collect();
    let workflow = load_and_lint(&options.flow, &seeded)?;

    let base_url = options
        .base_url
        .clone()
        .or_else(|| config.base_url.clone())
        .context("No base URL: pass --base-url, set FLOWPROBE_BASE_URL or base_url in the config file")?;
    let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(config.timeout_secs));

    tracing::info!("Running workflow {} against {}", workflow.name, base_url);

    let client = ReqwestClient::builder()
        .base_url(base_url)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let context = options
        .seed
        .seeder()
        .seed(&workflow, &vars)
        .context("Failed to seed workflow context")?;

    let runner = SequentialWorkflowRunner::new(Arc::new(client)).with_request_timeout(timeout);
    let report = runner.run(&workflow, context).await?;

    Ok((workflow, report))
}
