use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod report;
mod run;

use config::{parse_var, CliConfig};
use report::{render, OutputFormat};
use run::{RunOptions, SeedOptions, SeedStrategy};

#[derive(Parser, Debug)]
#[command(name = "flowprobe")]
#[command(about = "Run multi-step API workflows and report where they break", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "flowprobe.toml")]
    config: PathBuf,

    /// Log request and context details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a workflow against a live service
    Run {
        /// Workflow file (TOML)
        flow: PathBuf,

        /// Base URL of the service under test
        #[arg(long, env = "FLOWPROBE_BASE_URL")]
        base_url: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Seed a context value, e.g. --var tenant=stage
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Source of `{{unique}}` tokens
        #[arg(long, value_enum, default_value = "uuid")]
        seed_strategy: SeedStrategy,

        /// Use a fixed `{{unique}}` token
        #[arg(long)]
        fixed_unique: Option<String>,

        /// Override today's date for date generators (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Check a workflow for reference and id problems without running it
    Lint {
        /// Workflow file (TOML)
        flow: PathBuf,

        /// Keys that will be seeded at run time, e.g. --var tenant=stage
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "flowprobe=debug,flowprobe_core=debug,flowprobe_http=debug"
    } else {
        "flowprobe=info,flowprobe_core=info,flowprobe_http=info"
    };

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the workflow passed
async fn dispatch(args: Args) -> Result<bool> {
    let config = CliConfig::load(&args.config)?;

    match args.command {
        Command::Run {
            flow,
            base_url,
            timeout,
            vars,
            format,
            seed_strategy,
            fixed_unique,
            today,
        } => {
            let options = RunOptions {
                flow,
                base_url,
                timeout_secs: timeout,
                vars,
                seed: SeedOptions {
                    strategy: seed_strategy,
                    fixed_unique,
                    today,
                },
            };

            let (workflow, report) = run::execute(&options, &config).await?;
            println!("{}", render(&report, &workflow, format)?);
            Ok(report.passed())
        }
        Command::Lint { flow, vars } => {
            let workflow = run::load_and_lint(&flow, &config.seeded_keys(&vars))?;
            println!(
                "{}: {} step(s), no issues",
                workflow.name,
                workflow.steps.len()
            );
            Ok(true)
        }
    }
}
