use anyhow::Result;
use clap::ValueEnum;
use flowprobe_core::{WorkflowReport, WorkflowSpec};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render(report: &WorkflowReport, workflow: &WorkflowSpec, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report, workflow)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

/// One line per step, failures indented under the failing step
pub fn render_text(report: &WorkflowReport, workflow: &WorkflowSpec) -> String {
    let mut out = String::new();
    let total = report.steps.len() + report.not_executed.len();

    let _ = writeln!(out, "Workflow {} (run {})", report.workflow, report.run_id);

    for step in &report.steps {
        let label = if step.passed() { "PASS" } else { "FAIL" };
        let status = step
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "---".to_string());
        let _ = writeln!(
            out,
            "  {}  {:<32} {:>4} {:>7}ms",
            label, step.name, status, step.duration_ms
        );
        for failure in &step.failures {
            let _ = writeln!(out, "        {}", failure);
        }
    }

    for id in &report.not_executed {
        let name = workflow
            .step(id)
            .map(|s| s.name.as_str())
            .unwrap_or(id.0.as_str());
        let _ = writeln!(out, "  SKIP  {:<32} not executed", name);
    }

    match report.failed_step() {
        None => {
            let _ = writeln!(
                out,
                "Result: PASSED ({}/{} steps, {}ms)",
                report.steps.len(),
                total,
                report.duration_ms()
            );
        }
        Some(failed) => {
            let _ = writeln!(
                out,
                "Result: FAILED at step '{}' ({}/{} executed, {}ms)",
                failed.step_id,
                report.steps.len(),
                total,
                report.duration_ms()
            );
        }
    }

    out
}
