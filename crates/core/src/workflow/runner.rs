use super::step_executor::StepExecutor;
use crate::client::HttpClient;
use crate::context::WorkflowContext;
use crate::error::{FlowError, FlowResult};
use crate::report::{RunStatus, WorkflowReport};
use crate::types::{RunId, WorkflowSpec};
use std::sync::Arc;
use std::time::Duration;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running { step: usize },
    Failed { step: usize },
    Completed,
}

impl RunState {
    /// Move to the next state. Terminal states never change.
    pub fn next(self, step_passed: bool, total_steps: usize) -> Self {
        match self {
            RunState::NotStarted => RunState::Running { step: 0 },
            RunState::Running { step } if !step_passed => RunState::Failed { step },
            RunState::Running { step } if step + 1 < total_steps => RunState::Running { step: step + 1 },
            RunState::Running { .. } => RunState::Completed,
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Failed { .. } | RunState::Completed)
    }
}

/// Executes the steps of a workflow strictly in order, halting at the first
/// failing step
pub struct SequentialWorkflowRunner {
    step_executor: StepExecutor,
}

impl SequentialWorkflowRunner {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            step_executor: StepExecutor::new(client, Self::DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Timeout for steps that do not set their own
    pub fn with_request_timeout(self, timeout: Duration) -> Self {
        Self {
            step_executor: StepExecutor::new(self.step_executor.client(), timeout),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.step_executor.default_timeout()
    }

    /// Run a workflow starting from `context`.
    ///
    /// Only an empty workflow is an error; step failures end up in the report.
    /// The context is dropped when the run ends.
    pub async fn run(
        &self,
        workflow: &WorkflowSpec,
        context: WorkflowContext,
    ) -> FlowResult<WorkflowReport> {
        if workflow.steps.is_empty() {
            return Err(FlowError::EmptyWorkflow(workflow.name.clone()));
        }

        let run_id = RunId::new();
        let started_at = chrono::Utc::now();
        let total = workflow.steps.len();

        tracing::info!(
            "Starting workflow execution: run_id={}, workflow={}, steps={}",
            run_id,
            workflow.name,
            total
        );

        let mut ctx = context;
        let mut state = RunState::NotStarted.next(true, total);
        let mut results = Vec::with_capacity(total);

        while let RunState::Running { step } = state {
            let result = self
                .step_executor
                .execute(workflow, &workflow.steps[step], &mut ctx)
                .await;
            let passed = result.passed();
            results.push(result);
            state = state.next(passed, total);
        }

        let not_executed = workflow.steps[results.len()..]
            .iter()
            .map(|s| s.id.clone())
            .collect::<Vec<_>>();

        let status = match state {
            RunState::Completed => {
                tracing::info!("Workflow execution completed: run_id={}", run_id);
                RunStatus::Passed
            }
            _ => {
                tracing::error!(
                    "Workflow execution failed: run_id={}, failed_step={}, not_executed={}",
                    run_id,
                    results.last().map(|r| r.step_id.0.as_str()).unwrap_or("-"),
                    not_executed.len()
                );
                RunStatus::Failed
            }
        };

        Ok(WorkflowReport {
            run_id,
            workflow: workflow.name.clone(),
            status,
            started_at,
            completed_at: chrono::Utc::now(),
            steps: results,
            not_executed,
        })
    }
}
