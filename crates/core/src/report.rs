// Step and run outcomes

use crate::types::{RunId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest expected/actual snippet kept in a failure
const SNIPPET_LIMIT: usize = 200;

/// Outcome of an executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    Failed,
}

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Request could not be sent or the response could not be received
    Transport,
    /// Status code differs from the expected one
    UnexpectedStatus,
    /// Response body is not valid JSON
    InvalidBody,
    /// Body does not satisfy an assertion
    AssertionFailure,
    /// An extraction found nothing
    MissingIdentifier,
    /// A template referenced a key that is not in the context
    UnresolvedReference,
    /// An extraction tried to overwrite an existing context key
    ContextConflict,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Transport => "transport error",
            Self::UnexpectedStatus => "unexpected status",
            Self::InvalidBody => "invalid body",
            Self::AssertionFailure => "assertion failure",
            Self::MissingIdentifier => "missing identifier",
            Self::UnresolvedReference => "unresolved reference",
            Self::ContextConflict => "context conflict",
        };
        f.write_str(label)
    }
}

/// A single recorded failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl StepFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(snippet(&expected.into()));
        self
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(snippet(&actual.into()));
        self
    }
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(expected) = &self.expected {
            write!(f, " (expected: {}", expected)?;
            match &self.actual {
                Some(actual) => write!(f, ", actual: {})", actual)?,
                None => write!(f, ")")?,
            }
        } else if let Some(actual) = &self.actual {
            write!(f, " (actual: {})", actual)?;
        }
        Ok(())
    }
}

/// Truncate text for display in a report
pub fn snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_LIMIT {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(SNIPPET_LIMIT).collect();
    truncated.push('…');
    truncated
}

/// Result of executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: StepId,
    pub name: String,
    pub status: StepStatus,
    /// Absent when the request never produced a response
    pub status_code: Option<u16>,
    /// Parsed response body, when it was valid JSON. Left out for steps
    /// that extract the auth token.
    pub body: Option<Value>,
    /// Empty on success
    pub failures: Vec<StepFailure>,
    /// Context keys written by this step
    pub extracted: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.status == StepStatus::Passed
    }
}

/// Ordered step results for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub run_id: RunId,
    pub workflow: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Executed steps, up to and including the first failure
    pub steps: Vec<StepResult>,
    /// Steps never started because an earlier step failed
    pub not_executed: Vec<StepId>,
}

impl WorkflowReport {
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    /// The step that halted the run, if any
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.passed())
    }

    /// First failure of the halting step
    pub fn first_failure(&self) -> Option<&StepFailure> {
        self.failed_step().and_then(|s| s.failures.first())
    }

    pub fn duration_ms(&self) -> u64 {
        (self.completed_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}
