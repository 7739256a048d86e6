// Core types and execution for flowprobe sequential API workflows

pub mod assertion;
pub mod client;
pub mod context;
pub mod error;
pub mod extract;
pub mod lint;
pub mod report;
pub mod seed;
pub mod template;
pub mod types;
pub mod workflow;

pub use client::{HttpClient, HttpRequest, HttpResponse};
pub use context::WorkflowContext;
pub use error::{FlowError, FlowResult};
pub use lint::{lint, LintIssue};
pub use report::{FailureKind, RunStatus, StepFailure, StepResult, StepStatus, WorkflowReport};
pub use seed::{Clock, FixedClock, FixedSource, Seeder, SystemClock, TimestampSource, UniqueSource, UuidSource};
pub use types::*;
pub use workflow::{RunState, SequentialWorkflowRunner};
