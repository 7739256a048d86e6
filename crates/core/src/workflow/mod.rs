pub mod runner;
pub mod step_executor;

pub use runner::{RunState, SequentialWorkflowRunner};
pub use step_executor::StepExecutor;
