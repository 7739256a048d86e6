// Error types for workflow loading, seeding and runner start-up

/// Result type for core operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors that prevent a workflow from being loaded or started.
///
/// Failures that happen while a run is in progress are not errors: they are
/// recorded as [`crate::report::StepFailure`] entries in the report.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The workflow has no steps.
    #[error("workflow '{0}' has no steps")]
    EmptyWorkflow(String),

    /// A template referenced a key that is not in the context.
    #[error("unresolved reference to context key '{0}'")]
    UnresolvedReference(String),

    /// A context key was written twice.
    #[error("context key '{0}' is already set and cannot be overwritten")]
    ContextConflict(String),

    /// A workflow document could not be parsed.
    #[error("invalid workflow document: {0}")]
    Parse(#[from] toml::de::Error),

    /// A workflow document could not be read.
    #[error("failed to read workflow document: {0}")]
    Io(#[from] std::io::Error),

    /// A generator was misconfigured.
    #[error("invalid generator for '{key}': {message}")]
    Generator { key: String, message: String },
}
