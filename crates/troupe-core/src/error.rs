//! Agent-level error types.

use thiserror::Error;

/// Failures local to a single agent call.
///
/// These are converted into failed execution reports by the executor and
/// never propagate past the strategy layer.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The call exceeded its timeout budget
    #[error("agent call timed out")]
    Timeout,

    /// The integration reported a failure
    #[error("agent execution failed: {0}")]
    ExecutionFailed(String),

    /// The input could not be interpreted by the agent
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required input field was absent
    #[error("missing input field: {0}")]
    MissingInput(String),
}
