//! Orchestrator error types.

use thiserror::Error;

use troupe_core::capability::CapabilityError;
use troupe_core::types::RunStatus;

/// Failures raised by the orchestration machinery itself.
///
/// These are never swallowed: they flip the workflow to `failed` and
/// propagate to the caller. Failures of individual agent calls are carried
/// inside execution reports instead.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Referenced workflow does not exist
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Capability token rejected before any state mutation
    #[error("authorization failed: {0}")]
    Unauthorized(#[from] CapabilityError),

    /// Agent type is not registered
    #[error("unknown agent type: {0}")]
    UnknownAgentType(String),

    /// An agent id appears more than once in one workflow
    #[error("duplicate agent id: {0}")]
    DuplicateAgentId(String),

    /// Workflow was created without agents
    #[error("workflow has no agents")]
    EmptyWorkflow,

    /// Malformed workflow configuration
    #[error("invalid workflow config: {0}")]
    InvalidConfig(String),

    /// A second execution was requested while one is in flight
    #[error("workflow {0} is already running")]
    AlreadyRunning(String),

    /// Requested transition out of a terminal state
    #[error("workflow {workflow_id} is {status:?}; terminal states admit no transition")]
    InvalidTransition {
        workflow_id: String,
        status: RunStatus,
    },

    /// A spawned agent task panicked or was aborted
    #[error("task join error: {0}")]
    JoinError(String),
}
