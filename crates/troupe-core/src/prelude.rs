//! Convenience re-exports for downstream crates.

pub use crate::capability::{
    CapabilityError, CapabilityGate, CapabilityGrant, CapabilityToken,
};
pub use crate::error::AgentError;
pub use crate::protocol::{AgentMessage, MessageKind};
pub use crate::types::{
    AgentDefinition, AgentProfile, AgentState, AgentType, ExecutionReport, ReportStatus,
    ResourceUsage, RunStatus,
};
