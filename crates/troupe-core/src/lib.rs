//! # troupe-core
//!
//! Core types for the troupe multi-agent workflow engine.
//!
//! This crate provides:
//! - [`AgentDefinition`] / [`AgentType`] - immutable step specifications
//! - [`AgentState`] / [`RunStatus`] - run-time lifecycle records
//! - [`ExecutionReport`] - the uniform result envelope for one agent call
//! - [`AgentMessage`] - the inter-agent mailbox protocol
//! - [`CapabilityToken`] / [`CapabilityGate`] - capability-based authorization
//!
//! The execution machinery lives in `troupe-orchestrator`; scoped memory in
//! `troupe-memory`.

pub mod capability;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod types;

pub use capability::{CapabilityError, CapabilityGate, CapabilityGrant, CapabilityToken};
pub use error::AgentError;
pub use protocol::{AgentMessage, MessageKind};
pub use types::{
    AgentDefinition, AgentProfile, AgentState, AgentType, ExecutionReport, ReportStatus,
    ResourceUsage, RunStatus,
};
