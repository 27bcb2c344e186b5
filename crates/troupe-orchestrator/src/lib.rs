//! # troupe-orchestrator
//!
//! Workflow orchestration for the troupe multi-agent engine.
//!
//! This crate provides:
//! - [`WorkflowOrchestrator`] - create / execute / status / cancel
//! - [`AgentRegistry`] + [`AgentIntegration`] - the uniform "execute one
//!   agent" seam and the built-in agent types
//! - [`AgentExecutor`] - runs one agent call with timeout and retry
//! - [`strategies`] - the five execution strategies (sequential, parallel,
//!   conditional, pipeline, map-reduce)
//! - [`WorkflowStore`] - the injected run-time store
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use troupe_core::capability::{CapabilityGrant, CapabilityToken};
//! use troupe_core::types::{AgentDefinition, AgentType};
//! use troupe_memory::AgentMemoryManager;
//! use troupe_orchestrator::{
//!     AgentRegistry, WorkflowOrchestrator, WorkflowStore, WorkflowType,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = WorkflowOrchestrator::new(
//!         Arc::new(WorkflowStore::new()),
//!         Arc::new(AgentRegistry::builtin()),
//!         Arc::new(AgentMemoryManager::new()),
//!     );
//!
//!     let token = CapabilityToken::new("svc", "tenant-1")
//!         .with_grant(CapabilityGrant::new("workflows", vec!["create", "execute"]))
//!         .with_grant(CapabilityGrant::new("llm", vec!["generate"]));
//!
//!     let workflow_id = orchestrator
//!         .create_workflow(
//!             WorkflowType::Sequential,
//!             vec![AgentDefinition::new("summarize", AgentType::LlmAgent)],
//!             Default::default(),
//!             &token,
//!             None,
//!         )
//!         .await?;
//!
//!     let results = orchestrator
//!         .execute_workflow(&workflow_id, serde_json::json!({"prompt": "hi"}), &token)
//!         .await?;
//!     println!("{results}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod integrations;
pub mod orchestrator;
pub mod registry;
pub mod store;
pub mod strategies;
pub mod workflow;

#[cfg(test)]
mod integration_test;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use executor::AgentExecutor;
pub use orchestrator::{WorkflowOrchestrator, WorkflowSnapshot};
pub use registry::{AgentIntegration, AgentRegistry, ExecutionContext, SharedIntegration};
pub use store::WorkflowStore;
pub use strategies::{Condition, StrategyContext, StrategyOutput};
pub use workflow::{WorkflowConfig, WorkflowExecution, WorkflowType};
