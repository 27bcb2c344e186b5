//! Agent registry - type catalogue and integration dispatch.
//!
//! Maps agent type names to their [`AgentProfile`] (required capabilities,
//! default budgets) and their [`AgentIntegration`] implementation. Every
//! agent type in a workflow is resolved here at creation time, so unknown
//! types fail fast instead of at execution.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use troupe_core::error::AgentError;
use troupe_core::types::{AgentDefinition, AgentProfile, AgentType};
use troupe_memory::AgentMemoryManager;

use crate::integrations::{
    DataProcessorIntegration, EmbeddingIntegration, ExternalApiIntegration, LlmIntegration,
    RetrievalIntegration,
};

/// Handle passed to every integration call.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Workflow the call belongs to
    pub workflow_id: String,
    /// Tenant owning the workflow
    pub tenant_id: String,
    /// Scoped memory shared across agents
    pub memory: Arc<AgentMemoryManager>,
}

/// The uniform "execute one agent" contract.
///
/// Every external agent integration - LLM inference, embedding generation,
/// retrieval, tool invocation - is reached through this single call. The
/// orchestrator only ever sees the returned value or an [`AgentError`].
#[async_trait]
pub trait AgentIntegration: Send + Sync {
    /// Run one agent step against `input` and produce its output.
    async fn call(
        &self,
        definition: &AgentDefinition,
        input: serde_json::Value,
        ctx: &ExecutionContext,
    ) -> Result<serde_json::Value, AgentError>;
}

/// Shared integration handle.
pub type SharedIntegration = Arc<dyn AgentIntegration>;

struct RegistryEntry {
    profile: AgentProfile,
    integration: SharedIntegration,
}

/// Catalogue of agent types, keyed by canonical type name.
pub struct AgentRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl AgentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry with the five built-in agent types.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            AgentType::DataProcessor,
            AgentProfile::new().with_capability("data.process"),
            Arc::new(DataProcessorIntegration),
        );
        registry.register(
            AgentType::LlmAgent,
            AgentProfile::new()
                .with_capability("llm.generate")
                .with_memory_limit(128 * 1024 * 1024)
                .with_timeout_ms(60_000),
            Arc::new(LlmIntegration),
        );
        registry.register(
            AgentType::EmbeddingAgent,
            AgentProfile::new().with_capability("llm.embed"),
            Arc::new(EmbeddingIntegration),
        );
        registry.register(
            AgentType::RetrievalAgent,
            AgentProfile::new().with_capability("memory.read"),
            Arc::new(RetrievalIntegration),
        );
        registry.register(
            AgentType::IntegrationAgent,
            AgentProfile::new()
                .with_capability("integrations.invoke")
                .with_retry_count(2),
            Arc::new(ExternalApiIntegration),
        );

        registry
    }

    /// Register (or replace) an agent type.
    pub fn register(
        &mut self,
        agent_type: impl Into<AgentType>,
        profile: AgentProfile,
        integration: SharedIntegration,
    ) {
        let agent_type = agent_type.into();
        self.entries.insert(
            agent_type.as_str().to_string(),
            RegistryEntry {
                profile,
                integration,
            },
        );
    }

    /// Whether a type is registered.
    #[must_use]
    pub fn contains(&self, agent_type: &AgentType) -> bool {
        self.entries.contains_key(agent_type.as_str())
    }

    /// Profile for a type, if registered.
    #[must_use]
    pub fn profile(&self, agent_type: &AgentType) -> Option<&AgentProfile> {
        self.entries.get(agent_type.as_str()).map(|e| &e.profile)
    }

    /// Integration for a type, if registered.
    #[must_use]
    pub fn integration(&self, agent_type: &AgentType) -> Option<SharedIntegration> {
        self.entries
            .get(agent_type.as_str())
            .map(|e| e.integration.clone())
    }

    /// Registered type names.
    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
