//! Workflow orchestrator - the public entry point of the engine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use troupe_core::capability::{actions, resources, CapabilityGate, CapabilityToken};
use troupe_core::types::{AgentDefinition, AgentState, RunStatus};
use troupe_memory::AgentMemoryManager;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::executor::AgentExecutor;
use crate::registry::AgentRegistry;
use crate::store::WorkflowStore;
use crate::strategies::{self, StrategyContext};
use crate::workflow::{WorkflowConfig, WorkflowExecution, WorkflowType};

/// Read-only projection returned by status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    /// The workflow record
    pub workflow: WorkflowExecution,
    /// Run-time state of every agent that has started
    pub agent_states: HashMap<String, AgentState>,
}

/// Validates, stores, and executes workflows.
///
/// All collaborating state - the workflow store, the agent registry, and
/// the memory manager - is injected and owned per instance; nothing is
/// process-global. Every mutation is authorized through the capability
/// gate before any state changes.
pub struct WorkflowOrchestrator {
    store: Arc<WorkflowStore>,
    registry: Arc<AgentRegistry>,
    executor: Arc<AgentExecutor>,
    memory: Arc<AgentMemoryManager>,
    gate: CapabilityGate,
    limits: Arc<Semaphore>,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator with default configuration.
    #[must_use]
    pub fn new(
        store: Arc<WorkflowStore>,
        registry: Arc<AgentRegistry>,
        memory: Arc<AgentMemoryManager>,
    ) -> Self {
        Self::with_config(store, registry, memory, OrchestratorConfig::default())
    }

    /// Create an orchestrator with explicit configuration.
    #[must_use]
    pub fn with_config(
        store: Arc<WorkflowStore>,
        registry: Arc<AgentRegistry>,
        memory: Arc<AgentMemoryManager>,
        config: OrchestratorConfig,
    ) -> Self {
        let executor = Arc::new(
            AgentExecutor::new(registry.clone(), memory.clone())
                .with_default_timeout_ms(config.default_timeout_ms),
        );
        Self {
            store,
            registry,
            executor,
            memory,
            gate: CapabilityGate::new(),
            limits: Arc::new(Semaphore::new(config.max_concurrent_agents)),
        }
    }

    /// Validate and store a workflow. Nothing is executed.
    ///
    /// The token must grant `workflows:create`, and every capability an
    /// agent requires (its own declarations plus its type's registry
    /// defaults) must be covered by some grant's resource prefix.
    ///
    /// # Errors
    ///
    /// Authorization failures, duplicate agent ids, unknown agent types,
    /// and malformed strategy configuration are all rejected here, before
    /// anything is stored.
    #[instrument(
        skip(self, agents, workflow_config, token, workflow_name),
        fields(workflow_type = %workflow_type, tenant_id = %token.tenant_id)
    )]
    pub async fn create_workflow(
        &self,
        workflow_type: WorkflowType,
        agents: Vec<AgentDefinition>,
        workflow_config: WorkflowConfig,
        token: &CapabilityToken,
        workflow_name: Option<String>,
    ) -> Result<String, OrchestratorError> {
        self.gate
            .verify(token, resources::WORKFLOWS, actions::CREATE)?;

        if agents.is_empty() {
            return Err(OrchestratorError::EmptyWorkflow);
        }

        {
            let mut seen = HashSet::new();
            for definition in &agents {
                if !seen.insert(definition.agent_id.as_str()) {
                    return Err(OrchestratorError::DuplicateAgentId(
                        definition.agent_id.clone(),
                    ));
                }
            }
        }

        // Resolve every type against the registry (unknown types fail here,
        // not at execution), normalize budgets, and check capability
        // coverage.
        let mut agents = agents;
        for definition in &mut agents {
            let profile = self.registry.profile(&definition.agent_type).ok_or_else(|| {
                OrchestratorError::UnknownAgentType(definition.agent_type.to_string())
            })?;

            if definition.memory_limit_bytes == 0 {
                definition.memory_limit_bytes = profile.default_memory_limit_bytes;
            }
            if definition.timeout_ms == 0 {
                definition.timeout_ms = profile.default_timeout_ms;
            }
            if definition.retry_count == 0 {
                definition.retry_count = profile.default_retry_count;
            }

            let mut requirements = profile.capabilities_required.clone();
            for capability in &definition.capabilities_required {
                if !requirements.contains(capability) {
                    requirements.push(capability.clone());
                }
            }
            self.gate
                .ensure_requirements(token, &definition.agent_id, &requirements)?;
        }

        match workflow_type {
            WorkflowType::Conditional => {
                strategies::conditional::validate_config(&workflow_config, &agents)?;
            }
            WorkflowType::MapReduce => {
                strategies::map_reduce::validate_agents(&agents)?;
            }
            _ => {}
        }

        let workflow_id = Uuid::new_v4().to_string();
        let workflow = WorkflowExecution::new(
            workflow_id.clone(),
            workflow_type,
            workflow_name,
            token.tenant_id.clone(),
            token.sub.clone(),
            agents,
            workflow_config,
        );
        self.store.insert(workflow).await;

        info!(workflow_id = %workflow_id, "workflow created");
        Ok(workflow_id)
    }

    /// Execute a stored workflow under its declared strategy.
    ///
    /// On success the workflow is `completed` with results recorded; a
    /// strategy-machinery failure flips it to `failed`, records the error,
    /// and is re-raised. Failures of individual agents live inside the
    /// returned results instead.
    ///
    /// # Errors
    ///
    /// Not-found, tenant mismatch, and missing `workflows:execute` are
    /// rejected before any state mutation. A second execution against an
    /// in-flight workflow id is a caller error.
    #[instrument(skip(self, input_data, token), fields(workflow_id = %workflow_id))]
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        input_data: serde_json::Value,
        token: &CapabilityToken,
    ) -> Result<serde_json::Value, OrchestratorError> {
        let workflow = self
            .store
            .get(workflow_id)
            .await
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;
        self.gate.ensure_tenant(token, &workflow.tenant_id)?;
        self.gate
            .verify(token, resources::WORKFLOWS, actions::EXECUTE)?;

        let workflow = self.store.begin_execution(workflow_id).await?;
        info!(workflow_type = %workflow.workflow_type, "workflow started");

        let ctx = StrategyContext {
            executor: self.executor.clone(),
            memory: self.memory.clone(),
            store: self.store.clone(),
            workflow_id: workflow.workflow_id.clone(),
            tenant_id: workflow.tenant_id.clone(),
            config: workflow.workflow_config.clone(),
            limits: self.limits.clone(),
        };

        let outcome =
            strategies::dispatch(workflow.workflow_type, &ctx, &workflow.agents, input_data).await;

        match outcome {
            Ok(output) => {
                let results = output.into_value(workflow.workflow_type);
                self.store
                    .update(workflow_id, |w| {
                        // A soft-cancelled workflow keeps reading as
                        // cancelled; the late results are still recorded.
                        if w.status == RunStatus::Running {
                            w.status = RunStatus::Completed;
                        }
                        w.results = Some(results.clone());
                        w.completed_at = Some(Utc::now());
                    })
                    .await;
                self.release_agents(&workflow).await;

                info!("workflow completed");
                Ok(results)
            }
            Err(e) => {
                warn!(error = %e, "workflow failed");
                let message = e.to_string();
                self.store
                    .update(workflow_id, |w| {
                        if !w.status.is_terminal() {
                            w.status = RunStatus::Failed;
                        }
                        w.error_message = Some(message.clone());
                        w.completed_at = Some(Utc::now());
                    })
                    .await;
                self.release_agents(&workflow).await;
                Err(e)
            }
        }
    }

    /// Tenant-checked read-only projection of a workflow and the run-time
    /// state of its agents.
    ///
    /// # Errors
    ///
    /// Unknown ids and cross-tenant tokens are rejected.
    pub async fn get_workflow_status(
        &self,
        workflow_id: &str,
        token: &CapabilityToken,
    ) -> Result<WorkflowSnapshot, OrchestratorError> {
        let workflow = self
            .store
            .get(workflow_id)
            .await
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;
        self.gate.ensure_tenant(token, &workflow.tenant_id)?;

        let agent_states = self.store.agent_states(workflow_id).await;
        Ok(WorkflowSnapshot {
            workflow,
            agent_states,
        })
    }

    /// Soft-cancel a workflow: the record and every known agent state move
    /// to `cancelled`, but in-flight agent calls are not interrupted.
    ///
    /// # Errors
    ///
    /// Unknown ids, cross-tenant tokens, and workflows already in a
    /// terminal state are rejected.
    #[instrument(skip(self, token), fields(workflow_id = %workflow_id))]
    pub async fn cancel_workflow(
        &self,
        workflow_id: &str,
        token: &CapabilityToken,
    ) -> Result<(), OrchestratorError> {
        let workflow = self
            .store
            .get(workflow_id)
            .await
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;
        self.gate.ensure_tenant(token, &workflow.tenant_id)?;

        if workflow.status.is_terminal() {
            return Err(OrchestratorError::InvalidTransition {
                workflow_id: workflow_id.to_string(),
                status: workflow.status,
            });
        }

        self.store
            .update(workflow_id, |w| {
                w.status = RunStatus::Cancelled;
                w.completed_at = Some(Utc::now());
            })
            .await;
        self.store.cancel_agent_states(workflow_id).await;
        self.release_agents(&workflow).await;

        info!("workflow cancelled");
        Ok(())
    }

    /// Drop per-agent memory and mailboxes once a workflow is terminal.
    async fn release_agents(&self, workflow: &WorkflowExecution) {
        for definition in &workflow.agents {
            self.memory.cleanup_agent_memory(&definition.agent_id).await;
        }
    }
}
