//! Injected run-time store for workflows and agent states.
//!
//! Constructed per orchestrator instance and passed in explicitly; there are
//! no process-wide registries. A multi-instance deployment would back this
//! with an external key-value store behind the same surface.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use troupe_core::types::{AgentState, RunStatus};

use crate::error::OrchestratorError;
use crate::workflow::WorkflowExecution;

/// In-process table of workflows and their per-execution agent states.
///
/// Workflow records have a single logical writer (the orchestrator call that
/// owns the in-flight execution); agent-state maps are written concurrently
/// by fan-out strategies and are guarded accordingly.
#[derive(Debug, Default)]
pub struct WorkflowStore {
    workflows: RwLock<HashMap<String, WorkflowExecution>>,
    agent_states: RwLock<HashMap<String, HashMap<String, AgentState>>>,
}

impl WorkflowStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created workflow.
    pub async fn insert(&self, workflow: WorkflowExecution) {
        self.workflows
            .write()
            .await
            .insert(workflow.workflow_id.clone(), workflow);
    }

    /// Fetch a workflow by id.
    pub async fn get(&self, workflow_id: &str) -> Option<WorkflowExecution> {
        self.workflows.read().await.get(workflow_id).cloned()
    }

    /// Apply a mutation to a stored workflow. Returns false when the id is
    /// unknown.
    pub async fn update<F>(&self, workflow_id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut WorkflowExecution),
    {
        let mut workflows = self.workflows.write().await;
        match workflows.get_mut(workflow_id) {
            Some(workflow) => {
                mutate(workflow);
                true
            }
            None => false,
        }
    }

    /// Atomically move a workflow from `idle` to `running`.
    ///
    /// This is the single-writer guard: a concurrent second execution of the
    /// same id observes `running` here and is rejected.
    pub async fn begin_execution(
        &self,
        workflow_id: &str,
    ) -> Result<WorkflowExecution, OrchestratorError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;

        match workflow.status {
            RunStatus::Idle => {
                workflow.status = RunStatus::Running;
                workflow.started_at = Some(Utc::now());
                Ok(workflow.clone())
            }
            RunStatus::Running | RunStatus::Waiting => {
                Err(OrchestratorError::AlreadyRunning(workflow_id.to_string()))
            }
            status => Err(OrchestratorError::InvalidTransition {
                workflow_id: workflow_id.to_string(),
                status,
            }),
        }
    }

    /// Record an agent state for a workflow, replacing any previous state
    /// for the same agent id.
    pub async fn set_agent_state(&self, workflow_id: &str, state: AgentState) {
        self.agent_states
            .write()
            .await
            .entry(workflow_id.to_string())
            .or_default()
            .insert(state.agent_id.clone(), state);
    }

    /// Mutate the state of one agent, if present.
    pub async fn update_agent_state<F>(&self, workflow_id: &str, agent_id: &str, mutate: F)
    where
        F: FnOnce(&mut AgentState),
    {
        let mut states = self.agent_states.write().await;
        if let Some(state) = states
            .get_mut(workflow_id)
            .and_then(|m| m.get_mut(agent_id))
        {
            mutate(state);
        }
    }

    /// Snapshot all agent states of a workflow.
    pub async fn agent_states(&self, workflow_id: &str) -> HashMap<String, AgentState> {
        self.agent_states
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Move every non-terminal agent state of a workflow to `cancelled`.
    pub async fn cancel_agent_states(&self, workflow_id: &str) {
        let mut states = self.agent_states.write().await;
        if let Some(map) = states.get_mut(workflow_id) {
            for state in map.values_mut() {
                state.cancel();
            }
        }
    }
}
