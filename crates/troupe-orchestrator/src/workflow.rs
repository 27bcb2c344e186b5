//! Workflow records and their lifecycle.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use troupe_core::types::{AgentDefinition, RunStatus};

/// Execution strategy of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    /// List order, output forwarded step to step, failures never short-circuit
    Sequential,
    /// Fan-out against the same input, join-all barrier
    Parallel,
    /// Sequential with per-agent predicates; false predicates skip the step
    Conditional,
    /// Sequential with stage annotations; a failing stage halts the pipeline
    Pipeline,
    /// Mappers fanned out across input chunks, then reducers run sequentially
    MapReduce,
}

impl WorkflowType {
    /// Canonical string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowType::Sequential => "sequential",
            WorkflowType::Parallel => "parallel",
            WorkflowType::Conditional => "conditional",
            WorkflowType::Pipeline => "pipeline",
            WorkflowType::MapReduce => "map_reduce",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy-specific options, opaque at this boundary.
///
/// Each strategy runner validates the subset it recognizes (e.g. the
/// conditional runner's `conditions` map) at workflow creation.
pub type WorkflowConfig = HashMap<String, serde_json::Value>;

/// A stored workflow and its execution lifecycle.
///
/// Owned exclusively by the tenant that created it. Status moves
/// `idle → running → {completed | failed | cancelled}`; terminal states
/// admit no further transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Unique workflow ID
    pub workflow_id: String,
    /// Execution strategy
    pub workflow_type: WorkflowType,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    /// Owning tenant
    pub tenant_id: String,
    /// Subject of the creating token
    pub created_by: String,
    /// Ordered agent steps
    pub agents: Vec<AgentDefinition>,
    /// Strategy-specific options
    #[serde(default)]
    pub workflow_config: WorkflowConfig,
    /// Lifecycle status
    pub status: RunStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// When execution started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When execution reached a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Aggregated strategy results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    /// Failure message when status is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl WorkflowExecution {
    /// Create an idle workflow record.
    #[must_use]
    pub fn new(
        workflow_id: impl Into<String>,
        workflow_type: WorkflowType,
        workflow_name: Option<String>,
        tenant_id: impl Into<String>,
        created_by: impl Into<String>,
        agents: Vec<AgentDefinition>,
        workflow_config: WorkflowConfig,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            workflow_type,
            workflow_name,
            tenant_id: tenant_id.into(),
            created_by: created_by.into(),
            agents,
            workflow_config,
            status: RunStatus::Idle,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            results: None,
            error_message: None,
        }
    }

    /// IDs of every agent step, in order.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.agent_id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use troupe_core::types::AgentType;

    #[test]
    fn test_workflow_type_serde() {
        assert_eq!(
            serde_json::to_string(&WorkflowType::MapReduce).unwrap(),
            "\"map_reduce\""
        );
        let parsed: WorkflowType = serde_json::from_str("\"pipeline\"").unwrap();
        assert_eq!(parsed, WorkflowType::Pipeline);
    }

    #[test]
    fn test_new_workflow_is_idle() {
        let workflow = WorkflowExecution::new(
            "wf-1",
            WorkflowType::Sequential,
            Some("demo".into()),
            "tenant-1",
            "user-1",
            vec![AgentDefinition::new("a", AgentType::DataProcessor)],
            WorkflowConfig::new(),
        );

        assert_eq!(workflow.status, RunStatus::Idle);
        assert!(workflow.started_at.is_none());
        assert!(workflow.results.is_none());
        assert_eq!(workflow.agent_ids(), vec!["a"]);
    }
}
