//! Core type definitions for the workflow engine.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of agent a step is backed by.
///
/// The five built-in kinds cover the common integrations; anything else is
/// carried as a custom type string and must be registered before a workflow
/// using it can be created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentType {
    /// Local/structural data transformation
    DataProcessor,
    /// LLM inference call
    LlmAgent,
    /// Embedding generation
    EmbeddingAgent,
    /// Retrieval against a memory/knowledge backend
    RetrievalAgent,
    /// External API / tool invocation
    IntegrationAgent,
    /// Anything else, by registered type name
    Custom(String),
}

impl AgentType {
    /// Canonical string form of this type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            AgentType::DataProcessor => "data_processor",
            AgentType::LlmAgent => "llm_agent",
            AgentType::EmbeddingAgent => "embedding_agent",
            AgentType::RetrievalAgent => "retrieval_agent",
            AgentType::IntegrationAgent => "integration_agent",
            AgentType::Custom(name) => name,
        }
    }

    /// True for map-phase agents in a map-reduce workflow.
    #[must_use]
    pub fn is_mapper(&self) -> bool {
        self.as_str().ends_with("_mapper")
    }

    /// True for reduce-phase agents in a map-reduce workflow.
    #[must_use]
    pub fn is_reducer(&self) -> bool {
        self.as_str().ends_with("_reducer")
    }
}

impl From<String> for AgentType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "data_processor" => AgentType::DataProcessor,
            "llm_agent" => AgentType::LlmAgent,
            "embedding_agent" => AgentType::EmbeddingAgent,
            "retrieval_agent" => AgentType::RetrievalAgent,
            "integration_agent" => AgentType::IntegrationAgent,
            _ => AgentType::Custom(value),
        }
    }
}

impl From<&str> for AgentType {
    fn from(value: &str) -> Self {
        AgentType::from(value.to_string())
    }
}

impl From<AgentType> for String {
    fn from(value: AgentType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable specification of one agent step inside a workflow.
///
/// Zero-valued budgets (`memory_limit_bytes`, `timeout_ms`, `retry_count`)
/// mean "use the registry default for this agent type"; they are normalized
/// at workflow creation and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Identifier, unique within a workflow
    pub agent_id: String,
    /// Agent kind (built-in or custom registered type)
    pub agent_type: AgentType,
    /// Human-readable name
    pub name: String,
    /// Optional description of the step's purpose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `resource.action` capability strings this step requires,
    /// in addition to the registry defaults for its type
    #[serde(default)]
    pub capabilities_required: Vec<String>,
    /// Memory budget in bytes
    #[serde(default)]
    pub memory_limit_bytes: u64,
    /// Per-call timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: u64,
    /// Additional attempts after a failed call
    #[serde(default)]
    pub retry_count: u32,
    /// Opaque per-agent configuration
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl AgentDefinition {
    /// Create a definition with default budgets (resolved from the registry
    /// at workflow creation).
    #[must_use]
    pub fn new(agent_id: impl Into<String>, agent_type: impl Into<AgentType>) -> Self {
        let agent_id = agent_id.into();
        Self {
            agent_id: agent_id.clone(),
            agent_type: agent_type.into(),
            name: agent_id,
            description: None,
            capabilities_required: Vec::new(),
            memory_limit_bytes: 0,
            timeout_ms: 0,
            retry_count: 0,
            environment: HashMap::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Require an additional `resource.action` capability.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities_required.push(capability.into());
        self
    }

    /// Set the memory budget.
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub fn with_retry_count(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    /// Add an environment entry.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

/// Lifecycle status shared by agent states and workflow executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, not yet started
    #[default]
    Idle,
    /// Actively executing
    Running,
    /// Blocked on another agent or resource
    Waiting,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Cancelled by the caller
    Cancelled,
}

impl RunStatus {
    /// Terminal statuses admit no further transition.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

/// Resource-usage gauges tracked per running agent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Bytes of memory attributed to the agent
    pub memory_bytes: u64,
    /// CPU share consumed, 0.0 - 100.0
    pub cpu_percent: f32,
}

/// Mutable run-time record for one agent within one workflow execution.
///
/// Created when the agent starts running; mutated only by the strategy
/// runner that owns the execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// Agent this state belongs to
    pub agent_id: String,
    /// Current lifecycle status
    pub status: RunStatus,
    /// Free-text description of the current task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    /// Resource-usage gauges
    #[serde(default)]
    pub usage: ResourceUsage,
    /// When the agent started running
    pub started_at: DateTime<Utc>,
    /// Last state mutation
    pub last_activity: DateTime<Utc>,
    /// Error message if the agent failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Output produced by the agent, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<serde_json::Value>,
}

impl AgentState {
    /// Create a state record for an agent that just started running.
    #[must_use]
    pub fn running(agent_id: impl Into<String>, task: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.into(),
            status: RunStatus::Running,
            current_task: Some(task.into()),
            usage: ResourceUsage::default(),
            started_at: now,
            last_activity: now,
            error_message: None,
            output_data: None,
        }
    }

    /// Mark the agent completed with its output.
    pub fn complete(&mut self, output: Option<serde_json::Value>) {
        self.status = RunStatus::Completed;
        self.current_task = None;
        self.output_data = output;
        self.last_activity = Utc::now();
    }

    /// Mark the agent failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.current_task = None;
        self.error_message = Some(error.into());
        self.last_activity = Utc::now();
    }

    /// Mark the agent cancelled. Terminal states are left untouched.
    pub fn cancel(&mut self) {
        if !self.status.is_terminal() {
            self.status = RunStatus::Cancelled;
            self.current_task = None;
            self.last_activity = Utc::now();
        }
    }
}

/// Outcome of a single agent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// The call produced an output
    Completed,
    /// The call failed (provider error, timeout, invalid input)
    Failed,
    /// The step was skipped by a conditional predicate
    Skipped,
}

/// Uniform result envelope for one agent call.
///
/// Agent-local failures are carried inside this envelope; they never
/// surface as errors at the strategy layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Call outcome
    pub status: ReportStatus,
    /// Output data, forwarded downstream by chaining strategies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Error message if the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the call in milliseconds
    #[serde(default)]
    pub processing_time_ms: u64,
}

impl ExecutionReport {
    /// Successful call.
    #[must_use]
    pub fn completed(output: serde_json::Value, processing_time_ms: u64) -> Self {
        Self {
            status: ReportStatus::Completed,
            output: Some(output),
            error: None,
            processing_time_ms,
        }
    }

    /// Failed call.
    #[must_use]
    pub fn failed(error: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            status: ReportStatus::Failed,
            output: None,
            error: Some(error.into()),
            processing_time_ms,
        }
    }

    /// Step skipped by a conditional predicate; the agent was never called.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            status: ReportStatus::Skipped,
            output: None,
            error: None,
            processing_time_ms: 0,
        }
    }

    /// Check for a successful call.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == ReportStatus::Completed
    }

    /// Check for a failed call.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == ReportStatus::Failed
    }

    /// Check for a skipped step.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == ReportStatus::Skipped
    }
}

/// Registry catalogue entry for an agent type: required capabilities and
/// default budgets, used for validation and defaulting at workflow creation.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    /// `resource.action` capabilities every agent of this type requires
    pub capabilities_required: Vec<String>,
    /// Default memory budget in bytes
    pub default_memory_limit_bytes: u64,
    /// Default per-call timeout in milliseconds
    pub default_timeout_ms: u64,
    /// Default retry budget
    pub default_retry_count: u32,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            capabilities_required: Vec::new(),
            default_memory_limit_bytes: 64 * 1024 * 1024,
            default_timeout_ms: 30_000,
            default_retry_count: 0,
        }
    }
}

impl AgentProfile {
    /// Create a profile with default budgets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a capability for every agent of this type.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities_required.push(capability.into());
        self
    }

    /// Set the default memory budget.
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.default_memory_limit_bytes = bytes;
        self
    }

    /// Set the default timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the default retry budget.
    #[must_use]
    pub fn with_retry_count(mut self, retries: u32) -> Self {
        self.default_retry_count = retries;
        self
    }
}
