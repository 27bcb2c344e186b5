//! Orchestrator configuration.

/// Fallback per-call timeout when neither the definition nor its registry
/// profile sets one.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Tunables for a [`WorkflowOrchestrator`](crate::WorkflowOrchestrator)
/// instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Timeout applied to agent calls with no explicit budget
    pub default_timeout_ms: u64,
    /// Upper bound on concurrently running agent tasks (parallel and
    /// map-reduce fan-out)
    pub max_concurrent_agents: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_concurrent_agents: 8,
        }
    }
}

impl OrchestratorConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback agent-call timeout.
    #[must_use]
    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the concurrent-agent bound.
    #[must_use]
    pub fn with_max_concurrent_agents(mut self, max: usize) -> Self {
        self.max_concurrent_agents = max;
        self
    }
}
