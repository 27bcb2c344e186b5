//! Agent executor - runs exactly one agent step.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use troupe_core::error::AgentError;
use troupe_core::types::{AgentDefinition, ExecutionReport};
use troupe_memory::AgentMemoryManager;

use crate::config::DEFAULT_TIMEOUT_MS;
use crate::registry::{AgentRegistry, ExecutionContext};

/// Executes one agent step through its registered integration.
///
/// Every agent-local failure - integration errors and timeouts alike - is
/// converted into the same failed [`ExecutionReport`] shape; this call never
/// errors at the orchestrator level.
pub struct AgentExecutor {
    registry: Arc<AgentRegistry>,
    memory: Arc<AgentMemoryManager>,
    default_timeout_ms: u64,
}

impl AgentExecutor {
    /// Create an executor over a registry and memory manager.
    #[must_use]
    pub fn new(registry: Arc<AgentRegistry>, memory: Arc<AgentMemoryManager>) -> Self {
        Self {
            registry,
            memory,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Set the timeout applied when a definition carries no budget.
    #[must_use]
    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Run one agent call, bounded by the definition's timeout and retried
    /// up to its retry budget.
    #[instrument(
        skip(self, input),
        fields(agent_id = %definition.agent_id, agent_type = %definition.agent_type)
    )]
    pub async fn execute(
        &self,
        definition: &AgentDefinition,
        input: serde_json::Value,
        workflow_id: &str,
        tenant_id: &str,
    ) -> ExecutionReport {
        let start = Instant::now();

        let Some(integration) = self.registry.integration(&definition.agent_type) else {
            // Creation-time validation makes this unreachable for stored
            // workflows; direct callers still get the uniform envelope.
            return ExecutionReport::failed(
                format!("unknown agent type: {}", definition.agent_type),
                elapsed_ms(start),
            );
        };

        let ctx = ExecutionContext {
            workflow_id: workflow_id.to_string(),
            tenant_id: tenant_id.to_string(),
            memory: self.memory.clone(),
        };

        let budget = if definition.timeout_ms == 0 {
            self.default_timeout_ms
        } else {
            definition.timeout_ms
        };
        let timeout = Duration::from_millis(budget);
        let max_attempts = definition.retry_count + 1;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let outcome =
                tokio::time::timeout(timeout, integration.call(definition, input.clone(), &ctx))
                    .await;

            let error = match outcome {
                Ok(Ok(output)) => {
                    debug!(
                        attempt,
                        duration_ms = elapsed_ms(start),
                        "agent call completed"
                    );
                    return ExecutionReport::completed(output, elapsed_ms(start));
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => AgentError::Timeout.to_string(),
            };

            if attempt >= max_attempts {
                warn!(attempt, error = %error, "agent call failed");
                return ExecutionReport::failed(error, elapsed_ms(start));
            }
            warn!(attempt, error = %error, "agent call failed, retrying");
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
