//! Parallel strategy - fan-out against the same input, join-all barrier.
//!
//! ```text
//!                 Input
//!                   │
//!        ┌──────────┼──────────┐
//!        ▼          ▼          ▼
//!   ┌─────────┐┌─────────┐┌─────────┐
//!   │ Agent A ││ Agent B ││ Agent C │   (concurrent)
//!   └─────────┘└─────────┘└─────────┘
//!        └──────────┼──────────┘
//!                   ▼
//!                 join
//! ```
//!
//! Every agent receives the caller's input; nothing is forwarded between
//! agents. The call returns only once every launched task has settled; a
//! failing agent does not affect the others. Concurrency is bounded by the
//! context's semaphore.

use tracing::debug;

use troupe_core::types::{AgentDefinition, AgentState};

use crate::error::OrchestratorError;

use super::types::{AgentResults, StrategyOutput};
use super::{settle_state, StrategyContext};

/// Launch every agent concurrently and join all of them.
pub async fn run(
    ctx: &StrategyContext,
    agents: &[AgentDefinition],
    input: serde_json::Value,
) -> Result<StrategyOutput, OrchestratorError> {
    let mut handles = Vec::with_capacity(agents.len());

    for definition in agents {
        ctx.store
            .set_agent_state(
                &ctx.workflow_id,
                AgentState::running(&definition.agent_id, &definition.name),
            )
            .await;

        let definition = definition.clone();
        let input = input.clone();
        let executor = ctx.executor.clone();
        let workflow_id = ctx.workflow_id.clone();
        let tenant_id = ctx.tenant_id.clone();
        let limits = ctx.limits.clone();

        handles.push(tokio::spawn(async move {
            let _permit = limits.acquire_owned().await.ok();
            let report = executor
                .execute(&definition, input, &workflow_id, &tenant_id)
                .await;
            (definition.agent_id, report)
        }));
    }

    let mut results = AgentResults::new();
    for handle in handles {
        let (agent_id, report) = handle
            .await
            .map_err(|e| OrchestratorError::JoinError(e.to_string()))?;
        debug!(agent_id = %agent_id, status = ?report.status, "parallel agent settled");
        settle_state(ctx, &agent_id, &report).await;
        results.insert(agent_id, report);
    }

    Ok(StrategyOutput::Standard {
        final_output: None,
        agent_results: results,
    })
}
