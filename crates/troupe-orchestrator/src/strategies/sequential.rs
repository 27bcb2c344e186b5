//! Sequential strategy - chained execution in list order.
//!
//! ```text
//! ┌─────────┐    ┌─────────┐    ┌─────────┐
//! │ Agent A │───▶│ Agent B │───▶│ Agent C │
//! └─────────┘    └─────────┘    └─────────┘
//! ```
//!
//! Each agent receives the current data - initially the caller's input,
//! thereafter the most recent output any agent produced. Failures are
//! recorded and never short-circuit: a later agent still runs after an
//! earlier one failed (it sees the last data that was successfully
//! produced).

use tracing::debug;

use troupe_core::types::AgentDefinition;

use crate::error::OrchestratorError;

use super::types::{AgentResults, StrategyOutput};
use super::{run_step, StrategyContext};

/// Run agents in list order, forwarding outputs.
pub async fn run(
    ctx: &StrategyContext,
    agents: &[AgentDefinition],
    input: serde_json::Value,
) -> Result<StrategyOutput, OrchestratorError> {
    let mut results = AgentResults::new();
    let mut current = input;

    for definition in agents {
        debug!(agent_id = %definition.agent_id, "running sequential step");
        let report = run_step(ctx, definition, current.clone()).await;

        if let Some(output) = &report.output {
            current = output.clone();
        }
        results.insert(definition.agent_id.clone(), report);
    }

    Ok(StrategyOutput::Standard {
        final_output: Some(current),
        agent_results: results,
    })
}
