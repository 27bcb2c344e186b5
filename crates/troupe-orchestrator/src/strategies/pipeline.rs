//! Pipeline strategy - staged forwarding that halts on failure.
//!
//! Like the sequential strategy, but each stage's input is annotated with
//! `_pipeline_stage` (0-based) and `_pipeline_total`, and a failing stage
//! terminates the pipeline: its error is recorded and no later agent is
//! invoked. Callers detect the truncation by `results` holding fewer
//! entries than the workflow has agents.

use serde_json::{json, Value};
use tracing::{debug, warn};

use troupe_core::types::AgentDefinition;

use crate::error::OrchestratorError;

use super::types::{AgentResults, StrategyOutput};
use super::{run_step, StrategyContext};

/// Merge the stage annotations into the forwarded data.
///
/// Non-object data is wrapped under `value` so the annotations always have
/// an object to land in.
fn annotate(data: Value, stage: usize, total: usize) -> Value {
    let mut map = match data {
        Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    map.insert("_pipeline_stage".to_string(), json!(stage));
    map.insert("_pipeline_total".to_string(), json!(total));
    Value::Object(map)
}

/// Run agents as pipeline stages, halting at the first failure.
pub async fn run(
    ctx: &StrategyContext,
    agents: &[AgentDefinition],
    input: serde_json::Value,
) -> Result<StrategyOutput, OrchestratorError> {
    let total = agents.len();
    let mut results = AgentResults::new();
    let mut current = input;

    for (stage, definition) in agents.iter().enumerate() {
        debug!(agent_id = %definition.agent_id, stage, total, "running pipeline stage");
        let staged = annotate(current.clone(), stage, total);
        let report = run_step(ctx, definition, staged).await;

        if let Some(output) = &report.output {
            current = output.clone();
        }
        let failed = report.is_failed();
        results.insert(definition.agent_id.clone(), report);

        if failed {
            warn!(
                agent_id = %definition.agent_id,
                stage,
                "pipeline stage failed, halting"
            );
            break;
        }
    }

    Ok(StrategyOutput::Standard {
        final_output: Some(current),
        agent_results: results,
    })
}
