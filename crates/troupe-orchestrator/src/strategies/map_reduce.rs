//! Map-reduce strategy - mapper fan-out over input chunks, then reducers.
//!
//! ```text
//!   chunks:   [c0]      [c1]      [c2]
//!               │ ╲     ╱ │ ╲     ╱ │
//!               ▼   ╳      ╳    ╳   ▼
//!          ┌────────────────────────────┐
//!          │  mapper × chunk tasks      │   (concurrent)
//!          └────────────┬───────────────┘
//!                       ▼ join
//!          ┌────────────────────────────┐
//!          │  reducers, sequentially    │
//!          └────────────────────────────┘
//! ```
//!
//! Agents whose type ends in `_mapper` run once per input chunk (the
//! cross-product of chunks × mappers, each task keyed
//! `"{agent_id}_chunk_{i}"`); failures are captured per task. After every
//! mapper task settles, each `_reducer` agent runs once, sequentially,
//! receiving `{"map_results": …}` as input.

use serde_json::{json, Value};
use tracing::debug;

use troupe_core::types::{AgentDefinition, AgentState, ReportStatus};

use crate::error::OrchestratorError;

use super::types::{AgentResults, StrategyOutput};
use super::{run_step, StrategyContext};

/// Validate the agent partition at workflow creation: every agent of a
/// map-reduce workflow must be a mapper or a reducer, and at least one
/// mapper or reducer must exist.
pub fn validate_agents(agents: &[AgentDefinition]) -> Result<(), OrchestratorError> {
    for definition in agents {
        if !definition.agent_type.is_mapper() && !definition.agent_type.is_reducer() {
            return Err(OrchestratorError::InvalidConfig(format!(
                "agent {} has type {} which is neither a mapper nor a reducer",
                definition.agent_id, definition.agent_type
            )));
        }
    }
    if agents.is_empty() {
        return Err(OrchestratorError::EmptyWorkflow);
    }
    Ok(())
}

/// Split the input into chunks: the `chunks` array when present, otherwise
/// the whole input as a single chunk.
fn chunk_input(input: &Value) -> Vec<Value> {
    match input.get("chunks").and_then(Value::as_array) {
        Some(chunks) => chunks.clone(),
        None => vec![input.clone()],
    }
}

/// Fan mappers out across chunks, then run reducers over the joined map
/// results.
pub async fn run(
    ctx: &StrategyContext,
    agents: &[AgentDefinition],
    input: serde_json::Value,
) -> Result<StrategyOutput, OrchestratorError> {
    let mappers: Vec<&AgentDefinition> =
        agents.iter().filter(|a| a.agent_type.is_mapper()).collect();
    let reducers: Vec<&AgentDefinition> = agents
        .iter()
        .filter(|a| a.agent_type.is_reducer())
        .collect();

    let chunks = chunk_input(&input);
    debug!(
        mappers = mappers.len(),
        reducers = reducers.len(),
        chunks = chunks.len(),
        "starting map phase"
    );

    // Map phase: cross-product of chunks × mappers, all concurrent.
    let mut handles = Vec::with_capacity(mappers.len() * chunks.len());
    for definition in &mappers {
        ctx.store
            .set_agent_state(
                &ctx.workflow_id,
                AgentState::running(&definition.agent_id, &definition.name),
            )
            .await;

        for (i, chunk) in chunks.iter().enumerate() {
            let key = format!("{}_chunk_{}", definition.agent_id, i);
            let definition = (*definition).clone();
            let chunk = chunk.clone();
            let executor = ctx.executor.clone();
            let workflow_id = ctx.workflow_id.clone();
            let tenant_id = ctx.tenant_id.clone();
            let limits = ctx.limits.clone();

            handles.push(tokio::spawn(async move {
                let _permit = limits.acquire_owned().await.ok();
                let report = executor
                    .execute(&definition, chunk, &workflow_id, &tenant_id)
                    .await;
                (definition.agent_id, key, report)
            }));
        }
    }

    let mut map_results = AgentResults::new();
    for handle in handles {
        let (agent_id, key, report) = handle
            .await
            .map_err(|e| OrchestratorError::JoinError(e.to_string()))?;

        // Failure is sticky on a mapper's state: one failed chunk task marks
        // the whole mapper failed no matter how its other chunks settle.
        let failed = report.is_failed();
        let error = report.error.clone();
        ctx.store
            .update_agent_state(&ctx.workflow_id, &agent_id, move |state| {
                use troupe_core::types::RunStatus;
                if state.status == RunStatus::Cancelled {
                    return;
                }
                if failed {
                    state.fail(error.unwrap_or_else(|| "mapper task failed".into()));
                } else if state.status != RunStatus::Failed {
                    state.complete(None);
                }
            })
            .await;

        map_results.insert(key, report);
    }

    let completed_tasks = map_results
        .values()
        .filter(|r| r.status == ReportStatus::Completed)
        .count();
    debug!(
        total_tasks = map_results.len(),
        completed_tasks, "map phase joined, starting reduce phase"
    );

    // Reduce phase: each reducer runs once, sequentially, over the full map
    // results.
    let reduce_input = json!({ "map_results": map_results });
    let mut reduce_results = AgentResults::new();
    for definition in &reducers {
        let report = run_step(ctx, definition, reduce_input.clone()).await;
        reduce_results.insert(definition.agent_id.clone(), report);
    }

    Ok(StrategyOutput::MapReduce {
        map_results,
        reduce_results,
    })
}
