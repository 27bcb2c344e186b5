//! Conditional strategy - sequential execution gated by predicates.
//!
//! Predicates are read from `workflow_config.conditions[agent_id]` and
//! evaluated against the caller's input and the results so far. A false
//! predicate skips the agent and records a `skipped` entry; a true one
//! executes exactly as in the sequential strategy, output forwarding
//! included.
//!
//! The recognized predicate kinds are a closed set. An unrecognized kind
//! executes the agent (fail open) with a warning; malformed condition
//! structure is rejected at workflow creation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use troupe_core::types::{AgentDefinition, ExecutionReport};

use crate::error::OrchestratorError;
use crate::workflow::WorkflowConfig;

use super::types::{AgentResults, StrategyOutput};
use super::{run_step, StrategyContext};

/// Predicate attached to one agent of a conditional workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Run unconditionally (the default when no condition is configured)
    Always,
    /// Never run; the agent is recorded as skipped
    Never,
    /// Run when `input_data[field] == value`
    InputContains { field: String, value: Value },
    /// Run when the previous agent's entry is `completed`
    PreviousSuccess,
    /// Run when the previous agent's entry is `failed`
    PreviousFailure,
}

impl Condition {
    /// Evaluate against the caller's input and the previous agent's entry.
    ///
    /// With no previous agent, `previous_success` holds vacuously and
    /// `previous_failure` does not.
    #[must_use]
    pub fn evaluate(&self, input: &Value, previous: Option<&ExecutionReport>) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::InputContains { field, value } => input.get(field) == Some(value),
            Condition::PreviousSuccess => previous.map_or(true, |r| r.is_completed()),
            Condition::PreviousFailure => previous.is_some_and(|r| r.is_failed()),
        }
    }
}

/// Structurally validate the `conditions` map at workflow creation.
///
/// Unknown predicate kinds pass validation (they fail open at execution);
/// everything else about the shape is checked here so authoring mistakes
/// surface before anything runs.
pub fn validate_config(
    config: &WorkflowConfig,
    agents: &[AgentDefinition],
) -> Result<(), OrchestratorError> {
    let Some(conditions) = config.get("conditions") else {
        return Ok(());
    };
    let conditions = conditions.as_object().ok_or_else(|| {
        OrchestratorError::InvalidConfig("conditions must be an object".to_string())
    })?;

    for (agent_id, raw) in conditions {
        if !agents.iter().any(|a| &a.agent_id == agent_id) {
            warn!(agent_id, "condition references an unknown agent");
        }
        let obj = raw.as_object().ok_or_else(|| {
            OrchestratorError::InvalidConfig(format!(
                "condition for agent {agent_id} must be an object"
            ))
        })?;
        if !obj.get("type").is_some_and(Value::is_string) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "condition for agent {agent_id} has no type"
            )));
        }
        if let Err(e) = serde_json::from_value::<Condition>(raw.clone()) {
            // Unknown kind names stay fail-open; structural errors on known
            // kinds (e.g. input_contains without a field) are rejected.
            let kind = obj.get("type").and_then(Value::as_str).unwrap_or_default();
            if matches!(
                kind,
                "always" | "never" | "input_contains" | "previous_success" | "previous_failure"
            ) {
                return Err(OrchestratorError::InvalidConfig(format!(
                    "condition for agent {agent_id}: {e}"
                )));
            }
            warn!(agent_id, kind, "unrecognized condition kind, will fail open");
        }
    }
    Ok(())
}

/// Run agents in order, skipping those whose predicate is false.
pub async fn run(
    ctx: &StrategyContext,
    agents: &[AgentDefinition],
    input: serde_json::Value,
) -> Result<StrategyOutput, OrchestratorError> {
    let conditions = ctx
        .config
        .get("conditions")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut results = AgentResults::new();
    let mut current = input.clone();
    let mut previous: Option<ExecutionReport> = None;

    for definition in agents {
        let should_run = match conditions.get(&definition.agent_id) {
            None => true,
            Some(raw) => match serde_json::from_value::<Condition>(raw.clone()) {
                Ok(condition) => {
                    let decision = condition.evaluate(&input, previous.as_ref());
                    debug!(
                        agent_id = %definition.agent_id,
                        condition = ?condition,
                        decision,
                        "evaluated condition"
                    );
                    decision
                }
                Err(_) => {
                    warn!(
                        agent_id = %definition.agent_id,
                        "unrecognized condition, executing agent (fail open)"
                    );
                    true
                }
            },
        };

        let report = if should_run {
            let report = run_step(ctx, definition, current.clone()).await;
            if let Some(output) = &report.output {
                current = output.clone();
            }
            report
        } else {
            debug!(agent_id = %definition.agent_id, "skipping agent");
            ExecutionReport::skipped()
        };

        previous = Some(report.clone());
        results.insert(definition.agent_id.clone(), report);
    }

    Ok(StrategyOutput::Standard {
        final_output: Some(current),
        agent_results: results,
    })
}
