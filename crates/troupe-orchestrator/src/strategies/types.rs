//! Shared result types for strategy runners.

use std::collections::HashMap;

use serde_json::{json, Value};

use troupe_core::types::ExecutionReport;

use crate::workflow::WorkflowType;

/// Per-agent results map.
pub type AgentResults = HashMap<String, ExecutionReport>;

/// Aggregated outcome of one strategy run.
#[derive(Debug, Clone)]
pub enum StrategyOutput {
    /// Chained and fan-out strategies: one report per reached agent, plus
    /// the forwarded final output where the strategy produces one.
    Standard {
        /// Last forwarded data (None for strategies without forwarding)
        final_output: Option<Value>,
        /// Report per agent id
        agent_results: AgentResults,
    },
    /// Map-reduce: mapper reports keyed `"{agent_id}_chunk_{i}"`, reducer
    /// reports keyed by agent id.
    MapReduce {
        /// Mapper-task reports
        map_results: AgentResults,
        /// Reducer reports
        reduce_results: AgentResults,
    },
}

impl StrategyOutput {
    /// Serialize into the caller-facing result map. Always includes
    /// `workflow_type`.
    #[must_use]
    pub fn into_value(self, workflow_type: WorkflowType) -> Value {
        match self {
            StrategyOutput::Standard {
                final_output,
                agent_results,
            } => json!({
                "workflow_type": workflow_type,
                "final_output": final_output,
                "agent_results": agent_results,
            }),
            StrategyOutput::MapReduce {
                map_results,
                reduce_results,
            } => json!({
                "workflow_type": workflow_type,
                "map_results": map_results,
                "reduce_results": reduce_results,
            }),
        }
    }
}
