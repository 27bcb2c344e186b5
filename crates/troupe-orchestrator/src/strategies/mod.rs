//! Strategy runners - one per workflow type.
//!
//! Each runner consumes the ordered agent list and produces a results map.
//! Agent-local failures are recorded inside the map; only machinery
//! failures (task panics, malformed dispatch) surface as errors.

pub mod conditional;
pub mod map_reduce;
pub mod parallel;
pub mod pipeline;
pub mod sequential;
pub mod types;

use std::sync::Arc;

use tokio::sync::Semaphore;

use troupe_core::types::AgentDefinition;
use troupe_memory::AgentMemoryManager;

use crate::error::OrchestratorError;
use crate::executor::AgentExecutor;
use crate::store::WorkflowStore;
use crate::workflow::{WorkflowConfig, WorkflowType};

pub use conditional::Condition;
pub use types::StrategyOutput;

/// Everything a strategy runner needs for one workflow execution.
///
/// The runner owning this context is the single writer of the workflow's
/// agent states.
#[derive(Clone)]
pub struct StrategyContext {
    /// Executes individual agent calls
    pub executor: Arc<AgentExecutor>,
    /// Scoped memory shared across agents
    pub memory: Arc<AgentMemoryManager>,
    /// Run-time store holding agent states
    pub store: Arc<WorkflowStore>,
    /// Workflow being executed
    pub workflow_id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Strategy-specific options
    pub config: WorkflowConfig,
    /// Bound on concurrently running agent tasks
    pub limits: Arc<Semaphore>,
}

/// Run the strategy matching `workflow_type`.
pub async fn dispatch(
    workflow_type: WorkflowType,
    ctx: &StrategyContext,
    agents: &[AgentDefinition],
    input: serde_json::Value,
) -> Result<StrategyOutput, OrchestratorError> {
    match workflow_type {
        WorkflowType::Sequential => sequential::run(ctx, agents, input).await,
        WorkflowType::Parallel => parallel::run(ctx, agents, input).await,
        WorkflowType::Conditional => conditional::run(ctx, agents, input).await,
        WorkflowType::Pipeline => pipeline::run(ctx, agents, input).await,
        WorkflowType::MapReduce => map_reduce::run(ctx, agents, input).await,
    }
}

/// Run one agent step with state bookkeeping: the agent's state is created
/// as `running` before the call and settled from the report afterwards.
pub(crate) async fn run_step(
    ctx: &StrategyContext,
    definition: &AgentDefinition,
    input: serde_json::Value,
) -> troupe_core::types::ExecutionReport {
    use troupe_core::types::AgentState;

    ctx.store
        .set_agent_state(
            &ctx.workflow_id,
            AgentState::running(&definition.agent_id, &definition.name),
        )
        .await;

    let report = ctx
        .executor
        .execute(definition, input, &ctx.workflow_id, &ctx.tenant_id)
        .await;

    settle_state(ctx, &definition.agent_id, &report).await;
    report
}

/// Settle an agent's state from its report. Cancelled states are left
/// untouched so a soft-cancelled workflow keeps reading as cancelled even
/// when an in-flight call finishes afterwards.
pub(crate) async fn settle_state(
    ctx: &StrategyContext,
    agent_id: &str,
    report: &troupe_core::types::ExecutionReport,
) {
    use troupe_core::types::RunStatus;

    let report = report.clone();
    ctx.store
        .update_agent_state(&ctx.workflow_id, agent_id, move |state| {
            if state.status == RunStatus::Cancelled {
                return;
            }
            if report.is_failed() {
                state.fail(report.error.clone().unwrap_or_else(|| "agent failed".into()));
            } else {
                state.complete(report.output.clone());
            }
        })
        .await;
}
