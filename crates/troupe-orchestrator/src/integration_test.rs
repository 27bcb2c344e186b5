//! End-to-end tests driving the orchestrator through its public surface.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use troupe_core::capability::{CapabilityGrant, CapabilityToken};
use troupe_core::error::AgentError;
use troupe_core::types::{AgentDefinition, AgentProfile, AgentType, RunStatus};
use troupe_memory::AgentMemoryManager;

use crate::error::OrchestratorError;
use crate::orchestrator::WorkflowOrchestrator;
use crate::registry::{AgentIntegration, AgentRegistry, ExecutionContext};
use crate::store::WorkflowStore;
use crate::workflow::{WorkflowConfig, WorkflowType};

struct Harness {
    orchestrator: WorkflowOrchestrator,
    store: Arc<WorkflowStore>,
    memory: Arc<AgentMemoryManager>,
}

fn harness() -> Harness {
    harness_with(AgentRegistry::builtin())
}

fn harness_with(registry: AgentRegistry) -> Harness {
    let store = Arc::new(WorkflowStore::new());
    let memory = Arc::new(AgentMemoryManager::new());
    let orchestrator =
        WorkflowOrchestrator::new(store.clone(), Arc::new(registry), memory.clone());
    Harness {
        orchestrator,
        store,
        memory,
    }
}

fn token() -> CapabilityToken {
    CapabilityToken::new("tester", "tenant-1")
        .with_grant(CapabilityGrant::new(
            "workflows",
            vec!["create", "execute"],
        ))
        .with_grant(CapabilityGrant::new("data", vec!["process"]))
        .with_grant(CapabilityGrant::new("llm", vec!["generate", "embed"]))
        .with_grant(CapabilityGrant::new("memory", vec!["read"]))
        .with_grant(CapabilityGrant::new("integrations", vec!["invoke"]))
}

struct PanicIntegration;

#[async_trait]
impl AgentIntegration for PanicIntegration {
    async fn call(
        &self,
        _definition: &AgentDefinition,
        _input: Value,
        _ctx: &ExecutionContext,
    ) -> Result<Value, AgentError> {
        panic!("integration panicked");
    }
}

struct WordCountIntegration;

#[async_trait]
impl AgentIntegration for WordCountIntegration {
    async fn call(
        &self,
        _definition: &AgentDefinition,
        input: Value,
        _ctx: &ExecutionContext,
    ) -> Result<Value, AgentError> {
        let text = input.get("text").and_then(Value::as_str).unwrap_or("");
        Ok(json!({"words": text.split_whitespace().count()}))
    }
}

struct SumIntegration;

#[async_trait]
impl AgentIntegration for SumIntegration {
    async fn call(
        &self,
        _definition: &AgentDefinition,
        input: Value,
        _ctx: &ExecutionContext,
    ) -> Result<Value, AgentError> {
        let total: u64 = input["map_results"]
            .as_object()
            .map(|tasks| {
                tasks
                    .values()
                    .filter_map(|r| r["output"]["words"].as_u64())
                    .sum()
            })
            .unwrap_or(0);
        Ok(json!({"total_words": total}))
    }
}

// ─── Creation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_requires_create_grant() {
    let h = harness();
    let bare = CapabilityToken::new("tester", "tenant-1");

    let err = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", AgentType::DataProcessor)],
            WorkflowConfig::new(),
            &bare,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Unauthorized(_)));
}

#[tokio::test]
async fn test_create_rejects_uncovered_agent_capability() {
    let h = harness();
    // Grant covers workflows but nothing for the llm agent's requirements
    let narrow = CapabilityToken::new("tester", "tenant-1").with_grant(CapabilityGrant::new(
        "workflows",
        vec!["create", "execute"],
    ));

    let err = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", AgentType::LlmAgent)],
            WorkflowConfig::new(),
            &narrow,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Unauthorized(_)));
}

#[tokio::test]
async fn test_create_rejects_duplicate_agent_ids() {
    let h = harness();

    let err = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![
                AgentDefinition::new("a", AgentType::DataProcessor),
                AgentDefinition::new("a", AgentType::LlmAgent),
            ],
            WorkflowConfig::new(),
            &token(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::DuplicateAgentId(id) if id == "a"));
}

#[tokio::test]
async fn test_create_rejects_unknown_agent_type() {
    let h = harness();

    let err = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", "not_registered")],
            WorkflowConfig::new(),
            &token(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::UnknownAgentType(t) if t == "not_registered"));
}

#[tokio::test]
async fn test_create_rejects_empty_and_stray_map_reduce_agents() {
    let h = harness();

    let empty = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![],
            WorkflowConfig::new(),
            &token(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(empty, OrchestratorError::EmptyWorkflow));

    // A map-reduce workflow with a non-mapper/non-reducer agent fails fast
    let stray = h
        .orchestrator
        .create_workflow(
            WorkflowType::MapReduce,
            vec![AgentDefinition::new("a", AgentType::DataProcessor)],
            WorkflowConfig::new(),
            &token(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(stray, OrchestratorError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_create_normalizes_budgets_from_profile() {
    let h = harness();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", AgentType::LlmAgent)],
            WorkflowConfig::new(),
            &token(),
            None,
        )
        .await
        .unwrap();

    let stored = h.store.get(&workflow_id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Idle);
    // Budgets filled in from the llm_agent profile
    assert_eq!(stored.agents[0].timeout_ms, 60_000);
    assert_eq!(stored.agents[0].memory_limit_bytes, 128 * 1024 * 1024);
}

// ─── Execution ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_end_to_end_sequential_workflow() {
    let h = harness();
    let token = token();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![
                AgentDefinition::new("A", AgentType::DataProcessor),
                AgentDefinition::new("B", AgentType::LlmAgent),
            ],
            WorkflowConfig::new(),
            &token,
            Some("prompt-flow".into()),
        )
        .await
        .unwrap();

    let results = h
        .orchestrator
        .execute_workflow(&workflow_id, json!({"prompt": "hi"}), &token)
        .await
        .unwrap();

    assert_eq!(results["workflow_type"], "sequential");

    // Exactly A and B, both completed, each agent id exactly once
    let agent_results = results["agent_results"].as_object().unwrap();
    assert_eq!(agent_results.len(), 2);
    assert_eq!(agent_results["A"]["status"], "completed");
    assert_eq!(agent_results["B"]["status"], "completed");

    // B saw A's output (the processed prompt) and the final output is B's
    assert_eq!(agent_results["B"]["output"]["response"], "[B] hi");
    assert_eq!(results["final_output"], agent_results["B"]["output"]);

    let snapshot = h
        .orchestrator
        .get_workflow_status(&workflow_id, &token)
        .await
        .unwrap();
    assert_eq!(snapshot.workflow.status, RunStatus::Completed);
    assert!(snapshot.workflow.started_at.is_some());
    assert!(snapshot.workflow.completed_at.is_some());
    assert_eq!(snapshot.workflow.results, Some(results));
    assert_eq!(snapshot.agent_states.len(), 2);
    assert_eq!(snapshot.agent_states["A"].status, RunStatus::Completed);
    assert_eq!(snapshot.agent_states["B"].status, RunStatus::Completed);
}

#[tokio::test]
async fn test_tenant_isolation_blocks_execution_without_mutation() {
    let h = harness();
    let owner = token();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", AgentType::DataProcessor)],
            WorkflowConfig::new(),
            &owner,
            None,
        )
        .await
        .unwrap();

    let intruder = CapabilityToken::new("intruder", "tenant-2").with_grant(
        CapabilityGrant::new("workflows", vec!["create", "execute"]),
    );

    let err = h
        .orchestrator
        .execute_workflow(&workflow_id, json!({}), &intruder)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Unauthorized(_)));

    // No state mutation happened
    assert_eq!(h.store.get(&workflow_id).await.unwrap().status, RunStatus::Idle);

    // Status queries are tenant-checked the same way
    assert!(h
        .orchestrator
        .get_workflow_status(&workflow_id, &intruder)
        .await
        .is_err());
}

#[tokio::test]
async fn test_execute_requires_execute_grant() {
    let h = harness();
    let creator = token();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", AgentType::DataProcessor)],
            WorkflowConfig::new(),
            &creator,
            None,
        )
        .await
        .unwrap();

    let read_only = CapabilityToken::new("tester", "tenant-1")
        .with_grant(CapabilityGrant::new("workflows", vec!["create"]));

    let err = h
        .orchestrator
        .execute_workflow(&workflow_id, json!({}), &read_only)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Unauthorized(_)));
    assert_eq!(h.store.get(&workflow_id).await.unwrap().status, RunStatus::Idle);
}

#[tokio::test]
async fn test_execute_unknown_workflow() {
    let h = harness();

    let err = h
        .orchestrator
        .execute_workflow("no-such-id", json!({}), &token())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::WorkflowNotFound(_)));
}

#[tokio::test]
async fn test_execute_twice_rejected() {
    let h = harness();
    let token = token();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", AgentType::DataProcessor)],
            WorkflowConfig::new(),
            &token,
            None,
        )
        .await
        .unwrap();

    h.orchestrator
        .execute_workflow(&workflow_id, json!({}), &token)
        .await
        .unwrap();

    let err = h
        .orchestrator
        .execute_workflow(&workflow_id, json!({}), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_machinery_failure_flips_workflow_to_failed() {
    let mut registry = AgentRegistry::builtin();
    registry.register("panicky", AgentProfile::new(), Arc::new(PanicIntegration));
    let h = harness_with(registry);
    let token = token();

    // Parallel runs agents on spawned tasks; the panic surfaces at the join
    // as a machinery failure, not an agent-local one.
    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Parallel,
            vec![AgentDefinition::new("a", "panicky")],
            WorkflowConfig::new(),
            &token,
            None,
        )
        .await
        .unwrap();

    let err = h
        .orchestrator
        .execute_workflow(&workflow_id, json!({}), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::JoinError(_)));

    let stored = h.store.get(&workflow_id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert!(stored.error_message.is_some());
    assert!(stored.completed_at.is_some());
}

#[tokio::test]
async fn test_conditional_skip_through_public_surface() {
    let h = harness();
    let token = token();

    let mut config = WorkflowConfig::new();
    config.insert("conditions".into(), json!({"B": {"type": "never"}}));

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Conditional,
            vec![
                AgentDefinition::new("A", AgentType::DataProcessor),
                AgentDefinition::new("B", AgentType::DataProcessor),
            ],
            config,
            &token,
            None,
        )
        .await
        .unwrap();

    let results = h
        .orchestrator
        .execute_workflow(&workflow_id, json!({"n": 1}), &token)
        .await
        .unwrap();

    assert_eq!(results["agent_results"]["B"]["status"], "skipped");
    assert_eq!(results["agent_results"]["A"]["status"], "completed");
}

#[tokio::test]
async fn test_map_reduce_through_public_surface() {
    let mut registry = AgentRegistry::builtin();
    registry.register(
        "word_count_mapper",
        AgentProfile::new(),
        Arc::new(WordCountIntegration),
    );
    registry.register("sum_reducer", AgentProfile::new(), Arc::new(SumIntegration));
    let h = harness_with(registry);
    let token = token();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::MapReduce,
            vec![
                AgentDefinition::new("counter", "word_count_mapper"),
                AgentDefinition::new("total", "sum_reducer"),
            ],
            WorkflowConfig::new(),
            &token,
            None,
        )
        .await
        .unwrap();

    let results = h
        .orchestrator
        .execute_workflow(
            &workflow_id,
            json!({"chunks": [{"text": "one two"}, {"text": "three"}]}),
            &token,
        )
        .await
        .unwrap();

    assert_eq!(results["workflow_type"], "map_reduce");
    assert_eq!(results["map_results"]["counter_chunk_0"]["status"], "completed");
    assert_eq!(results["map_results"]["counter_chunk_1"]["status"], "completed");
    assert_eq!(results["reduce_results"]["total"]["output"]["total_words"], 3);
}

#[tokio::test]
async fn test_agent_memory_released_after_completion() {
    let h = harness();
    let token = token();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("writer", AgentType::LlmAgent)],
            WorkflowConfig::new(),
            &token,
            None,
        )
        .await
        .unwrap();

    h.orchestrator
        .execute_workflow(&workflow_id, json!({"prompt": "hi"}), &token)
        .await
        .unwrap();

    // The llm integration records its response in agent memory during the
    // run; terminal-state cleanup drops it afterwards
    assert_eq!(h.memory.get_agent_memory("writer", "last_response").await, None);
}

// ─── Cancellation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_marks_workflow_and_blocks_execution() {
    let h = harness();
    let token = token();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", AgentType::DataProcessor)],
            WorkflowConfig::new(),
            &token,
            None,
        )
        .await
        .unwrap();

    h.orchestrator
        .cancel_workflow(&workflow_id, &token)
        .await
        .unwrap();

    let snapshot = h
        .orchestrator
        .get_workflow_status(&workflow_id, &token)
        .await
        .unwrap();
    assert_eq!(snapshot.workflow.status, RunStatus::Cancelled);

    // A cancelled workflow cannot be executed or cancelled again
    assert!(matches!(
        h.orchestrator
            .execute_workflow(&workflow_id, json!({}), &token)
            .await
            .unwrap_err(),
        OrchestratorError::InvalidTransition { .. }
    ));
    assert!(matches!(
        h.orchestrator
            .cancel_workflow(&workflow_id, &token)
            .await
            .unwrap_err(),
        OrchestratorError::InvalidTransition { .. }
    ));
}

#[tokio::test]
async fn test_cancel_requires_owning_tenant() {
    let h = harness();
    let owner = token();

    let workflow_id = h
        .orchestrator
        .create_workflow(
            WorkflowType::Sequential,
            vec![AgentDefinition::new("a", AgentType::DataProcessor)],
            WorkflowConfig::new(),
            &owner,
            None,
        )
        .await
        .unwrap();

    let intruder = CapabilityToken::new("intruder", "tenant-2");
    assert!(matches!(
        h.orchestrator
            .cancel_workflow(&workflow_id, &intruder)
            .await
            .unwrap_err(),
        OrchestratorError::Unauthorized(_)
    ));
    assert_eq!(h.store.get(&workflow_id).await.unwrap().status, RunStatus::Idle);
}
