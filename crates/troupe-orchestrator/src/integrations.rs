//! Built-in agent integrations.
//!
//! In-process stand-ins for the external collaborators behind each built-in
//! agent type. Real deployments register their own [`AgentIntegration`]
//! implementations over provider SDKs; these defaults keep the engine fully
//! runnable and deterministic.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde_json::{json, Value};

use troupe_core::error::AgentError;
use troupe_core::types::AgentDefinition;

use crate::registry::{AgentIntegration, ExecutionContext};

/// Render an input as the text an agent should operate on.
fn input_text(input: &Value, field: &str) -> String {
    match input.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => input.to_string(),
    }
}

/// Structural data transformation.
///
/// Merges a `processed` marker into object inputs; non-object inputs are
/// wrapped under `value`.
pub struct DataProcessorIntegration;

#[async_trait]
impl AgentIntegration for DataProcessorIntegration {
    async fn call(
        &self,
        definition: &AgentDefinition,
        input: Value,
        _ctx: &ExecutionContext,
    ) -> Result<Value, AgentError> {
        let mut output = match input {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        output.insert("processed".to_string(), json!(true));
        output.insert("processed_by".to_string(), json!(definition.agent_id));
        Ok(Value::Object(output))
    }
}

/// LLM inference stand-in.
///
/// Derives a response from the `prompt` field (or the whole input) and
/// records it in the agent's private memory.
pub struct LlmIntegration;

#[async_trait]
impl AgentIntegration for LlmIntegration {
    async fn call(
        &self,
        definition: &AgentDefinition,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<Value, AgentError> {
        let prompt = input_text(&input, "prompt");
        if prompt.is_empty() {
            return Err(AgentError::MissingInput("prompt".to_string()));
        }

        let model = definition
            .environment
            .get("model")
            .map(String::as_str)
            .unwrap_or("default");

        let output = json!({
            "response": format!("[{}] {}", definition.name, prompt),
            "model": model,
            "tokens": prompt.split_whitespace().count(),
        });

        ctx.memory
            .store_agent_memory(&definition.agent_id, "last_response", output.clone(), None)
            .await;

        Ok(output)
    }
}

/// Embedding generation stand-in.
///
/// Produces a stable pseudo-embedding so downstream plumbing can be
/// exercised without a provider.
pub struct EmbeddingIntegration;

/// Embedding width produced by the stand-in.
const EMBEDDING_DIMENSIONS: usize = 8;

#[async_trait]
impl AgentIntegration for EmbeddingIntegration {
    async fn call(
        &self,
        _definition: &AgentDefinition,
        input: Value,
        _ctx: &ExecutionContext,
    ) -> Result<Value, AgentError> {
        let text = input_text(&input, "text");

        let embedding: Vec<f64> = (0..EMBEDDING_DIMENSIONS)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                (i as u64).hash(&mut hasher);
                text.hash(&mut hasher);
                // Map the hash onto [-1, 1]
                (hasher.finish() as f64 / u64::MAX as f64) * 2.0 - 1.0
            })
            .collect();

        Ok(json!({
            "embedding": embedding,
            "dimensions": EMBEDDING_DIMENSIONS,
        }))
    }
}

/// Retrieval against tenant-shared memory.
///
/// Looks the `query` field up as a shared-memory key for the calling
/// tenant.
pub struct RetrievalIntegration;

#[async_trait]
impl AgentIntegration for RetrievalIntegration {
    async fn call(
        &self,
        _definition: &AgentDefinition,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<Value, AgentError> {
        let query = input_text(&input, "query");
        let hit = ctx.memory.get_shared_memory(&ctx.tenant_id, &query).await;

        Ok(json!({
            "query": query,
            "hits": u8::from(hit.is_some()),
            "documents": hit.map(|v| vec![v]).unwrap_or_default(),
        }))
    }
}

/// External API / tool invocation stand-in.
///
/// Echoes the payload against the endpoint configured in the agent's
/// environment.
pub struct ExternalApiIntegration;

#[async_trait]
impl AgentIntegration for ExternalApiIntegration {
    async fn call(
        &self,
        definition: &AgentDefinition,
        input: Value,
        _ctx: &ExecutionContext,
    ) -> Result<Value, AgentError> {
        let endpoint = definition
            .environment
            .get("endpoint")
            .ok_or_else(|| AgentError::InvalidInput("no endpoint configured".to_string()))?;

        Ok(json!({
            "endpoint": endpoint,
            "payload": input,
            "status_code": 200,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use troupe_core::types::AgentType;
    use troupe_memory::AgentMemoryManager;

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            workflow_id: "wf-test".to_string(),
            tenant_id: "tenant-1".to_string(),
            memory: Arc::new(AgentMemoryManager::new()),
        }
    }

    #[tokio::test]
    async fn test_data_processor_merges_marker() {
        let def = AgentDefinition::new("proc", AgentType::DataProcessor);
        let output = DataProcessorIntegration
            .call(&def, json!({"text": "X"}), &ctx())
            .await
            .unwrap();

        assert_eq!(output["text"], "X");
        assert_eq!(output["processed"], true);
        assert_eq!(output["processed_by"], "proc");
    }

    #[tokio::test]
    async fn test_data_processor_wraps_scalars() {
        let def = AgentDefinition::new("proc", AgentType::DataProcessor);
        let output = DataProcessorIntegration
            .call(&def, json!(42), &ctx())
            .await
            .unwrap();

        assert_eq!(output["value"], 42);
        assert_eq!(output["processed"], true);
    }

    #[tokio::test]
    async fn test_llm_derives_response_and_records_memory() {
        let ctx = ctx();
        let def = AgentDefinition::new("writer", AgentType::LlmAgent).with_name("Writer");
        let output = LlmIntegration
            .call(&def, json!({"prompt": "hi there"}), &ctx)
            .await
            .unwrap();

        assert_eq!(output["response"], "[Writer] hi there");
        assert_eq!(output["tokens"], 2);

        let remembered = ctx.memory.get_agent_memory("writer", "last_response").await;
        assert_eq!(remembered, Some(output));
    }

    #[tokio::test]
    async fn test_embedding_is_stable() {
        let def = AgentDefinition::new("embed", AgentType::EmbeddingAgent);
        let a = EmbeddingIntegration
            .call(&def, json!({"text": "alpha"}), &ctx())
            .await
            .unwrap();
        let b = EmbeddingIntegration
            .call(&def, json!({"text": "alpha"}), &ctx())
            .await
            .unwrap();
        let c = EmbeddingIntegration
            .call(&def, json!({"text": "beta"}), &ctx())
            .await
            .unwrap();

        assert_eq!(a["embedding"], b["embedding"]);
        assert_ne!(a["embedding"], c["embedding"]);
        assert_eq!(a["embedding"].as_array().unwrap().len(), EMBEDDING_DIMENSIONS);
    }

    #[tokio::test]
    async fn test_retrieval_reads_shared_memory() {
        let ctx = ctx();
        ctx.memory
            .store_shared_memory("tenant-1", "handbook", json!("contents"), None)
            .await;

        let def = AgentDefinition::new("lookup", AgentType::RetrievalAgent);
        let found = RetrievalIntegration
            .call(&def, json!({"query": "handbook"}), &ctx)
            .await
            .unwrap();
        assert_eq!(found["hits"], 1);
        assert_eq!(found["documents"], json!(["contents"]));

        let missing = RetrievalIntegration
            .call(&def, json!({"query": "absent"}), &ctx)
            .await
            .unwrap();
        assert_eq!(missing["hits"], 0);
    }

    #[tokio::test]
    async fn test_external_api_requires_endpoint() {
        let bare = AgentDefinition::new("tool", AgentType::IntegrationAgent);
        let err = ExternalApiIntegration
            .call(&bare, json!({}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));

        let configured = bare.with_env("endpoint", "https://example.test/hook");
        let output = ExternalApiIntegration
            .call(&configured, json!({"n": 1}), &ctx())
            .await
            .unwrap();
        assert_eq!(output["status_code"], 200);
        assert_eq!(output["payload"], json!({"n": 1}));
    }
}
