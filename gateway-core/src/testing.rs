//! In-memory test doubles for every port trait, shared across module test
//! suites (`cache`, `config::resolver`, `limits::rate_limit`, `engine`).
//! Not compiled outside `#[cfg(test)]`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::cache::DistributedCache;
use crate::config::document_store::DocumentStore;
use crate::config::types::{
    BridgeConfig, BridgeLimits, FallBackConfig, GuardrailsConfig, ModelCapabilities, ModelConfig, ModelPricing, Service,
};
use crate::context::alert::{AlertEvent, AlertSink};
use crate::context::{ConversationStore, ConversationTurn, OrchestratorTurn};
use crate::engine::ResponseChannel;
use crate::error::GatewayError;
use crate::limits::{LimitKind, UsageLedger};
use crate::provider::{ChatOutcome, ChatRequest, DetectedToolCall, ProviderAdapter, ProviderTranscript, ProviderUsage, RawModelResponse, ToolExecutionResult};

#[derive(Default)]
pub struct InMemoryCache {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl DistributedCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<(), GatewayError> {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<bool, GatewayError> {
        let mut values = self.values.lock().unwrap();
        if values.contains_key(key) {
            return Ok(false);
        }
        values.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn incr_by(&self, key: &str, amount: f64) -> Result<f64, GatewayError> {
        let mut values = self.values.lock().unwrap();
        let current: f64 = values.get(key).and_then(|v| v.parse().ok()).unwrap_or(0.0);
        let next = current + amount;
        values.insert(key.to_string(), next.to_string());
        Ok(next)
    }
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    bridges: Mutex<HashMap<String, BridgeConfig>>,
    models: Mutex<HashMap<(String, String), ModelConfig>>,
    wrapper_templates: Mutex<HashMap<String, String>>,
}

impl InMemoryDocumentStore {
    fn base_bridge(bridge_id: &str) -> BridgeConfig {
        BridgeConfig {
            bridge_id: bridge_id.to_string(),
            version_id: None,
            org_id: "org-1".to_string(),
            folder_id: None,
            service: Service::Openai,
            model: "gpt-4o".to_string(),
            configuration: serde_json::json!({"prompt": "You are a helpful assistant. {{user_query}}"}),
            apikey: Some("test-key".to_string()),
            apikey_object_id: HashMap::new(),
            tools: Vec::new(),
            tool_id_and_name_mapping: HashMap::new(),
            connected_agents: HashMap::new(),
            pre_tools: None,
            variables_path: HashMap::new(),
            variables_state: HashMap::new(),
            built_in_tools: Vec::new(),
            web_search_filters: Vec::new(),
            guardrails: GuardrailsConfig::default(),
            fall_back: FallBackConfig::default(),
            tool_call_count: 3,
            gpt_memory: false,
            gpt_memory_context: None,
            bridge_summary: None,
            limits: BridgeLimits::default(),
            wrapper_id: None,
            bridge_type: None,
        }
    }

    fn base_model() -> ModelConfig {
        ModelConfig {
            service: "openai".to_string(),
            model: "gpt-4o".to_string(),
            params: HashMap::new(),
            pricing: ModelPricing { input_cost: 2.5, output_cost: 10.0, cached_cost: 1.25, caching_read_cost: 0.0, caching_write_cost: 0.0 },
            capabilities: ModelCapabilities::default(),
        }
    }

    pub fn with_simple_bridge(bridge_id: &str) -> Self {
        let store = InMemoryDocumentStore::default();
        store.bridges.lock().unwrap().insert(bridge_id.to_string(), Self::base_bridge(bridge_id));
        store.models.lock().unwrap().insert(("openai".to_string(), "gpt-4o".to_string()), Self::base_model());
        store
    }

    pub fn with_guardrails_bridge(bridge_id: &str) -> Self {
        let store = InMemoryDocumentStore::default();
        let mut bridge = Self::base_bridge(bridge_id);
        bridge.guardrails = GuardrailsConfig { is_enabled: true, categories: vec!["toxicity".to_string()], custom_prompt: None };
        store.bridges.lock().unwrap().insert(bridge_id.to_string(), bridge);
        store.models.lock().unwrap().insert(("openai".to_string(), "gpt-4o".to_string()), Self::base_model());
        store
    }

    /// Two bridges, each transferring to the other — exercises the resolver's
    /// cycle guard.
    pub fn with_cycle(a: &str, b: &str) -> Self {
        use crate::config::types::ConnectedAgent;

        let store = InMemoryDocumentStore::default();
        let mut bridge_a = Self::base_bridge(a);
        bridge_a.connected_agents.insert(
            b.to_string(),
            ConnectedAgent { bridge_id: b.to_string(), version_id: None, description: "hands off to b".to_string(), agent_variables: HashMap::new() },
        );
        let mut bridge_b = Self::base_bridge(b);
        bridge_b.connected_agents.insert(
            a.to_string(),
            ConnectedAgent { bridge_id: a.to_string(), version_id: None, description: "hands off to a".to_string(), agent_variables: HashMap::new() },
        );

        let mut bridges = store.bridges.lock().unwrap();
        bridges.insert(a.to_string(), bridge_a);
        bridges.insert(b.to_string(), bridge_b);
        drop(bridges);
        store.models.lock().unwrap().insert(("openai".to_string(), "gpt-4o".to_string()), Self::base_model());
        store
    }

    /// Three bridges chained `a -> b -> c` via connected agents, for
    /// multi-hop transfer tests.
    pub fn with_chain(a: &str, b: &str, c: &str) -> Self {
        use crate::config::types::ConnectedAgent;

        let store = InMemoryDocumentStore::default();
        let mut bridge_a = Self::base_bridge(a);
        bridge_a.connected_agents.insert(
            b.to_string(),
            ConnectedAgent { bridge_id: b.to_string(), version_id: None, description: "hands off to b".to_string(), agent_variables: HashMap::new() },
        );
        let mut bridge_b = Self::base_bridge(b);
        bridge_b.connected_agents.insert(
            c.to_string(),
            ConnectedAgent { bridge_id: c.to_string(), version_id: None, description: "hands off to c".to_string(), agent_variables: HashMap::new() },
        );
        let bridge_c = Self::base_bridge(c);

        let mut bridges = store.bridges.lock().unwrap();
        bridges.insert(a.to_string(), bridge_a);
        bridges.insert(b.to_string(), bridge_b);
        bridges.insert(c.to_string(), bridge_c);
        drop(bridges);
        store.models.lock().unwrap().insert(("openai".to_string(), "gpt-4o".to_string()), Self::base_model());
        store
    }

    /// A bridge whose rendered prompt is wrapped through a registered
    /// template before dispatch.
    pub fn with_prompt_wrapper(bridge_id: &str, wrapper_id: &str, template: &str) -> Self {
        let store = InMemoryDocumentStore::default();
        let mut bridge = Self::base_bridge(bridge_id);
        bridge.wrapper_id = Some(wrapper_id.to_string());
        store.bridges.lock().unwrap().insert(bridge_id.to_string(), bridge);
        store.models.lock().unwrap().insert(("openai".to_string(), "gpt-4o".to_string()), Self::base_model());
        store.wrapper_templates.lock().unwrap().insert(wrapper_id.to_string(), template.to_string());
        store
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_bridge(&self, bridge_id: &str, _version_id: Option<&str>) -> Result<BridgeConfig, GatewayError> {
        self.bridges
            .lock()
            .unwrap()
            .get(bridge_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("bridge {bridge_id}")))
    }

    async fn get_model_config(&self, service: &str, model: &str) -> Result<ModelConfig, GatewayError> {
        self.models
            .lock()
            .unwrap()
            .get(&(service.to_string(), model.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("model_config {service}/{model}")))
    }

    async fn seed_usage(&self, _kind: LimitKind, _id: &str) -> Result<UsageLedger, GatewayError> {
        Ok(UsageLedger::default())
    }

    async fn roll_up_usage(&self, _bridge_id: &str, _total_cost: f64) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn get_wrapper_template(&self, wrapper_id: &str) -> Result<String, GatewayError> {
        self.wrapper_templates
            .lock()
            .unwrap()
            .get(wrapper_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("wrapper_template {wrapper_id}")))
    }
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    turns: Mutex<Vec<ConversationTurn>>,
    orchestrator_turns: Mutex<Vec<OrchestratorTurn>>,
}

impl InMemoryConversationStore {
    pub fn all_turns(&self) -> Vec<ConversationTurn> {
        self.turns.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn write_turn(&self, turn: ConversationTurn) -> Result<(), GatewayError> {
        self.turns.lock().unwrap().push(turn);
        Ok(())
    }

    async fn write_orchestrator_turn(&self, turn: OrchestratorTurn) -> Result<(), GatewayError> {
        self.orchestrator_turns.lock().unwrap().push(turn);
        Ok(())
    }

    async fn recent_turns(
        &self,
        _org_id: &str,
        bridge_id: &str,
        thread_id: &str,
        sub_thread_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, GatewayError> {
        let turns = self.turns.lock().unwrap();
        Ok(turns
            .iter()
            .filter(|t| t.bridge_id == bridge_id && t.thread_id == thread_id && t.sub_thread_id == sub_thread_id)
            .rev()
            .take(limit)
            .rev()
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryAlertSink {
    pub events: Mutex<Vec<AlertEvent>>,
}

#[async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn send(&self, event: AlertEvent) -> Result<(), GatewayError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryResponseChannel {
    pub pushed: Mutex<Vec<gateway_protocol::ChatResponse>>,
}

#[async_trait]
impl ResponseChannel for InMemoryResponseChannel {
    async fn push(&self, _format: &gateway_protocol::ResponseFormat, response: &gateway_protocol::ChatResponse) -> Result<(), GatewayError> {
        self.pushed.lock().unwrap().push(response.clone());
        Ok(())
    }
}

/// An adapter that always returns the same content/tool-calls, for engine
/// orchestration tests where the model's actual reasoning is irrelevant.
pub struct StaticChatAdapter {
    name: &'static str,
    content: String,
    tool_calls: Vec<DetectedToolCall>,
}

impl StaticChatAdapter {
    pub fn new(name: &'static str, content: &str, tool_calls: Vec<DetectedToolCall>) -> Self {
        StaticChatAdapter { name, content: content.to_string(), tool_calls }
    }
}

#[async_trait]
impl ProviderAdapter for StaticChatAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn chat(&self, _req: ChatRequest) -> Result<ChatOutcome, GatewayError> {
        Ok(ChatOutcome {
            content: self.content.clone(),
            raw: RawModelResponse(serde_json::Value::Null),
            tool_calls: self.tool_calls.clone(),
            usage: ProviderUsage { input_tokens: 10, output_tokens: 5, ..Default::default() },
            finish_reason_raw: "stop".to_string(),
        })
    }

    fn detect_tool_calls(&self, _raw: &RawModelResponse) -> Vec<DetectedToolCall> {
        self.tool_calls.clone()
    }

    fn merge_tool_results(&self, transcript: &mut ProviderTranscript, tool_calls: &[DetectedToolCall], results: &[ToolExecutionResult]) {
        crate::provider::merge_tool_results(transcript, tool_calls, results);
    }
}
