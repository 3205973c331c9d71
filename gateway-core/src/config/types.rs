//! Core configuration documents: `BridgeConfig`, `ToolSpec`,
//! `ModelConfig`, and the small value types they're built from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Openai,
    OpenaiCompletion,
    Anthropic,
    Gemini,
    Groq,
    Grok,
    OpenRouter,
    Mistral,
    AiMl,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Openai => "openai",
            Service::OpenaiCompletion => "openai_completion",
            Service::Anthropic => "anthropic",
            Service::Gemini => "gemini",
            Service::Groq => "groq",
            Service::Grok => "grok",
            Service::OpenRouter => "open_router",
            Service::Mistral => "mistral",
            Service::AiMl => "ai_ml",
        }
    }

    /// `service=="openai_response"` is canonicalized to `openai`; any other unrecognized alias is rejected upstream as a
    /// `ValidationError` before this is called.
    pub fn canonicalize(raw: &str) -> Option<Self> {
        match raw {
            "openai" | "openai_response" => Some(Service::Openai),
            "openai_completion" => Some(Service::OpenaiCompletion),
            "anthropic" => Some(Service::Anthropic),
            "gemini" => Some(Service::Gemini),
            "groq" => Some(Service::Groq),
            "grok" => Some(Service::Grok),
            "open_router" => Some(Service::OpenRouter),
            "mistral" => Some(Service::Mistral),
            "ai_ml" => Some(Service::AiMl),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeType {
    Chat,
    Reasoning,
    Embedding,
    Image,
    Video,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Http,
    Rag,
    Agent,
    WebSearch,
    WebCrawl,
}

/// Canonical, provider-agnostic tool description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub properties: Value,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default = "default_function_type")]
    pub r#type: String,
}

fn default_function_type() -> String {
    "function".to_string()
}

/// Where a tool name routes to.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolTarget {
    Http {
        url: String,
    },
    Rag {
        resource_to_collection_mapping: HashMap<String, String>,
    },
    Agent {
        bridge_id: String,
        requires_thread_id: bool,
        #[serde(default)]
        version_id: Option<String>,
    },
    WebSearch,
    WebCrawl,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectedAgent {
    pub bridge_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub agent_variables: HashMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FallBackConfig {
    #[serde(default)]
    pub is_enable: bool,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub apikey: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct BridgeLimits {
    pub bridge_limit: Option<f64>,
    pub folder_limit: Option<f64>,
    pub apikey_limit: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VariableState {
    /// e.g. "required" | "optional" — only `required` variables are reported
    /// as missing.
    pub status: String,
    #[serde(default)]
    pub default_value: Option<Value>,
}

/// The unit of agent configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub bridge_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    pub org_id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub service: Service,
    pub model: String,
    pub configuration: Value,
    #[serde(default)]
    pub apikey: Option<String>,
    #[serde(default)]
    pub apikey_object_id: HashMap<String, String>,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub tool_id_and_name_mapping: HashMap<String, ToolTarget>,
    #[serde(default)]
    pub connected_agents: HashMap<String, ConnectedAgent>,
    #[serde(default)]
    pub pre_tools: Option<ToolSpec>,
    #[serde(default)]
    pub variables_path: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub variables_state: HashMap<String, VariableState>,
    #[serde(default)]
    pub built_in_tools: Vec<String>,
    #[serde(default)]
    pub web_search_filters: Vec<String>,
    #[serde(default)]
    pub guardrails: GuardrailsConfig,
    #[serde(default)]
    pub fall_back: FallBackConfig,
    #[serde(default = "default_tool_call_count")]
    pub tool_call_count: u32,
    #[serde(default)]
    pub gpt_memory: bool,
    #[serde(default)]
    pub gpt_memory_context: Option<String>,
    #[serde(default)]
    pub bridge_summary: Option<String>,
    #[serde(default)]
    pub limits: BridgeLimits,
    #[serde(default)]
    pub wrapper_id: Option<String>,
    #[serde(default)]
    pub bridge_type: Option<BridgeType>,
}

fn default_tool_call_count() -> u32 {
    3
}

impl BridgeConfig {
    /// Invariant: `configuration.prompt` non-empty after
    /// template application.
    pub fn prompt(&self) -> &str {
        self.configuration
            .get("prompt")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Pricing + parameter schema for one (service, model) pair. Canonical parameter entries map name -> bounds; pricing
/// is per-million-token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelParamSpec {
    pub default: Value,
    #[serde(default)]
    pub min: Option<Value>,
    #[serde(default)]
    pub max: Option<Value>,
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_cost: f64,
    pub output_cost: f64,
    #[serde(default)]
    pub cached_cost: f64,
    #[serde(default)]
    pub caching_read_cost: f64,
    #[serde(default)]
    pub caching_write_cost: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelCapabilities {
    #[serde(default)]
    pub tools: bool,
    #[serde(default)]
    pub response_type: bool,
    #[serde(default)]
    pub images: bool,
    #[serde(default)]
    pub audio: bool,
    #[serde(default)]
    pub video: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub service: String,
    pub model: String,
    #[serde(default)]
    pub params: HashMap<String, ModelParamSpec>,
    pub pricing: ModelPricing,
    #[serde(default)]
    pub capabilities: ModelCapabilities,
}
