//! Provider Adapters: one implementation per upstream LLM
//! service, all behind the single [`ProviderAdapter`] capability interface.

pub mod ai_ml;
pub mod anthropic;
pub mod gemini;
pub mod message;
pub mod openai;
pub mod openai_compatible;
pub mod openai_completion;

pub use message::{
    merge_tool_results, Attachment, AttachmentKind, ChatMessage, DetectedToolCall,
    ProviderTranscript, ToolExecutionResult,
};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::types::ToolSpec;
use crate::error::GatewayError;

#[derive(Clone, Debug, Default)]
pub struct ProviderUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cached_tokens: Option<u32>,
    pub reasoning_tokens: Option<u32>,
    /// Anthropic `cache_read_input_tokens` equivalent; distinct from
    /// `cached_tokens`, which other providers report under a single field.
    pub cache_read_tokens: Option<u32>,
    pub cache_creation_tokens: Option<u32>,
}

/// Opaque wrapper around a provider's raw JSON response body, kept around
/// for diagnostics and for adapters' own `detect_tool_calls` to re-parse if
/// the caller passes it back in rather than the already-extracted value.
#[derive(Clone, Debug)]
pub struct RawModelResponse(pub Value);

#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub transcript: ProviderTranscript,
    pub tools: Vec<ToolSpec>,
    /// Already service-formatted: bare string or
    /// `{type, name}`.
    pub tool_choice: Value,
    /// Already normalized provider parameter names.
    pub params: serde_json::Map<String, Value>,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ChatOutcome {
    pub content: String,
    pub raw: RawModelResponse,
    pub tool_calls: Vec<DetectedToolCall>,
    pub usage: ProviderUsage,
    /// Raw provider finish/stop-reason string, mapped by
    /// `gateway_protocol::FinishReason::from_raw`.
    pub finish_reason_raw: String,
}

#[derive(Clone, Debug)]
pub struct EmbedRequest {
    pub model: String,
    pub input: Vec<String>,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EmbedOutcome {
    pub vectors: Vec<Vec<f32>>,
    pub usage: ProviderUsage,
}

#[derive(Clone, Debug)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ImageOutcome {
    pub image_urls: Vec<String>,
    pub usage: ProviderUsage,
}

#[derive(Clone, Debug)]
pub struct VideoRequest {
    pub model: String,
    pub prompt: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct VideoOutcome {
    pub video_urls: Vec<String>,
    pub usage: ProviderUsage,
}

#[derive(Clone, Debug)]
pub struct BatchSubmitRequest {
    pub model: String,
    pub requests: Vec<Value>,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct BatchHandle {
    pub provider_batch_id: String,
}

#[derive(Clone, Debug)]
pub struct BatchResultItem {
    pub custom_id: String,
    pub success: bool,
    pub body: Value,
}

#[derive(Clone, Debug)]
pub struct BatchPollOutcome {
    pub done: bool,
    pub results: Vec<BatchResultItem>,
}

/// Every adapter's only seam on provider identity:
/// the engine never branches on service name except to pick the adapter
/// instance from a registry (see [`ProviderRegistry`]).
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn chat(&self, req: ChatRequest) -> Result<ChatOutcome, GatewayError>;

    async fn embed(&self, _req: EmbedRequest) -> Result<EmbedOutcome, GatewayError> {
        Err(GatewayError::unsupported("embed", self.name()))
    }

    async fn image(&self, _req: ImageRequest) -> Result<ImageOutcome, GatewayError> {
        Err(GatewayError::unsupported("image", self.name()))
    }

    async fn video(&self, _req: VideoRequest) -> Result<VideoOutcome, GatewayError> {
        Err(GatewayError::unsupported("video", self.name()))
    }

    async fn batch_submit(&self, _req: BatchSubmitRequest) -> Result<BatchHandle, GatewayError> {
        Err(GatewayError::unsupported("batch_submit", self.name()))
    }

    async fn batch_poll(&self, _handle: &BatchHandle) -> Result<BatchPollOutcome, GatewayError> {
        Err(GatewayError::unsupported("batch_poll", self.name()))
    }

    fn detect_tool_calls(&self, raw: &RawModelResponse) -> Vec<DetectedToolCall>;

    fn merge_tool_results(&self, transcript: &mut ProviderTranscript, tool_calls: &[DetectedToolCall], results: &[ToolExecutionResult]) {
        message::merge_tool_results(transcript, tool_calls, results);
    }
}

/// `HashMap<Service, Arc<dyn ProviderAdapter>>` registry the engine picks
/// an adapter instance from.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<&'static str, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry { adapters: HashMap::new() }
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.name(), adapter);
    }

    pub fn get(&self, service: &str) -> Result<Arc<dyn ProviderAdapter>, GatewayError> {
        self.adapters
            .get(service)
            .cloned()
            .ok_or_else(|| GatewayError::Validation(format!("unknown service: {service}")))
    }
}
