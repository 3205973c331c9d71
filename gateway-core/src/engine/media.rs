//! Embedding/Image/Video turns:
//! same configuration envelope as chat, dispatched to the provider's media
//! capability instead of `chat`, then priced and persisted the same way.

use uuid::Uuid;

use super::GatewayEngine;
use crate::config::resolver::ResolveOverrides;
use crate::error::GatewayError;
use crate::limits::{compute_total_cost, rate_limit, update_cost, TokenCounts};
use crate::provider::{EmbedRequest, ImageRequest, ProviderUsage, VideoRequest};
use gateway_protocol::{
    ChatRequest as WireChatRequest, EmbeddingData, EmbeddingResponse, ImageData, ImageResponse, Usage, VideoData,
    VideoResponse,
};

fn usage_of(provider_usage: &ProviderUsage, cost: f64) -> Usage {
    Usage {
        input_tokens: provider_usage.input_tokens,
        output_tokens: provider_usage.output_tokens,
        total_tokens: provider_usage.input_tokens + provider_usage.output_tokens,
        cached_tokens: provider_usage.cached_tokens,
        reasoning_tokens: provider_usage.reasoning_tokens,
        cost,
    }
}

impl GatewayEngine {
    pub async fn run_embedding(&self, req: WireChatRequest) -> Result<EmbeddingResponse, GatewayError> {
        if !rate_limit::bridge_allowed(&self.cache, &req.bridge_id).await? {
            return Err(GatewayError::Validation("bridge rate limit exceeded".to_string()));
        }
        let resolved = self
            .resolver
            .resolve(&req.bridge_id, req.version_id.as_deref(), ResolveOverrides::default())
            .await?;
        let cfg = resolved.primary().clone();
        let adapter = self.providers.get(cfg.service.as_str())?;
        let input = req.user.clone().into_iter().collect::<Vec<_>>();
        let outcome = adapter
            .embed(EmbedRequest { model: cfg.model.clone(), input, api_key: cfg.apikey.clone().unwrap_or_default(), base_url: None })
            .await?;

        let model_config = self.store.get_model_config(cfg.service.as_str(), &cfg.model).await?;
        let tokens = TokenCounts { input: outcome.usage.input_tokens as u64, ..Default::default() };
        let total_cost = compute_total_cost(tokens, &model_config);
        update_cost(&cfg, total_cost, &self.cache).await?;

        let data = EmbeddingData { vectors: outcome.vectors, model: cfg.model.clone(), message_id: Uuid::new_v4().to_string() };
        Ok(EmbeddingResponse::synchronous(data, usage_of(&outcome.usage, total_cost)))
    }

    pub async fn run_image(&self, req: WireChatRequest) -> Result<ImageResponse, GatewayError> {
        if !rate_limit::bridge_allowed(&self.cache, &req.bridge_id).await? {
            return Err(GatewayError::Validation("bridge rate limit exceeded".to_string()));
        }
        let resolved = self
            .resolver
            .resolve(&req.bridge_id, req.version_id.as_deref(), ResolveOverrides::default())
            .await?;
        let cfg = resolved.primary().clone();
        let adapter = self.providers.get(cfg.service.as_str())?;
        let prompt = req.user.clone().unwrap_or_default();
        let outcome = adapter
            .image(ImageRequest { model: cfg.model.clone(), prompt, api_key: cfg.apikey.clone().unwrap_or_default(), base_url: None })
            .await?;

        let model_config = self.store.get_model_config(cfg.service.as_str(), &cfg.model).await?;
        let tokens = TokenCounts { input: outcome.usage.input_tokens as u64, output: outcome.usage.output_tokens as u64, ..Default::default() };
        let total_cost = compute_total_cost(tokens, &model_config);
        update_cost(&cfg, total_cost, &self.cache).await?;

        let data = ImageData { image_urls: outcome.image_urls, model: cfg.model.clone(), message_id: Uuid::new_v4().to_string() };
        Ok(ImageResponse::synchronous(data, usage_of(&outcome.usage, total_cost)))
    }

    pub async fn run_video(&self, req: WireChatRequest) -> Result<VideoResponse, GatewayError> {
        if !rate_limit::bridge_allowed(&self.cache, &req.bridge_id).await? {
            return Err(GatewayError::Validation("bridge rate limit exceeded".to_string()));
        }
        let resolved = self
            .resolver
            .resolve(&req.bridge_id, req.version_id.as_deref(), ResolveOverrides::default())
            .await?;
        let cfg = resolved.primary().clone();
        let adapter = self.providers.get(cfg.service.as_str())?;
        let prompt = req.user.clone().unwrap_or_default();
        let outcome = adapter
            .video(VideoRequest { model: cfg.model.clone(), prompt, api_key: cfg.apikey.clone().unwrap_or_default(), base_url: None })
            .await?;

        let model_config = self.store.get_model_config(cfg.service.as_str(), &cfg.model).await?;
        let tokens = TokenCounts { input: outcome.usage.input_tokens as u64, output: outcome.usage.output_tokens as u64, ..Default::default() };
        let total_cost = compute_total_cost(tokens, &model_config);
        update_cost(&cfg, total_cost, &self.cache).await?;

        let data = VideoData { video_urls: outcome.video_urls, model: cfg.model.clone(), message_id: Uuid::new_v4().to_string() };
        Ok(VideoResponse::synchronous(data, usage_of(&outcome.usage, total_cost)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolver::ConfigurationResolver;
    use crate::context::alert::AlertType;
    use crate::provider::{
        BatchHandle, BatchPollOutcome, BatchSubmitRequest, ChatOutcome, ChatRequest, DetectedToolCall, EmbedOutcome,
        ImageOutcome, ProviderAdapter, ProviderRegistry, ProviderTranscript, RawModelResponse, ToolExecutionResult,
        VideoOutcome,
    };
    use crate::testing::{InMemoryAlertSink, InMemoryCache, InMemoryConversationStore, InMemoryDocumentStore, InMemoryResponseChannel};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MediaAdapter;

    #[async_trait]
    impl ProviderAdapter for MediaAdapter {
        fn name(&self) -> &'static str {
            "openai"
        }

        async fn chat(&self, _req: ChatRequest) -> Result<ChatOutcome, GatewayError> {
            unimplemented!("not exercised by media tests")
        }

        async fn embed(&self, req: EmbedRequest) -> Result<EmbedOutcome, GatewayError> {
            Ok(EmbedOutcome {
                vectors: req.input.iter().map(|_| vec![0.1, 0.2, 0.3]).collect(),
                usage: ProviderUsage { input_tokens: 7, output_tokens: 0, ..Default::default() },
            })
        }

        async fn image(&self, _req: ImageRequest) -> Result<ImageOutcome, GatewayError> {
            Ok(ImageOutcome {
                image_urls: vec!["https://example.com/generated.png".to_string()],
                usage: ProviderUsage { input_tokens: 12, output_tokens: 0, ..Default::default() },
            })
        }

        async fn video(&self, _req: VideoRequest) -> Result<VideoOutcome, GatewayError> {
            unimplemented!("not exercised by media tests")
        }

        async fn batch_submit(&self, _req: BatchSubmitRequest) -> Result<BatchHandle, GatewayError> {
            unimplemented!()
        }

        async fn batch_poll(&self, _handle: &BatchHandle) -> Result<BatchPollOutcome, GatewayError> {
            unimplemented!()
        }

        fn detect_tool_calls(&self, _raw: &RawModelResponse) -> Vec<DetectedToolCall> {
            Vec::new()
        }

        fn merge_tool_results(&self, _t: &mut ProviderTranscript, _c: &[DetectedToolCall], _r: &[ToolExecutionResult]) {}
    }

    fn make_engine() -> GatewayEngine {
        let store = Arc::new(InMemoryDocumentStore::with_simple_bridge("b1"));
        let cache: Arc<dyn crate::cache::DistributedCache> = Arc::new(InMemoryCache::default());
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MediaAdapter));
        let resolver = Arc::new(ConfigurationResolver::new(
            store.clone(),
            cache.clone(),
            b"test-encryption-key-32-bytes-ok".to_vec(),
            b"iv-seed".to_vec(),
            HashMap::new(),
        ));
        let tool_invoker = Arc::new(crate::tools::ToolInvoker::new(reqwest::Client::new(), None, None));
        GatewayEngine::new(
            resolver,
            cache,
            store,
            Arc::new(registry),
            tool_invoker,
            Arc::new(InMemoryConversationStore::default()),
            Arc::new(InMemoryResponseChannel::default()),
            Arc::new(InMemoryAlertSink::default()),
            vec![AlertType::GuardrailsBlocked],
        )
    }

    fn wire_request() -> WireChatRequest {
        WireChatRequest {
            bridge_id: "b1".to_string(),
            version_id: None,
            org_id: None,
            user: Some("a sentence to embed".to_string()),
            configuration: serde_json::Value::Null,
            variables: HashMap::new(),
            thread_id: None,
            sub_thread_id: None,
            response_format: Default::default(),
            fall_back: None,
            guardrails: None,
            tool_call_count: None,
            orchestrator_flag: false,
            user_urls: Vec::new(),
            extra_tools: Vec::new(),
            built_in_tools: Vec::new(),
            web_search_filters: Vec::new(),
        }
    }

    #[tokio::test]
    async fn embedding_turn_returns_one_vector_per_input_and_priced_usage() {
        let engine = make_engine();
        let resp = engine.run_embedding(wire_request()).await.unwrap();
        let body = resp.response.unwrap();
        assert_eq!(body.data.vectors.len(), 1);
        assert_eq!(body.usage.input_tokens, 7);
        assert!(body.usage.cost > 0.0);
    }

    #[tokio::test]
    async fn image_turn_returns_generated_urls() {
        let engine = make_engine();
        let resp = engine.run_image(wire_request()).await.unwrap();
        let body = resp.response.unwrap();
        assert_eq!(body.data.image_urls, vec!["https://example.com/generated.png".to_string()]);
    }
}
