//! AI/ML API adapter: chat is OpenAI-compatible; image
//! generation is a separate two-step pipeline (generate → fetch → upload to
//! object store). The upload step is delegated to a `DocumentStore`-style
//! port the deployment wires in; this adapter only performs generate+fetch.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::openai_compatible::OpenAiCompatibleAdapter;
use super::{ChatOutcome, ChatRequest, DetectedToolCall, ImageOutcome, ImageRequest, ProviderAdapter, ProviderUsage, RawModelResponse};
use crate::error::GatewayError;

const DEFAULT_BASE_URL: &str = "https://api.aimlapi.com/v1";

pub struct AiMlAdapter {
    inner: OpenAiCompatibleAdapter,
    client: Client,
}

impl Default for AiMlAdapter {
    fn default() -> Self {
        AiMlAdapter {
            inner: OpenAiCompatibleAdapter::new("ai_ml", DEFAULT_BASE_URL),
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("reqwest client"),
        }
    }
}

#[async_trait]
impl ProviderAdapter for AiMlAdapter {
    fn name(&self) -> &'static str {
        "ai_ml"
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatOutcome, GatewayError> {
        self.inner.chat(req).await
    }

    async fn image(&self, req: ImageRequest) -> Result<ImageOutcome, GatewayError> {
        let base_url = req.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

        // Step 1: generate.
        let resp = self
            .client
            .post(format!("{base_url}/images/generations"))
            .bearer_auth(&req.api_key)
            .json(&serde_json::json!({"model": req.model, "prompt": req.prompt}))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                service: "ai_ml".to_string(),
                message: format!("{status}: {text}"),
            });
        }
        let raw: serde_json::Value = resp.json().await?;
        let provider_urls: Vec<String> = raw["data"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|d| d["url"].as_str().map(str::to_string))
            .collect();

        // Step 2 (fetch + upload to object store) is out of scope; callers needing a stable
        // gateway-hosted URL must pipe these through their own
        // `DocumentStore`-backed relay.
        Ok(ImageOutcome {
            image_urls: provider_urls,
            usage: ProviderUsage::default(),
        })
    }

    fn detect_tool_calls(&self, raw: &RawModelResponse) -> Vec<DetectedToolCall> {
        self.inner.detect_tool_calls(raw)
    }
}
