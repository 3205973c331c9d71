//! Google Gemini adapter: `contents[]` with `role∈{user,
//! model}` and typed `parts[]`; generation settings and tools bundle under
//! `config`; system prompt goes in `system_instruction`. Tool-call
//! detection inspects `candidates[0].content.parts[*].function_call`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    ChatOutcome, ChatRequest, DetectedToolCall, ProviderAdapter, ProviderUsage, RawModelResponse,
};
use crate::error::GatewayError;
use crate::provider::message::ChatMessage;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAdapter {
    client: Client,
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        GeminiAdapter {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client"),
        }
    }
}

fn to_contents(transcript: &[ChatMessage]) -> Vec<Value> {
    let mut contents = Vec::new();
    for message in transcript {
        match message {
            ChatMessage::User { content, attachments } => {
                let mut parts = vec![json!({"text": content})];
                for a in attachments {
                    parts.push(json!({"inline_data": {"mime_type": "image/jpeg", "data": a.url}}));
                }
                contents.push(json!({"role": "user", "parts": parts}));
            }
            ChatMessage::Assistant { content, tool_calls } => {
                let mut parts = Vec::new();
                if !content.is_empty() {
                    parts.push(json!({"text": content}));
                }
                for call in tool_calls {
                    parts.push(json!({"function_call": {"name": call.name, "args": call.arguments}}));
                }
                contents.push(json!({"role": "model", "parts": parts}));
            }
            ChatMessage::Tool { name, content, .. } => {
                contents.push(json!({
                    "role": "user",
                    "parts": [{"function_response": {"name": name, "response": {"result": content}}}]
                }));
            }
        }
    }
    contents
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatOutcome, GatewayError> {
        let base_url = req.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let contents = to_contents(&req.transcript);

        let mut body = serde_json::Map::new();
        body.insert("contents".to_string(), json!(contents));
        if let Some(sp) = &req.system_prompt {
            body.insert("system_instruction".to_string(), json!({"parts": [{"text": sp}]}));
        }
        if !req.tools.is_empty() {
            let declarations: Vec<Value> = req
                .tools
                .iter()
                .map(|t| json!({"name": t.name, "description": t.description, "parameters": {"type": "object", "properties": t.properties, "required": t.required}}))
                .collect();
            body.insert("tools".to_string(), json!([{"function_declarations": declarations}]));
        }
        if !req.params.is_empty() {
            body.insert("generationConfig".to_string(), Value::Object(req.params.clone()));
        }

        let url = format!("{base_url}/models/{}:generateContent?key={}", req.model, req.api_key);
        let resp = self.client.post(url).json(&Value::Object(body)).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                service: "gemini".to_string(),
                message: format!("{status}: {text}"),
            });
        }

        let raw: Value = resp.json().await?;
        let candidate = &raw["candidates"][0];
        let content = candidate["content"]["parts"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        let tool_calls = self.detect_tool_calls(&RawModelResponse(raw.clone()));

        let usage = ProviderUsage {
            input_tokens: raw["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            output_tokens: raw["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
            cached_tokens: raw["usageMetadata"]["cachedContentTokenCount"].as_u64().map(|n| n as u32),
            reasoning_tokens: raw["usageMetadata"]["thoughtsTokenCount"].as_u64().map(|n| n as u32),
            cache_read_tokens: None,
            cache_creation_tokens: None,
        };

        let finish_reason_raw = candidate["finishReason"].as_str().unwrap_or("STOP").to_lowercase();

        Ok(ChatOutcome {
            content,
            raw: RawModelResponse(raw),
            tool_calls,
            usage,
            finish_reason_raw,
        })
    }

    fn detect_tool_calls(&self, raw: &RawModelResponse) -> Vec<DetectedToolCall> {
        raw.0["candidates"][0]["content"]["parts"]
            .as_array()
            .into_iter()
            .flatten()
            .filter(|p| p.get("function_call").is_some())
            .enumerate()
            .map(|(i, p)| DetectedToolCall {
                call_id: format!("gemini-call-{i}"),
                name: p["function_call"]["name"].as_str().unwrap_or_default().to_string(),
                arguments: p["function_call"]["args"].clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_function_call_parts() {
        let adapter = GeminiAdapter::default();
        let raw = RawModelResponse(json!({
            "candidates": [{"content": {"parts": [
                {"function_call": {"name": "lookup", "args": {"q": "x"}}}
            ]}}]
        }));
        let calls = adapter.detect_tool_calls(&raw);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "lookup");
    }
}
