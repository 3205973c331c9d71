//! Shared `chat/completions`-shaped adapter used by every OpenAI-compatible
//! upstream. One struct, parameterized by name and
//! default base URL, avoids duplicating this logic five times.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    ChatOutcome, ChatRequest, DetectedToolCall, ProviderAdapter, ProviderUsage, RawModelResponse,
};
use crate::error::GatewayError;
use crate::provider::message::ChatMessage;

pub struct OpenAiCompatibleAdapter {
    client: Client,
    name: &'static str,
    default_base_url: &'static str,
}

impl OpenAiCompatibleAdapter {
    pub fn new(name: &'static str, default_base_url: &'static str) -> Self {
        OpenAiCompatibleAdapter {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client"),
            name,
            default_base_url,
        }
    }
}

fn to_messages(system_prompt: Option<&str>, transcript: &[ChatMessage]) -> Vec<Value> {
    let mut messages = Vec::new();
    if let Some(sp) = system_prompt {
        messages.push(json!({"role": "system", "content": sp}));
    }
    for message in transcript {
        match message {
            ChatMessage::User { content, attachments } => {
                if attachments.is_empty() {
                    messages.push(json!({"role": "user", "content": content}));
                } else {
                    let mut parts = vec![json!({"type": "text", "text": content})];
                    for a in attachments {
                        parts.push(json!({"type": "image_url", "image_url": {"url": a.url}}));
                    }
                    messages.push(json!({"role": "user", "content": parts}));
                }
            }
            ChatMessage::Assistant { content, tool_calls } => {
                let mut m = json!({"role": "assistant", "content": content});
                if !tool_calls.is_empty() {
                    m["tool_calls"] = json!(tool_calls
                        .iter()
                        .map(|c| json!({
                            "id": c.call_id,
                            "type": "function",
                            "function": {"name": c.name, "arguments": c.arguments.to_string()},
                        }))
                        .collect::<Vec<_>>());
                }
                messages.push(m);
            }
            ChatMessage::Tool { call_id, content, .. } => {
                messages.push(json!({"role": "tool", "tool_call_id": call_id, "content": content}));
            }
        }
    }
    messages
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatOutcome, GatewayError> {
        let base_url = req.base_url.as_deref().unwrap_or(self.default_base_url);
        let messages = to_messages(req.system_prompt.as_deref(), &req.transcript);

        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), json!(req.model));
        body.insert("messages".to_string(), json!(messages));
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| json!({"type": "function", "function": {"name": t.name, "description": t.description, "parameters": {"type": "object", "properties": t.properties, "required": t.required}}}))
                .collect();
            body.insert("tools".to_string(), json!(tools));
            body.insert("tool_choice".to_string(), req.tool_choice.clone());
        }
        for (k, v) in &req.params {
            body.insert(k.clone(), v.clone());
        }

        let resp = self
            .client
            .post(format!("{base_url}/chat/completions"))
            .bearer_auth(&req.api_key)
            .json(&Value::Object(body))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                service: self.name.to_string(),
                message: format!("{status}: {text}"),
            });
        }

        let raw: Value = resp.json().await?;
        let choice = &raw["choices"][0];
        let content = choice["message"]["content"].as_str().unwrap_or_default().to_string();
        let tool_calls = self.detect_tool_calls(&RawModelResponse(raw.clone()));

        let usage = ProviderUsage {
            input_tokens: raw["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: raw["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
            cached_tokens: raw["usage"]["prompt_tokens_details"]["cached_tokens"].as_u64().map(|n| n as u32),
            reasoning_tokens: raw["usage"]["completion_tokens_details"]["reasoning_tokens"].as_u64().map(|n| n as u32),
            cache_read_tokens: None,
            cache_creation_tokens: None,
        };

        let finish_reason_raw = choice["finish_reason"].as_str().unwrap_or("stop").to_string();

        Ok(ChatOutcome {
            content,
            raw: RawModelResponse(raw),
            tool_calls,
            usage,
            finish_reason_raw,
        })
    }

    fn detect_tool_calls(&self, raw: &RawModelResponse) -> Vec<DetectedToolCall> {
        raw.0["choices"][0]["message"]["tool_calls"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|call| DetectedToolCall {
                call_id: call["id"].as_str().unwrap_or_default().to_string(),
                name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
                arguments: call["function"]["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or(Value::Null),
            })
            .collect()
    }
}

pub fn groq() -> OpenAiCompatibleAdapter {
    OpenAiCompatibleAdapter::new("groq", "https://api.groq.com/openai/v1")
}

pub fn grok() -> OpenAiCompatibleAdapter {
    OpenAiCompatibleAdapter::new("grok", "https://api.x.ai/v1")
}

pub fn open_router() -> OpenAiCompatibleAdapter {
    OpenAiCompatibleAdapter::new("open_router", "https://openrouter.ai/api/v1")
}

pub fn mistral() -> OpenAiCompatibleAdapter {
    OpenAiCompatibleAdapter::new("mistral", "https://api.mistral.ai/v1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_tool_calls_from_choices_shape() {
        let adapter = OpenAiCompatibleAdapter::new("groq", "https://api.groq.com/openai/v1");
        let raw = RawModelResponse(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{"id": "call_1", "function": {"name": "lookup", "arguments": "{\"q\":1}"}}]
                }
            }]
        }));
        let calls = adapter.detect_tool_calls(&raw);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "lookup");
    }
}
