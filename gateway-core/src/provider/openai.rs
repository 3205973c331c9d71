//! OpenAI Responses API adapter. Tool calls are detected via
//! `output[*].type=="function_call"`. The adapter retries once, locally,
//! filtering duplicate ids from `input[]` before re-dispatch — the
//! documented OpenAI-specific duplicate-id workaround; there is
//! no general engine-level retry for this.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    ChatOutcome, ChatRequest, DetectedToolCall, ProviderAdapter, ProviderUsage, RawModelResponse,
};
use crate::error::GatewayError;
use crate::provider::message::ChatMessage;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DUPLICATE_ID_RETRY_ATTEMPTS: u32 = 2;

pub struct OpenAiAdapter {
    client: Client,
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        OpenAiAdapter {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client"),
        }
    }
}

fn to_input_items(system_prompt: Option<&str>, transcript: &[ChatMessage]) -> Vec<Value> {
    let mut items = Vec::new();
    if let Some(sp) = system_prompt {
        items.push(json!({"role": "system", "content": [{"type": "input_text", "text": sp}]}));
    }
    for message in transcript {
        match message {
            ChatMessage::User { content, attachments } => {
                let mut parts = vec![json!({"type": "input_text", "text": content})];
                for a in attachments {
                    parts.push(json!({"type": "input_image", "image_url": a.url}));
                }
                items.push(json!({"role": "user", "content": parts}));
            }
            ChatMessage::Assistant { content, tool_calls } => {
                if !content.is_empty() {
                    items.push(json!({"role": "assistant", "content": [{"type": "output_text", "text": content}]}));
                }
                for call in tool_calls {
                    items.push(json!({
                        "type": "function_call",
                        "call_id": call.call_id,
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }));
                }
            }
            ChatMessage::Tool { call_id, content, .. } => {
                items.push(json!({
                    "type": "function_call_output",
                    "call_id": call_id,
                    "output": content,
                }));
            }
        }
    }
    items
}

/// Filters items whose `call_id` appears more than once, keeping only the
/// first occurrence — the duplicate-id workaround's local retry body.
fn dedupe_call_ids(items: Vec<Value>) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| match item.get("call_id").and_then(Value::as_str) {
            Some(id) => seen.insert(id.to_string()),
            None => true,
        })
        .collect()
}

impl OpenAiAdapter {
    async fn dispatch(&self, req: &ChatRequest, input: &[Value]) -> Result<Value, GatewayError> {
        let base_url = req.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), json!(req.model));
        body.insert("input".to_string(), json!(input));
        if !req.tools.is_empty() {
            body.insert("tools".to_string(), json!(req.tools));
            body.insert("tool_choice".to_string(), req.tool_choice.clone());
        }
        for (k, v) in &req.params {
            body.insert(k.clone(), v.clone());
        }

        let resp = self
            .client
            .post(format!("{base_url}/responses"))
            .bearer_auth(&req.api_key)
            .json(&Value::Object(body))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                service: "openai".to_string(),
                message: format!("{status}: {text}"),
            });
        }

        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatOutcome, GatewayError> {
        let mut input = to_input_items(req.system_prompt.as_deref(), &req.transcript);

        let mut raw = self.dispatch(&req, &input).await;
        let mut attempt = 0;
        while raw.is_err() && attempt < DUPLICATE_ID_RETRY_ATTEMPTS {
            input = dedupe_call_ids(input);
            raw = self.dispatch(&req, &input).await;
            attempt += 1;
        }
        let raw = raw?;

        let content = raw["output"]
            .as_array()
            .into_iter()
            .flatten()
            .filter(|item| item["type"] == "message")
            .flat_map(|item| item["content"].as_array().cloned().unwrap_or_default())
            .filter_map(|part| part["text"].as_str().map(str::to_string))
            .collect::<Vec<_>>()
            .join("");

        let tool_calls = self.detect_tool_calls(&RawModelResponse(raw.clone()));

        let usage = ProviderUsage {
            input_tokens: raw["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: raw["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
            cached_tokens: raw["usage"]["input_tokens_details"]["cached_tokens"].as_u64().map(|n| n as u32),
            reasoning_tokens: raw["usage"]["output_tokens_details"]["reasoning_tokens"].as_u64().map(|n| n as u32),
            cache_read_tokens: None,
            cache_creation_tokens: None,
        };

        let finish_reason_raw = if !tool_calls.is_empty() {
            "tool_calls".to_string()
        } else {
            raw["status"].as_str().unwrap_or("completed").to_string()
        };

        Ok(ChatOutcome {
            content,
            raw: RawModelResponse(raw),
            tool_calls,
            usage,
            finish_reason_raw,
        })
    }

    fn detect_tool_calls(&self, raw: &RawModelResponse) -> Vec<DetectedToolCall> {
        raw.0["output"]
            .as_array()
            .into_iter()
            .flatten()
            .filter(|item| item["type"] == "function_call")
            .map(|item| DetectedToolCall {
                call_id: item["call_id"].as_str().unwrap_or_default().to_string(),
                name: item["name"].as_str().unwrap_or_default().to_string(),
                arguments: item["arguments"]
                    .as_str()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or(Value::Null),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_function_call_items() {
        let adapter = OpenAiAdapter::default();
        let raw = RawModelResponse(json!({
            "output": [
                {"type": "message", "content": [{"type": "output_text", "text": "hi"}]},
                {"type": "function_call", "call_id": "c1", "name": "lookup", "arguments": "{\"q\":\"x\"}"}
            ]
        }));
        let calls = adapter.detect_tool_calls(&raw);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "lookup");
        assert_eq!(calls[0].arguments, json!({"q": "x"}));
    }

    #[test]
    fn dedupe_keeps_first_occurrence_of_each_call_id() {
        let items = vec![
            json!({"call_id": "1", "type": "function_call"}),
            json!({"call_id": "1", "type": "function_call"}),
            json!({"call_id": "2", "type": "function_call"}),
        ];
        let deduped = dedupe_call_ids(items);
        assert_eq!(deduped.len(), 2);
    }
}
