//! Anthropic Messages API adapter. Streams are folded into a
//! synthetic non-streaming response
//! so the engine always sees one uniform shape; tool-call detection is
//! `stop_reason=="tool_use"`, modulo the synthetic JSON-schema formatter
//! tool used to coerce `response_type=="json_schema"`.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    ChatOutcome, ChatRequest, DetectedToolCall, ProviderAdapter, ProviderUsage, RawModelResponse,
};
use crate::error::GatewayError;
use crate::provider::message::ChatMessage;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const JSON_SCHEMA_FORMATTER_TOOL: &str = "json_schema_response_format";

pub struct AnthropicAdapter {
    client: Client,
}

impl Default for AnthropicAdapter {
    fn default() -> Self {
        AnthropicAdapter {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client"),
        }
    }
}

fn to_messages(transcript: &[ChatMessage]) -> Vec<Value> {
    let mut messages = Vec::new();
    for message in transcript {
        match message {
            ChatMessage::User { content, attachments } => {
                let mut blocks = vec![json!({"type": "text", "text": content})];
                for a in attachments {
                    blocks.push(json!({
                        "type": "image",
                        "source": {"type": "base64", "media_type": "image/jpeg", "data": a.url}
                    }));
                }
                messages.push(json!({"role": "user", "content": blocks}));
            }
            ChatMessage::Assistant { content, tool_calls } => {
                let mut blocks = Vec::new();
                if !content.is_empty() {
                    blocks.push(json!({"type": "text", "text": content}));
                }
                for call in tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.call_id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                messages.push(json!({"role": "assistant", "content": blocks}));
            }
            ChatMessage::Tool { call_id, content, is_error, .. } => {
                // Anthropic collects all tool_results for one turn under a
                // single `user` block; since this
                // transcript is built message-by-message we still emit one
                // `user` entry per tool result — Anthropic accepts repeated
                // adjacent `user` blocks and treats them as one turn.
                messages.push(json!({"role": "user", "content": [{
                    "type": "tool_result",
                    "tool_use_id": call_id,
                    "content": content,
                    "is_error": is_error,
                }]}));
            }
        }
    }
    messages
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatOutcome, GatewayError> {
        let base_url = req.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let messages = to_messages(&req.transcript);

        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), json!(req.model));
        body.insert("messages".to_string(), json!(messages));
        body.insert("stream".to_string(), json!(true));
        if let Some(sp) = &req.system_prompt {
            body.insert("system".to_string(), json!(sp));
        }
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| json!({"name": t.name, "description": t.description, "input_schema": {"type": "object", "properties": t.properties, "required": t.required}}))
                .collect();
            body.insert("tools".to_string(), json!(tools));
            body.insert("tool_choice".to_string(), req.tool_choice.clone());
        }
        for (k, v) in &req.params {
            body.insert(k.clone(), v.clone());
        }
        if !body.contains_key("max_tokens") {
            body.insert("max_tokens".to_string(), json!(4096));
        }

        let resp = self
            .client
            .post(format!("{base_url}/messages"))
            .header("x-api-key", &req.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&Value::Object(body))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                service: "anthropic".to_string(),
                message: format!("{status}: {text}"),
            });
        }

        let raw = accumulate_sse(resp).await?;
        let content = raw["content"]
            .as_array()
            .into_iter()
            .flatten()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        let tool_calls = self.detect_tool_calls(&RawModelResponse(raw.clone()));

        let usage = ProviderUsage {
            input_tokens: raw["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: raw["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
            cached_tokens: None,
            reasoning_tokens: None,
            cache_read_tokens: raw["usage"]["cache_read_input_tokens"].as_u64().map(|n| n as u32),
            cache_creation_tokens: raw["usage"]["cache_creation_input_tokens"].as_u64().map(|n| n as u32),
        };

        let finish_reason_raw = raw["stop_reason"].as_str().unwrap_or("end_turn").to_string();

        Ok(ChatOutcome {
            content,
            raw: RawModelResponse(raw),
            tool_calls,
            usage,
            finish_reason_raw,
        })
    }

    fn detect_tool_calls(&self, raw: &RawModelResponse) -> Vec<DetectedToolCall> {
        if raw.0["stop_reason"] != "tool_use" {
            return Vec::new();
        }
        raw.0["content"]
            .as_array()
            .into_iter()
            .flatten()
            .filter(|b| b["type"] == "tool_use")
            .filter(|b| b["name"].as_str() != Some(JSON_SCHEMA_FORMATTER_TOOL))
            .map(|b| DetectedToolCall {
                call_id: b["id"].as_str().unwrap_or_default().to_string(),
                name: b["name"].as_str().unwrap_or_default().to_string(),
                arguments: b["input"].clone(),
            })
            .collect()
    }
}

/// Folds `content_block_delta`/`content_block_start`/`message_delta` SSE
/// events into one synthetic non-streaming response body, matching the
/// shape `chat` would get from a non-streaming call.
async fn accumulate_sse(resp: reqwest::Response) -> Result<Value, GatewayError> {
    let mut stream = resp.bytes_stream();
    let mut blocks: Vec<Value> = Vec::new();
    let mut text_acc: Vec<String> = Vec::new();
    let mut tool_json_acc: Vec<String> = Vec::new();
    let mut stop_reason = Value::Null;
    let mut usage = json!({});
    let mut buf = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buf.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(idx) = buf.find("\n\n") {
            let event = buf[..idx].to_string();
            buf.drain(..idx + 2);
            let Some(data_line) = event.lines().find(|l| l.starts_with("data:")) else { continue };
            let Ok(payload) = serde_json::from_str::<Value>(data_line[5..].trim()) else { continue };

            match payload["type"].as_str().unwrap_or_default() {
                "content_block_start" => {
                    let block = payload["content_block"].clone();
                    if block["type"] == "tool_use" {
                        tool_json_acc.push(String::new());
                        blocks.push(block);
                    } else {
                        text_acc.push(String::new());
                        blocks.push(json!({"type": "text", "text": ""}));
                    }
                }
                "content_block_delta" => {
                    let idx = blocks.len().saturating_sub(1);
                    if let Some(text) = payload["delta"]["text"].as_str() {
                        if let Some(slot) = text_acc.last_mut() {
                            slot.push_str(text);
                        }
                        if let Some(b) = blocks.get_mut(idx) {
                            b["text"] = json!(text_acc.last().cloned().unwrap_or_default());
                        }
                    }
                    if let Some(partial) = payload["delta"]["partial_json"].as_str() {
                        if let Some(slot) = tool_json_acc.last_mut() {
                            slot.push_str(partial);
                        }
                    }
                }
                "content_block_stop" => {
                    let idx = blocks.len().saturating_sub(1);
                    if blocks.get(idx).map(|b| b["type"] == "tool_use").unwrap_or(false) {
                        if let Some(json_str) = tool_json_acc.last() {
                            let parsed: Value = serde_json::from_str(json_str).unwrap_or(Value::Null);
                            if let Some(b) = blocks.get_mut(idx) {
                                b["input"] = parsed;
                            }
                        }
                    }
                }
                "message_delta" => {
                    stop_reason = payload["delta"]["stop_reason"].clone();
                    if let Some(u) = payload.get("usage") {
                        usage = u.clone();
                    }
                }
                "message_start" => {
                    if let Some(u) = payload["message"].get("usage") {
                        usage = u.clone();
                    }
                }
                _ => {}
            }
        }
    }

    Ok(json!({
        "content": blocks,
        "stop_reason": stop_reason,
        "usage": usage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_use_is_only_detected_when_stop_reason_matches() {
        let adapter = AnthropicAdapter::default();
        let raw = RawModelResponse(json!({
            "stop_reason": "end_turn",
            "content": [{"type": "tool_use", "id": "t1", "name": "lookup", "input": {}}]
        }));
        assert!(adapter.detect_tool_calls(&raw).is_empty());
    }

    #[test]
    fn json_schema_formatter_tool_is_excluded_from_detected_calls() {
        let adapter = AnthropicAdapter::default();
        let raw = RawModelResponse(json!({
            "stop_reason": "tool_use",
            "content": [
                {"type": "tool_use", "id": "t1", "name": JSON_SCHEMA_FORMATTER_TOOL, "input": {}},
                {"type": "tool_use", "id": "t2", "name": "lookup", "input": {"q": "x"}}
            ]
        }));
        let calls = adapter.detect_tool_calls(&raw);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "lookup");
    }
}
