//! Response shapes returned to the caller, uniform across all providers.

use crate::finish_reason::FinishReason;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
    pub cost: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatData {
    pub id: String,
    pub content: String,
    pub model: String,
    pub role: String,
    pub finish_reason: FinishReason,
    #[serde(default)]
    pub tools_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_attempt_error: Option<String>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub blocked_by_guardrails: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ChatResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub data: ChatData,
    pub usage: Usage,
}

impl ChatResponse {
    /// Synchronous success path.
    pub fn synchronous(data: ChatData, usage: Usage) -> Self {
        ChatResponse {
            success: true,
            response: Some(ChatResponseBody { data, usage }),
            message: None,
        }
    }

    /// Ack returned when `response_format.type` deflects to a push channel.
    pub fn deferred_ack() -> Self {
        ChatResponse {
            success: true,
            response: None,
            message: Some("Your response will be sent through configured means.".to_string()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub vectors: Vec<Vec<f32>>,
    pub model: String,
    pub message_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingResponseBody {
    pub data: EmbeddingData,
    pub usage: Usage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<EmbeddingResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EmbeddingResponse {
    pub fn synchronous(data: EmbeddingData, usage: Usage) -> Self {
        EmbeddingResponse { success: true, response: Some(EmbeddingResponseBody { data, usage }), message: None }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageData {
    pub image_urls: Vec<String>,
    pub model: String,
    pub message_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageResponseBody {
    pub data: ImageData,
    pub usage: Usage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ImageResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ImageResponse {
    pub fn synchronous(data: ImageData, usage: Usage) -> Self {
        ImageResponse { success: true, response: Some(ImageResponseBody { data, usage }), message: None }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoData {
    pub video_urls: Vec<String>,
    pub model: String,
    pub message_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoResponseBody {
    pub data: VideoData,
    pub usage: Usage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<VideoResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VideoResponse {
    pub fn synchronous(data: VideoData, usage: Usage) -> Self {
        VideoResponse { success: true, response: Some(VideoResponseBody { data, usage }), message: None }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchAckResponse {
    pub batch_id: String,
    pub messages: Vec<BatchItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchItem {
    pub message: String,
    pub custom_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_ack_has_no_response_body() {
        let ack = ChatResponse::deferred_ack();
        assert!(ack.success);
        assert!(ack.response.is_none());
        assert!(ack.message.is_some());
    }

    #[test]
    fn synchronous_response_round_trips_through_json() {
        let data = ChatData {
            id: "1".into(),
            content: "hi".into(),
            model: "gpt-4o".into(),
            role: "assistant".into(),
            finish_reason: FinishReason::Completed,
            tools_data: Value::Null,
            images: None,
            annotations: None,
            fallback: false,
            first_attempt_error: None,
            message_id: "m1".into(),
            blocked_by_guardrails: false,
        };
        let resp = ChatResponse::synchronous(data, Usage::default());
        let json = serde_json::to_string(&resp).unwrap();
        let back: ChatResponse = serde_json::from_str(&json).unwrap();
        assert!(back.success);
        assert_eq!(back.response.unwrap().data.content, "hi");
    }
}
