//! Request envelopes for the chat, batch, embedding, image, and video
//! endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserUrlType {
    Image,
    Pdf,
    Audio,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserUrl {
    pub url: String,
    #[serde(rename = "type")]
    pub url_type: UserUrlType,
}

/// `response_format.type`: `default` returns synchronously; `RTLayer` and
/// `webhook` push the shaped response and return only an ack.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum ResponseFormat {
    Default,
    #[serde(rename = "RTLayer")]
    RtLayer {
        #[serde(flatten)]
        cred: RtLayerCred,
    },
    Webhook {
        #[serde(flatten)]
        cred: WebhookCred,
    },
}

impl Default for ResponseFormat {
    fn default() -> Self {
        ResponseFormat::Default
    }
}

impl ResponseFormat {
    /// True for any non-default channel: the chat endpoint must deflect
    /// these to the primary queue.
    pub fn is_async_channel(&self) -> bool {
        !matches!(self, ResponseFormat::Default)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RtLayerCred {
    pub channel: String,
    pub ttl: u64,
    pub apikey: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookCred {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub bridge_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    /// Forces the first model call's tool choice (`auto`/`required`/a tool
    /// name); ignored past the first hop of a transfer chain.
    #[serde(default)]
    pub tool_choice: Option<String>,
    #[serde(default)]
    pub configuration: Value,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub sub_thread_id: Option<String>,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub fall_back: Option<Value>,
    #[serde(default)]
    pub guardrails: Option<Value>,
    #[serde(default)]
    pub tool_call_count: Option<u32>,
    #[serde(default)]
    pub orchestrator_flag: bool,
    #[serde(default)]
    pub user_urls: Vec<UserUrl>,
    #[serde(default)]
    pub extra_tools: Vec<Value>,
    #[serde(default)]
    pub built_in_tools: Vec<String>,
    #[serde(default)]
    pub web_search_filters: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub bridge_id: String,
    pub batch: Vec<String>,
    pub webhook: WebhookCred,
    #[serde(default)]
    pub batch_variables: Option<Vec<HashMap<String, Value>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_response_format_is_sync_default() {
        let rf = ResponseFormat::default();
        assert!(!rf.is_async_channel());
    }

    #[test]
    fn webhook_and_rtlayer_are_async_channels() {
        let wh = ResponseFormat::Webhook {
            cred: WebhookCred {
                url: "https://example.com".into(),
                headers: HashMap::new(),
            },
        };
        assert!(wh.is_async_channel());

        let rt = ResponseFormat::RtLayer {
            cred: RtLayerCred {
                channel: "c1".into(),
                ttl: 60,
                apikey: "k".into(),
            },
        };
        assert!(rt.is_async_channel());
    }

    #[test]
    fn batch_variables_length_mismatch_is_caller_concern_not_parse_error() {
        let req = BatchRequest {
            bridge_id: "b1".into(),
            batch: vec!["a".into(), "b".into()],
            webhook: WebhookCred {
                url: "https://example.com".into(),
                headers: HashMap::new(),
            },
            batch_variables: Some(vec![HashMap::new()]),
        };
        assert_eq!(req.batch.len(), 2);
        assert_eq!(req.batch_variables.unwrap().len(), 1);
    }
}
