//! Concrete [`ResponseChannel`] for the `webhook` response format.
//! `RTLayer` push is an opaque external collaborator and is
//! left to the deployment.

use std::collections::HashMap;

use gateway_protocol::{ChatResponse, ResponseFormat};

use super::ResponseChannel;
use crate::batch::{FormattedBatchItem, WebhookSink};
use crate::error::GatewayError;

pub struct HttpResponseChannel {
    client: reqwest::Client,
}

impl HttpResponseChannel {
    pub fn new(client: reqwest::Client) -> Self {
        HttpResponseChannel { client }
    }
}

/// Delivers one reconciled batch's formatted items to its submission-time
/// webhook.
pub struct HttpWebhookSink {
    client: reqwest::Client,
}

impl HttpWebhookSink {
    pub fn new(client: reqwest::Client) -> Self {
        HttpWebhookSink { client }
    }
}

#[async_trait::async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn deliver(&self, url: &str, headers: &HashMap<String, String>, items: &[FormattedBatchItem]) -> Result<(), GatewayError> {
        let mut request = self.client.post(url).json(items);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request.send().await?.error_for_status().map_err(GatewayError::from)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResponseChannel for HttpResponseChannel {
    async fn push(&self, format: &ResponseFormat, response: &ChatResponse) -> Result<(), GatewayError> {
        match format {
            ResponseFormat::Webhook { cred } => {
                let mut request = self.client.post(&cred.url).json(response);
                for (name, value) in &cred.headers {
                    request = request.header(name, value);
                }
                request
                    .send()
                    .await
                    .map_err(|e| GatewayError::TransientInfra(format!("webhook delivery failed: {e}")))?;
                Ok(())
            }
            ResponseFormat::RtLayer { .. } => {
                Err(GatewayError::unsupported("rtlayer push", "http_response_channel"))
            }
            ResponseFormat::Default => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_protocol::{RtLayerCred, WebhookCred};
    use std::collections::HashMap;

    #[tokio::test]
    async fn default_format_is_a_no_op() {
        let channel = HttpResponseChannel::new(reqwest::Client::new());
        let response = ChatResponse::deferred_ack();
        channel.push(&ResponseFormat::Default, &response).await.unwrap();
    }

    #[tokio::test]
    async fn rtlayer_push_is_unsupported_by_this_channel() {
        let channel = HttpResponseChannel::new(reqwest::Client::new());
        let response = ChatResponse::deferred_ack();
        let format = ResponseFormat::RtLayer { cred: RtLayerCred { channel: "c".to_string(), ttl: 60, apikey: "k".to_string() } };
        let err = channel.push(&format, &response).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { .. }));
    }

    #[test]
    fn webhook_cred_carries_headers() {
        let cred = WebhookCred { url: "https://example.com/hook".to_string(), headers: HashMap::from([("X-Test".to_string(), "1".to_string())]) };
        assert_eq!(cred.headers.get("X-Test"), Some(&"1".to_string()));
    }
}
