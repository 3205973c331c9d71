//! Webhook-alert dispatch: guardrail blocks, missing-variable reports, and
//! fallback-retry events are pushed to configured alert webhooks, filtered
//! by `AlertType`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    GuardrailsBlocked,
    MissingVariables,
    FallbackRetry,
    HallucinationDetected,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertEvent {
    pub alert_type: AlertType,
    pub bridge_id: String,
    pub message_id: Option<String>,
    pub detail: Value,
}

/// Alert delivery port.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, event: AlertEvent) -> Result<(), GatewayError>;
}

/// Dispatches `event` only if `subscribed` contains its `alert_type`,
/// matching the Python source's per-webhook `alertType` filter.
pub async fn dispatch_filtered(
    sink: &dyn AlertSink,
    subscribed: &[AlertType],
    event: AlertEvent,
) -> Result<(), GatewayError> {
    if !subscribed.contains(&event.alert_type) {
        return Ok(());
    }
    sink.send(event).await
}

/// Delivers alert events to a configured webhook URL. Individual delivery failures
/// are logged, not propagated — an alert is best-effort and must never fail
/// the turn that triggered it.
pub struct WebhookAlertSink {
    client: reqwest::Client,
    url: String,
    headers: std::collections::HashMap<String, String>,
}

impl WebhookAlertSink {
    pub fn new(client: reqwest::Client, url: String, headers: std::collections::HashMap<String, String>) -> Self {
        WebhookAlertSink { client, url, headers }
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn send(&self, event: AlertEvent) -> Result<(), GatewayError> {
        let mut request = self.client.post(&self.url).json(&event);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Err(e) = request.send().await {
            tracing::warn!(url = %self.url, error = %e, "alert webhook delivery failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink(Arc<AtomicUsize>);

    #[async_trait]
    impl AlertSink for CountingSink {
        async fn send(&self, _event: AlertEvent) -> Result<(), GatewayError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn unsubscribed_alert_type_is_not_delivered() {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink(count.clone());
        let event = AlertEvent {
            alert_type: AlertType::FallbackRetry,
            bridge_id: "b1".into(),
            message_id: None,
            detail: Value::Null,
        };
        dispatch_filtered(&sink, &[AlertType::GuardrailsBlocked], event).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn subscribed_alert_type_is_delivered() {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink(count.clone());
        let event = AlertEvent {
            alert_type: AlertType::GuardrailsBlocked,
            bridge_id: "b1".into(),
            message_id: None,
            detail: Value::Null,
        };
        dispatch_filtered(&sink, &[AlertType::GuardrailsBlocked], event).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
