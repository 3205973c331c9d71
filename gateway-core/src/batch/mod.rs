//! Batch Reconciler: every 15 minutes, scan Redis prefix
//! `batch_*`; for each descriptor, take a lock, poll the provider, and on a
//! terminal state format + deliver a webhook payload.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{DistributedCache, BATCH_LOCK_TTL_SECS};
use crate::config::document_store::DocumentStore;
use crate::error::GatewayError;
use crate::provider::{BatchHandle, BatchResultItem, ProviderRegistry};
use gateway_protocol::BatchAckResponse;

/// A pending batch job persisted under `batch_<batch_id>`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchDescriptor {
    pub batch_id: String,
    pub bridge_id: String,
    pub service: String,
    pub provider_batch_id: String,
    pub webhook_url: String,
    #[serde(default)]
    pub webhook_headers: HashMap<String, String>,
    /// Per-item variables keyed by `custom_id`, not submission position —
    /// poll results aren't guaranteed to preserve submission order.
    #[serde(default)]
    pub custom_id_variables: HashMap<String, HashMap<String, serde_json::Value>>,
}

/// One formatted webhook item, successful or errored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormattedBatchItem {
    pub batch_id: String,
    pub custom_id: String,
    pub success: bool,
    pub body: serde_json::Value,
    #[serde(default)]
    pub variables: Option<HashMap<String, serde_json::Value>>,
}

/// Delivers a formatted batch payload to an external webhook.
#[async_trait::async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, url: &str, headers: &HashMap<String, String>, items: &[FormattedBatchItem]) -> Result<(), GatewayError>;
}

pub struct BatchReconciler {
    cache: Arc<dyn DistributedCache>,
    store: Arc<dyn DocumentStore>,
    providers: Arc<ProviderRegistry>,
    webhook: Arc<dyn WebhookSink>,
}

impl BatchReconciler {
    pub fn new(
        cache: Arc<dyn DistributedCache>,
        store: Arc<dyn DocumentStore>,
        providers: Arc<ProviderRegistry>,
        webhook: Arc<dyn WebhookSink>,
    ) -> Self {
        BatchReconciler { cache, store, providers, webhook }
    }

    /// Runs one reconciliation pass over the given descriptor ids (the
    /// caller is responsible for the Redis `batch_*` key scan — that
    /// operation lives on the concrete `RedisCache` implementation, not this
    /// provider-agnostic module).
    pub async fn reconcile_one(&self, descriptor: &BatchDescriptor) -> Result<bool, GatewayError> {
        let lock_key = format!("lock_{}", descriptor.batch_id);
        let acquired = self.cache.set_nx(&lock_key, "1", BATCH_LOCK_TTL_SECS).await?;
        if !acquired {
            return Ok(false);
        }

        let result = self.poll_and_deliver(descriptor).await;

        self.cache.delete(&lock_key).await?;
        result
    }

    async fn poll_and_deliver(&self, descriptor: &BatchDescriptor) -> Result<bool, GatewayError> {
        let adapter = self.providers.get(&descriptor.service)?;
        let handle = BatchHandle { provider_batch_id: descriptor.provider_batch_id.clone() };
        let outcome = adapter.batch_poll(&handle).await?;

        if !outcome.done {
            return Ok(false);
        }

        let items = format_items(descriptor, &outcome.results);
        self.webhook.deliver(&descriptor.webhook_url, &descriptor.webhook_headers, &items).await?;

        let descriptor_key = format!("batch_{}", descriptor.batch_id);
        self.cache.delete(&descriptor_key).await?;
        Ok(true)
    }

    /// Builds the ack returned synchronously to `/v2/batch` at submission
    /// time.
    pub async fn submit(
        &self,
        bridge_id: &str,
        service: &str,
        requests: Vec<serde_json::Value>,
        custom_ids: Vec<String>,
        webhook_url: String,
        webhook_headers: HashMap<String, String>,
        batch_variables: Option<Vec<HashMap<String, serde_json::Value>>>,
        api_key: String,
    ) -> Result<BatchAckResponse, GatewayError> {
        let adapter = self.providers.get(service)?;
        let cfg = self.store.get_bridge(bridge_id, None).await?;

        let handle = adapter
            .batch_submit(crate::provider::BatchSubmitRequest {
                model: cfg.model.clone(),
                requests,
                api_key,
                base_url: None,
            })
            .await?;

        let custom_id_variables: HashMap<String, HashMap<String, serde_json::Value>> = match &batch_variables {
            Some(vars) => custom_ids.iter().cloned().zip(vars.iter().cloned()).collect(),
            None => HashMap::new(),
        };

        let batch_id = handle.provider_batch_id.clone();
        let descriptor = BatchDescriptor {
            batch_id: batch_id.clone(),
            bridge_id: bridge_id.to_string(),
            service: service.to_string(),
            provider_batch_id: handle.provider_batch_id,
            webhook_url,
            webhook_headers,
            custom_id_variables: custom_id_variables.clone(),
        };
        self.cache
            .set(&format!("batch_{batch_id}"), &serde_json::to_string(&descriptor)?, 7 * 24 * 60 * 60)
            .await?;

        let messages = custom_ids
            .into_iter()
            .map(|custom_id| {
                let variables = custom_id_variables.get(&custom_id).cloned();
                gateway_protocol::BatchItem { message: "queued".to_string(), custom_id, variables }
            })
            .collect();

        Ok(BatchAckResponse { batch_id, messages })
    }
}

/// Attaches `batch_id`/`custom_id` and, if variables were submitted, the
/// matching per-item variables looked up by `custom_id` — poll results are
/// not guaranteed to preserve submission order.
fn format_items(descriptor: &BatchDescriptor, results: &[BatchResultItem]) -> Vec<FormattedBatchItem> {
    results
        .iter()
        .map(|item| FormattedBatchItem {
            batch_id: descriptor.batch_id.clone(),
            custom_id: item.custom_id.clone(),
            success: item.success,
            body: item.body.clone(),
            variables: descriptor.custom_id_variables.get(&item.custom_id).cloned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_items_pairs_variables_by_custom_id() {
        let descriptor = BatchDescriptor {
            batch_id: "batch1".into(),
            bridge_id: "b1".into(),
            service: "openai_completion".into(),
            provider_batch_id: "pb1".into(),
            webhook_url: "https://example.com".into(),
            webhook_headers: HashMap::new(),
            custom_id_variables: HashMap::from([
                ("c1".to_string(), HashMap::from([("a".to_string(), serde_json::json!(1))])),
                ("c2".to_string(), HashMap::from([("a".to_string(), serde_json::json!(2))])),
            ]),
        };
        // Results come back in reverse of submission order — pairing must
        // still land on the right item.
        let results = vec![
            BatchResultItem { custom_id: "c2".into(), success: false, body: serde_json::json!({"error": "failed"}) },
            BatchResultItem { custom_id: "c1".into(), success: true, body: serde_json::json!({"ok": true}) },
        ];
        let items = format_items(&descriptor, &results);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].custom_id, "c2");
        assert_eq!(items[0].variables.as_ref().unwrap()["a"], serde_json::json!(2));
        assert!(!items[0].success);
        assert_eq!(items[1].custom_id, "c1");
        assert_eq!(items[1].variables.as_ref().unwrap()["a"], serde_json::json!(1));
    }
}
