//! The bridge/model-config document store port.

use async_trait::async_trait;

use super::types::{BridgeConfig, ModelConfig};
use crate::error::GatewayError;
use crate::limits::{LimitKind, UsageLedger};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a bridge document by `version_id` if given, else by
    /// `bridge_id`.
    async fn get_bridge(
        &self,
        bridge_id: &str,
        version_id: Option<&str>,
    ) -> Result<BridgeConfig, GatewayError>;

    /// Fetches the (service, model) catalog entry used for sentinel
    /// resolution and pricing.
    async fn get_model_config(&self, service: &str, model: &str) -> Result<ModelConfig, GatewayError>;

    /// Seeds a usage ledger on cache miss.
    async fn seed_usage(&self, kind: LimitKind, id: &str) -> Result<UsageLedger, GatewayError>;

    /// Persists an incremental usage bump directly to the document (used by
    /// the secondary queue's total-token roll-up).
    async fn roll_up_usage(&self, bridge_id: &str, total_cost: f64) -> Result<(), GatewayError>;

    /// Fetches a prompt-wrapping template by `wrapper_id` (`BridgeConfig::wrapper_id`).
    async fn get_wrapper_template(&self, wrapper_id: &str) -> Result<String, GatewayError>;
}
