//! Pre-flight quota checks and post-flight cost accounting.

pub mod rate_limit;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{usage_cache_key, DistributedCache};
use crate::config::document_store::DocumentStore;
use crate::config::types::{BridgeConfig, ModelConfig};
use crate::error::{GatewayError, LimitExceeded};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitKind {
    Folder,
    Bridge,
    ApiKey,
}

impl LimitKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            LimitKind::Folder => "folder",
            LimitKind::Bridge => "bridge",
            LimitKind::ApiKey => "apikey",
        }
    }
}

/// Per-(bridge|folder|apikey) Redis record.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UsageLedger {
    pub usage_value: f64,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub bridges: Vec<String>,
}

async fn load_usage(
    cache: &Arc<dyn DistributedCache>,
    store: &Arc<dyn DocumentStore>,
    kind: LimitKind,
    id: &str,
) -> Result<UsageLedger, GatewayError> {
    let key = usage_cache_key(kind.prefix(), id);
    if let Some(raw) = cache.get(&key).await? {
        if let Ok(ledger) = serde_json::from_str::<UsageLedger>(&raw) {
            return Ok(ledger);
        }
    }
    let seeded = store.seed_usage(kind, id).await?;
    cache
        .set(&key, &serde_json::to_string(&seeded)?, 24 * 60 * 60)
        .await?;
    Ok(seeded)
}

/// Runs the three pre-flight checks in order: folder, bridge, apikey
///. Returns the first violated limit as a typed error.
pub async fn check_bridge_api_folder_limits(
    cfg: &BridgeConfig,
    cache: &Arc<dyn DistributedCache>,
    store: &Arc<dyn DocumentStore>,
) -> Result<(), GatewayError> {
    let checks: [(LimitKind, &str, Option<f64>); 3] = [
        (
            LimitKind::Folder,
            cfg.folder_id.as_deref().unwrap_or(&cfg.bridge_id),
            cfg.limits.folder_limit,
        ),
        (LimitKind::Bridge, &cfg.bridge_id, cfg.limits.bridge_limit),
        (
            LimitKind::ApiKey,
            cfg.apikey_object_id
                .get(cfg.service.as_str())
                .map(String::as_str)
                .unwrap_or(&cfg.bridge_id),
            cfg.limits.apikey_limit,
        ),
    ];

    for (kind, id, limit) in checks {
        let Some(limit_value) = limit else { continue };
        let ledger = load_usage(cache, store, kind, id).await?;
        if ledger.usage_value >= limit_value {
            return Err(GatewayError::Limit(LimitExceeded {
                limit_type: format!("{:?}", kind).to_lowercase(),
                current_usage: ledger.usage_value,
                limit_value,
            }));
        }
    }
    Ok(())
}

/// `total_cost` formula, computed from raw token counts and
/// the model's per-million-token rates.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TokenCounts {
    pub input: u64,
    pub output: u64,
    pub cached: u64,
    pub reasoning: u64,
    pub cache_read: u64,
    pub cache_creation: u64,
}

pub fn compute_total_cost(tokens: TokenCounts, model: &ModelConfig) -> f64 {
    let p = &model.pricing;
    tokens.input as f64 * p.input_cost / 1e6
        + tokens.output as f64 * p.output_cost / 1e6
        + tokens.cached as f64 * p.cached_cost / 1e6
        + tokens.reasoning as f64 * p.output_cost / 1e6
        + tokens.cache_read as f64 * p.caching_read_cost / 1e6
        + tokens.cache_creation as f64 * p.caching_write_cost / 1e6
}

/// Post-flight: increments the three usage ledgers by `total_cost`
///. Read-modify-write; races over-charge, never
/// under-charge.
pub async fn update_cost(
    cfg: &BridgeConfig,
    total_cost: f64,
    cache: &Arc<dyn DistributedCache>,
) -> Result<(), GatewayError> {
    let folder_id = cfg.folder_id.as_deref().unwrap_or(&cfg.bridge_id);
    let apikey_id = cfg
        .apikey_object_id
        .get(cfg.service.as_str())
        .map(String::as_str)
        .unwrap_or(&cfg.bridge_id);

    for (kind, id) in [
        (LimitKind::Folder, folder_id),
        (LimitKind::Bridge, cfg.bridge_id.as_str()),
        (LimitKind::ApiKey, apikey_id),
    ] {
        let key = usage_cache_key(kind.prefix(), id);
        cache.incr_by(&key, total_cost).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ModelPricing};

    #[test]
    fn total_cost_matches_formula_within_epsilon() {
        let model = ModelConfig {
            pricing: ModelPricing {
                input_cost: 3.0,
                output_cost: 15.0,
                cached_cost: 1.5,
                caching_read_cost: 0.3,
                caching_write_cost: 3.75,
            },
            ..Default::default()
        };
        let tokens = TokenCounts {
            input: 1_000_000,
            output: 500_000,
            cached: 200_000,
            reasoning: 100_000,
            cache_read: 400_000,
            cache_creation: 100_000,
        };
        let cost = compute_total_cost(tokens, &model);
        let expected = 3.0 + 7.5 + 0.3 + 1.5 + 0.12 + 0.375;
        assert!((cost - expected).abs() < 1e-9, "cost={cost} expected={expected}");
    }
}
