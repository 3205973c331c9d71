//! Redis-backed caches, ledgers, and distributed locks: bridge configs, templates, conversations, rate counters, cost
//! usage, last-used timestamps, locks, transfer/agent stickiness, pending
//! file caches — all expressed against one small trait so the engine's own
//! tests run against an in-memory double (`gateway_core::testing`).

pub mod redis_store;

use async_trait::async_trait;

use crate::error::GatewayError;

pub use redis_store::RedisCache;

/// Minimal key-value + counter + lock surface every cache-backed module
/// needs. Real deployments wire `RedisCache`; tests wire the in-memory
/// double in `testing`.
#[async_trait]
pub trait DistributedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), GatewayError>;
    async fn delete(&self, key: &str) -> Result<(), GatewayError>;

    /// `SET key value NX EX ttl_secs` — returns `true` if this call acquired
    /// the key.
    async fn set_nx(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, GatewayError>;

    /// Read-modify-write increment; races may over-count, never under-count.
    async fn incr_by(&self, key: &str, amount: f64) -> Result<f64, GatewayError>;
}

/// Builds the conversation cache key.
pub fn conversation_cache_key(version_id: &str, thread_id: &str, sub_thread_id: &str) -> String {
    format!("conversation_{version_id}_{thread_id}_{sub_thread_id}")
}

/// Builds the per-{bridge,folder,apikey} usage ledger key.
pub fn usage_cache_key(limit_type: &str, id: &str) -> String {
    format!("{limit_type}usedcost_{id}")
}

/// Sticky "last transferred agent" key, 3-day TTL.
pub fn last_transferred_agent_key(primary_bridge_id: &str, thread_id: &str, sub_thread_id: &str) -> String {
    format!("last_transffered_agent_{primary_bridge_id}_{thread_id}_{sub_thread_id}")
}

pub const LAST_TRANSFERRED_AGENT_TTL_SECS: u64 = 3 * 24 * 60 * 60;
pub const BATCH_LOCK_TTL_SECS: u64 = 600;
pub const LOCK_DEFAULT_TTL_SECS: u64 = 10 * 60;
