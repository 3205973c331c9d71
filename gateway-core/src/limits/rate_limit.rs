//! Per-bridge and per-thread request-rate backpressure: a fixed-window
//! counter against `DistributedCache`.

use std::sync::Arc;

use crate::cache::DistributedCache;
use crate::error::GatewayError;

pub const BRIDGE_WINDOW_LIMIT: u64 = 100;
pub const THREAD_WINDOW_LIMIT: u64 = 20;
const WINDOW_SECS: u64 = 60;

fn window_key(scope: &str, id: &str) -> String {
    format!("ratelimit_{scope}_{id}")
}

/// Increments the fixed 60s window counter for `scope:id` and reports
/// whether the caller is still within `limit`. The key's TTL is (re)armed to
/// the window length on first increment of each window.
async fn check_and_incr(
    cache: &Arc<dyn DistributedCache>,
    scope: &str,
    id: &str,
    limit: u64,
) -> Result<bool, GatewayError> {
    let key = window_key(scope, id);
    let count = cache.incr_by(&key, 1.0).await?;
    if count as u64 == 1 {
        cache.set(&key, "1", WINDOW_SECS).await?;
    }
    Ok((count as u64) <= limit)
}

/// `true` if `bridge_id` is within its 100/min window.
pub async fn bridge_allowed(
    cache: &Arc<dyn DistributedCache>,
    bridge_id: &str,
) -> Result<bool, GatewayError> {
    check_and_incr(cache, "bridge", bridge_id, BRIDGE_WINDOW_LIMIT).await
}

/// `true` if `thread_id` is within its 20/min window.
pub async fn thread_allowed(
    cache: &Arc<dyn DistributedCache>,
    thread_id: &str,
) -> Result<bool, GatewayError> {
    check_and_incr(cache, "thread", thread_id, THREAD_WINDOW_LIMIT).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryCache;

    #[tokio::test]
    async fn allows_requests_under_the_window_limit() {
        let cache: Arc<dyn DistributedCache> = Arc::new(InMemoryCache::default());
        for _ in 0..THREAD_WINDOW_LIMIT {
            assert!(thread_allowed(&cache, "t1").await.unwrap());
        }
        assert!(!thread_allowed(&cache, "t1").await.unwrap());
    }

    #[tokio::test]
    async fn independent_ids_have_independent_windows() {
        let cache: Arc<dyn DistributedCache> = Arc::new(InMemoryCache::default());
        for _ in 0..THREAD_WINDOW_LIMIT {
            assert!(thread_allowed(&cache, "t1").await.unwrap());
        }
        assert!(thread_allowed(&cache, "t2").await.unwrap());
    }
}
