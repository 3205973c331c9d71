//! `DistributedCache` backed by real Redis, via `redis`'s async
//! `ConnectionManager` (auto-reconnecting, safe to clone and share).

use async_trait::async_trait;
use redis::AsyncCommands;

use super::DistributedCache;
use crate::error::GatewayError;

#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, GatewayError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| GatewayError::TransientInfra(format!("redis url: {e}")))?;
        let conn = client.get_connection_manager().await?;
        Ok(RedisCache { conn })
    }
}

#[async_trait]
impl DistributedCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, GatewayError> {
        let mut conn = self.conn.clone();
        let acquired: bool = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, Option<String>>(&mut conn)
            .await?
            .is_some();
        Ok(acquired)
    }

    async fn incr_by(&self, key: &str, amount: f64) -> Result<f64, GatewayError> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, amount).await?)
    }
}
