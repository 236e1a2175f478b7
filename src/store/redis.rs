use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::info;

use super::Store;

/// Redis-backed store. Sorted-set buckets map straight onto ZSETs and
/// blobs onto plain string keys; TTL expiry is native EXPIRE.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect with the standard reconnect policy: exponential backoff
    /// between retries, capped at 10 seconds.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).context("Invalid Redis URL")?;

        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(10))
            .set_response_timeout(Duration::from_secs(10))
            .set_number_of_retries(5)
            .set_exponent_base(2)
            .set_factor(500)
            .set_max_delay(10_000);

        let conn = ConnectionManager::new_with_config(client, config)
            .await
            .context("Failed to create Redis connection manager")?;

        info!("Connected to Redis store at {}", url);
        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .zadd(key, member, score)
            .await
            .with_context(|| format!("ZADD failed for {}", key))?;
        Ok(())
    }

    async fn ztop(&self, key: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let entries: Vec<(String, f64)> = conn
            .zrevrange_withscores(key, 0, limit as isize - 1)
            .await
            .with_context(|| format!("ZREVRANGE failed for {}", key))?;
        Ok(entries)
    }

    async fn zrevrank(&self, key: &str, member: &str) -> Result<Option<usize>> {
        let mut conn = self.conn.clone();
        let rank: Option<usize> = conn
            .zrevrank(key, member)
            .await
            .with_context(|| format!("ZREVRANK failed for {}", key))?;
        Ok(rank)
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>> {
        let mut conn = self.conn.clone();
        let score: Option<f64> = conn
            .zscore(key, member)
            .await
            .with_context(|| format!("ZSCORE failed for {}", key))?;
        Ok(score)
    }

    async fn zcard(&self, key: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let count: usize = conn
            .zcard(key)
            .await
            .with_context(|| format!("ZCARD failed for {}", key))?;
        Ok(count)
    }

    async fn ztrim_top(&self, key: &str, keep: usize) -> Result<usize> {
        let mut conn = self.conn.clone();
        // Members rank lowest-first in ZREMRANGEBYRANK; dropping ranks
        // 0..-(keep+1) keeps only the `keep` highest scores.
        let removed: usize = conn
            .zremrangebyrank(key, 0, -(keep as isize) - 1)
            .await
            .with_context(|| format!("ZREMRANGEBYRANK failed for {}", key))?;
        Ok(removed)
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: bool = conn
            .expire(key, seconds)
            .await
            .with_context(|| format!("EXPIRE failed for {}", key))?;
        Ok(())
    }

    async fn get_blob(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("GET failed for {}", key))?;
        Ok(value)
    }

    async fn put_blob(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(key, value)
            .await
            .with_context(|| format!("SET failed for {}", key))?;
        Ok(())
    }
}
