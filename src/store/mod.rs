pub mod keys;
pub mod memory;
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;

/// The external ordered key-value / sorted-set dependency the core runs
/// against. Scored members are ordered highest-first everywhere in this
/// API. Implementations must provide per-key atomicity for each single
/// operation; cross-operation consistency is the core's job.
#[async_trait]
pub trait Store: Send + Sync {
    /// Add `member` to the sorted set at `key`, or update its score.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// Highest-scored members, best first, at most `limit`.
    async fn ztop(&self, key: &str, limit: usize) -> Result<Vec<(String, f64)>>;

    /// 0-based position of `member` when ordered highest-first.
    async fn zrevrank(&self, key: &str, member: &str) -> Result<Option<usize>>;

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>>;

    async fn zcard(&self, key: &str) -> Result<usize>;

    /// Drop everything below the top `keep` members. Returns the number
    /// of members removed.
    async fn ztrim_top(&self, key: &str, keep: usize) -> Result<usize>;

    /// Set the key's time-to-live. Expiry runs inside the store.
    async fn expire(&self, key: &str, seconds: i64) -> Result<()>;

    async fn get_blob(&self, key: &str) -> Result<Option<String>>;

    async fn put_blob(&self, key: &str, value: &str) -> Result<()>;
}
