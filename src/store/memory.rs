use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::Store;

/// In-process store backend. Used by the test suite and by embedded
/// single-node deployments; behavior mirrors the Redis backend except
/// that TTLs are recorded but never enforced.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    zsets: HashMap<String, HashMap<String, f64>>,
    blobs: HashMap<String, String>,
    ttls: HashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last TTL applied to `key`, if any. Test hook.
    pub async fn ttl_of(&self, key: &str) -> Option<i64> {
        self.inner.lock().await.ttls.get(key).copied()
    }
}

/// Members ordered score-descending, ties broken by member for
/// determinism.
fn ranked(set: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = set.iter().map(|(m, s)| (m.clone(), *s)).collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    entries
}

#[async_trait]
impl Store for MemoryStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn ztop(&self, key: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .zsets
            .get(key)
            .map(|set| ranked(set).into_iter().take(limit).collect())
            .unwrap_or_default())
    }

    async fn zrevrank(&self, key: &str, member: &str) -> Result<Option<usize>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .zsets
            .get(key)
            .and_then(|set| ranked(set).iter().position(|(m, _)| m == member)))
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>> {
        let inner = self.inner.lock().await;
        Ok(inner.zsets.get(key).and_then(|set| set.get(member).copied()))
    }

    async fn zcard(&self, key: &str) -> Result<usize> {
        let inner = self.inner.lock().await;
        Ok(inner.zsets.get(key).map(|set| set.len()).unwrap_or(0))
    }

    async fn ztrim_top(&self, key: &str, keep: usize) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let Some(set) = inner.zsets.get_mut(key) else {
            return Ok(0);
        };
        let evicted: Vec<String> = ranked(set)
            .into_iter()
            .skip(keep)
            .map(|(member, _)| member)
            .collect();
        for member in &evicted {
            set.remove(member);
        }
        Ok(evicted.len())
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ttls.insert(key.to_string(), seconds);
        Ok(())
    }

    async fn get_blob(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.blobs.get(key).cloned())
    }

    async fn put_blob(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
