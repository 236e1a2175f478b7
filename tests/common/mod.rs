use anyhow::bail;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

use wayfarer::config::PlatformConfig;
use wayfarer::models::ScoreSubmission;
use wayfarer::store::memory::MemoryStore;
use wayfarer::store::Store;
use wayfarer::Platform;

/// Platform wired over an in-memory store, with the store kept around for
/// direct inspection.
pub struct TestPlatform {
    pub platform: Platform,
    pub store: Arc<MemoryStore>,
}

impl TestPlatform {
    pub fn new() -> Self {
        Self::with_config(PlatformConfig::default())
    }

    pub fn with_config(config: PlatformConfig) -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let platform = Platform::new(store.clone(), config);
        Self { platform, store }
    }
}

/// In-memory store that can fail or hold the next blob write to a key
/// prefix, for exercising failure and interleaving paths.
#[allow(dead_code)]
pub struct FaultStore {
    inner: MemoryStore,
    fail_put: Mutex<Option<String>>,
    hold_put: Mutex<Option<String>>,
    gate: Semaphore,
}

#[allow(dead_code)]
impl FaultStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_put: Mutex::new(None),
            hold_put: Mutex::new(None),
            gate: Semaphore::new(0),
        }
    }

    /// Fail the next blob write whose key starts with `prefix`.
    pub async fn fail_next_put(&self, prefix: &str) {
        *self.fail_put.lock().await = Some(prefix.to_string());
    }

    /// Block the next blob write whose key starts with `prefix` until
    /// `release_held` is called.
    pub async fn hold_next_put(&self, prefix: &str) {
        *self.hold_put.lock().await = Some(prefix.to_string());
    }

    pub fn release_held(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl Store for FaultStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> anyhow::Result<()> {
        self.inner.zadd(key, member, score).await
    }

    async fn ztop(&self, key: &str, limit: usize) -> anyhow::Result<Vec<(String, f64)>> {
        self.inner.ztop(key, limit).await
    }

    async fn zrevrank(&self, key: &str, member: &str) -> anyhow::Result<Option<usize>> {
        self.inner.zrevrank(key, member).await
    }

    async fn zscore(&self, key: &str, member: &str) -> anyhow::Result<Option<f64>> {
        self.inner.zscore(key, member).await
    }

    async fn zcard(&self, key: &str) -> anyhow::Result<usize> {
        self.inner.zcard(key).await
    }

    async fn ztrim_top(&self, key: &str, keep: usize) -> anyhow::Result<usize> {
        self.inner.ztrim_top(key, keep).await
    }

    async fn expire(&self, key: &str, seconds: i64) -> anyhow::Result<()> {
        self.inner.expire(key, seconds).await
    }

    async fn get_blob(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get_blob(key).await
    }

    async fn put_blob(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let failing = {
            let mut armed = self.fail_put.lock().await;
            match armed.as_deref() {
                Some(prefix) if key.starts_with(prefix) => {
                    *armed = None;
                    true
                }
                _ => false,
            }
        };
        if failing {
            bail!("injected write failure for {}", key);
        }

        let held = {
            let mut armed = self.hold_put.lock().await;
            match armed.as_deref() {
                Some(prefix) if key.starts_with(prefix) => {
                    *armed = None;
                    true
                }
                _ => false,
            }
        };
        if held {
            self.gate.acquire().await.unwrap().forget();
        }

        self.inner.put_blob(key, value).await
    }
}

pub fn submission(username: &str, game: &str, raw_score: i64) -> ScoreSubmission {
    ScoreSubmission {
        username: username.to_string(),
        game: game.to_string(),
        raw_score,
        post_id: Some(format!("post-{}", username)),
        timestamp: Utc::now(),
        extra_metrics: None,
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
