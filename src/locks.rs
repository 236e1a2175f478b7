use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async mutex registry.
///
/// Read-modify-write updates to a user's aggregate or challenge blob must
/// be serialized per username, or concurrent submissions lose updates.
/// The registry grows with distinct keys and is never pruned; keys are
/// usernames, so the footprint stays small.
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, creating it on first use. The returned
    /// guard holds the lock until dropped.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
