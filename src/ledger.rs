use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{LeaderboardEntry, RankedEntry};
use crate::period::Period;
use crate::store::keys::Keys;
use crate::store::Store;

/// Maximum entries a period-scoped bucket keeps.
pub const BUCKET_CAPACITY: usize = 100;

/// Writes submissions into per-period ranking buckets and reads them back
/// ranked.
pub struct ScoreLedger {
    store: Arc<dyn Store>,
}

impl ScoreLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record one entry under all four periods: the permanent alltime
    /// bucket plus the daily, weekly and quarterly buckets for the current
    /// UTC wall-clock.
    ///
    /// Period-scoped buckets are trimmed to the top 100 by score and have
    /// their TTL refreshed on every write. Semantics are at-least-once: a
    /// retried call re-adds the entry, and anything beyond rank 100 is
    /// simply evicted.
    pub async fn record(&self, entry: &LeaderboardEntry) -> Result<()> {
        let member =
            serde_json::to_string(entry).context("Failed to encode leaderboard entry")?;
        let now = Utc::now();

        for period in Period::ALL {
            let key = Keys::bucket(period, &period.key_for(now), &entry.game);
            self.store.zadd(&key, &member, entry.score as f64).await?;

            if let Some(ttl) = period.ttl_seconds() {
                self.store.expire(&key, ttl).await?;
            }

            if period != Period::AllTime {
                let evicted = self.store.ztrim_top(&key, BUCKET_CAPACITY).await?;
                if evicted > 0 {
                    debug!("Evicted {} entries from {}", evicted, key);
                }
            }
        }

        debug!(
            "Recorded {} points for {} in {} across {} buckets",
            entry.score,
            entry.username,
            entry.game,
            Period::ALL.len()
        );
        Ok(())
    }

    /// Ranked entries for one game and period, best first. `period`'s key
    /// is derived from the current wall-clock, so this always reads the
    /// live window. A zero limit reads nothing.
    pub async fn top(&self, game: &str, period: Period, limit: usize) -> Result<Vec<RankedEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(BUCKET_CAPACITY);
        let key = Keys::bucket(period, &period.key_for(Utc::now()), game);
        let raw = self.store.ztop(&key, limit).await?;

        // An unparseable member means a corrupt slot, not a failed read.
        let mut entries = Vec::with_capacity(raw.len());
        for (member, _score) in raw {
            match serde_json::from_str::<LeaderboardEntry>(&member) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping corrupt entry in {}: {}", key, e),
            }
        }

        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| RankedEntry {
                rank: idx + 1,
                entry,
            })
            .collect())
    }
}
