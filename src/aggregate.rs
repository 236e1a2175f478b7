use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::locks::KeyedLocks;
use crate::models::UserAggregate;
use crate::store::keys::Keys;
use crate::store::Store;

/// Per-user lifetime statistics, merged under a per-username lock.
///
/// The merge is a whole-record read-modify-write; without serialization,
/// concurrent submissions for one user silently lose updates. Every
/// mutation here acquires the user's lock first.
pub struct AggregateStore {
    store: Arc<dyn Store>,
    locks: KeyedLocks,
}

impl AggregateStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Merge one sanitized submission into the user's aggregate and
    /// return the updated record.
    pub async fn merge(
        &self,
        username: &str,
        game: &str,
        score: i64,
        played_at: DateTime<Utc>,
    ) -> Result<UserAggregate> {
        let _guard = self.locks.acquire(username).await;

        let mut aggregate = self.load_unlocked(username).await?;
        aggregate.total_score += score;
        aggregate.games_played += 1;
        aggregate.last_played = Some(played_at);

        let breakdown = aggregate.game_breakdown.entry(game.to_string()).or_default();
        breakdown.plays += 1;
        breakdown.total_score += score;
        breakdown.best_score = breakdown.best_score.max(score);

        self.save(&aggregate).await?;
        info!(
            "Merged {} points into {} for {} (lifetime total: {})",
            score, game, username, aggregate.total_score
        );
        Ok(aggregate)
    }

    /// Add points that did not come from a game round, e.g. a challenge
    /// completion bonus. Leaves play counts untouched.
    pub async fn add_points(&self, username: &str, points: i64) -> Result<UserAggregate> {
        let _guard = self.locks.acquire(username).await;

        let mut aggregate = self.load_unlocked(username).await?;
        aggregate.total_score += points;
        self.save(&aggregate).await?;
        info!(
            "Added {} bonus points for {} (lifetime total: {})",
            points, username, aggregate.total_score
        );
        Ok(aggregate)
    }

    /// Current aggregate, zero-initialized for users who never played.
    pub async fn load(&self, username: &str) -> Result<UserAggregate> {
        let _guard = self.locks.acquire(username).await;
        self.load_unlocked(username).await
    }

    async fn load_unlocked(&self, username: &str) -> Result<UserAggregate> {
        let key = Keys::aggregate(username);
        match self.store.get_blob(&key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(aggregate) => Ok(aggregate),
                // Treat a corrupt blob as a fresh start rather than
                // failing every future submission for this user.
                Err(e) => {
                    warn!("Corrupt aggregate blob for {}, resetting: {}", username, e);
                    Ok(UserAggregate::new(username))
                }
            },
            None => Ok(UserAggregate::new(username)),
        }
    }

    async fn save(&self, aggregate: &UserAggregate) -> Result<()> {
        let key = Keys::aggregate(&aggregate.username);
        let raw = serde_json::to_string(aggregate).context("Failed to encode aggregate")?;
        self.store.put_blob(&key, &raw).await?;
        Ok(())
    }
}
