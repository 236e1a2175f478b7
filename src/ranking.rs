use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::models::UserAggregate;
use crate::store::keys::Keys;
use crate::store::Store;

/// Cross-game ranking derived from aggregate totals.
///
/// The index is identity-keyed: the sorted-set member is the username
/// itself, so republishing a user's total replaces their previous entry
/// in place. Keying by anything that varies with the score (such as a
/// serialized snapshot) would leave a stale entry behind on every update
/// and corrupt rank lookups.
pub struct GlobalRanking {
    store: Arc<dyn Store>,
}

impl GlobalRanking {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Publish the user's current lifetime total, replacing any prior
    /// entry for that username.
    pub async fn publish(&self, aggregate: &UserAggregate) -> Result<()> {
        self.store
            .zadd(
                &Keys::global_ranking(),
                &aggregate.username,
                aggregate.total_score as f64,
            )
            .await?;
        debug!(
            "Published global ranking for {} at {}",
            aggregate.username, aggregate.total_score
        );
        Ok(())
    }

    /// Highest-ranked usernames with their totals, best first.
    pub async fn top(&self, limit: usize) -> Result<Vec<(String, i64)>> {
        let raw = self.store.ztop(&Keys::global_ranking(), limit).await?;
        Ok(raw
            .into_iter()
            .map(|(username, score)| (username, score as i64))
            .collect())
    }

    /// 1-based global rank, or None for users never published.
    pub async fn rank_of(&self, username: &str) -> Result<Option<usize>> {
        let rank = self
            .store
            .zrevrank(&Keys::global_ranking(), username)
            .await?;
        Ok(rank.map(|r| r + 1))
    }
}
