use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::achievement::{AchievementEngine, AchievementSummary, CheckOutcome};
use crate::aggregate::AggregateStore;
use crate::challenge::{self, ChallengeTracker};
use crate::config::PlatformConfig;
use crate::error::{PlatformError, Result};
use crate::ledger::ScoreLedger;
use crate::locks::KeyedLocks;
use crate::models::{
    ChallengeProgress, GlobalRankEntry, LandmarkOutcome, LeaderboardEntry, RankedEntry,
    ScoreReceipt, ScoreSubmission, UserStats,
};
use crate::period::Period;
use crate::ranking::GlobalRanking;
use crate::sanitize;
use crate::store::Store;

/// The engine behind the minigame platform: score ingestion, ranking
/// buckets, lifetime aggregates, challenge progress and achievements,
/// wired over one shared store.
///
/// Every operation runs synchronously within the caller's request; there
/// are no background workers. The HTTP host, minigames and the photo
/// analysis service sit outside and call in.
pub struct Platform {
    config: Arc<PlatformConfig>,
    ledger: ScoreLedger,
    aggregates: Arc<AggregateStore>,
    ranking: GlobalRanking,
    challenges: Arc<ChallengeTracker>,
    achievements: AchievementEngine,
    settle_locks: KeyedLocks,
}

impl Platform {
    pub fn new(store: Arc<dyn Store>, config: PlatformConfig) -> Self {
        let config = Arc::new(config);
        let aggregates = Arc::new(AggregateStore::new(store.clone()));
        let challenges = Arc::new(ChallengeTracker::new(store.clone(), config.clone()));
        let achievements = AchievementEngine::new(
            store.clone(),
            config.clone(),
            aggregates.clone(),
            challenges.clone(),
        );
        Self {
            config,
            ledger: ScoreLedger::new(store.clone()),
            aggregates,
            ranking: GlobalRanking::new(store),
            challenges,
            achievements,
            settle_locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Ingest one finished minigame round.
    ///
    /// The score is clamped, written into the ranking buckets, merged
    /// into the user's aggregate, and the global ranking republished. The
    /// bucket writes are best-effort: a ledger failure is logged and
    /// reported in the receipt but never blocks the player's completion
    /// record, since a retried submission is safe to re-add.
    pub async fn submit_score(&self, submission: ScoreSubmission) -> Result<ScoreReceipt> {
        let sanitized = sanitize::sanitize(&self.config, &submission)?;

        let entry = LeaderboardEntry {
            id: Uuid::new_v4(),
            username: submission.username.clone(),
            score: sanitized.score,
            game: submission.game.clone(),
            timestamp: submission.timestamp,
        };

        let ledger_recorded = match self.ledger.record(&entry).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to record leaderboard entry for {} in {}: {:?}",
                    submission.username, submission.game, e
                );
                false
            }
        };

        let aggregate = self
            .aggregates
            .merge(
                &submission.username,
                &submission.game,
                sanitized.score,
                Utc::now(),
            )
            .await?;
        self.ranking.publish(&aggregate).await?;

        Ok(ScoreReceipt {
            username: submission.username,
            game: submission.game,
            clamped_score: sanitized.score,
            flagged: sanitized.flagged,
            ledger_recorded,
            aggregate,
        })
    }

    /// Ingest one analyzed photo: record the detected landmark against
    /// every challenge it satisfies, each evaluated independently.
    /// Completion bonuses flow into the aggregate and the global ranking
    /// the same way game scores do.
    pub async fn submit_photo(
        &self,
        username: &str,
        detected_name: &str,
        photo_score: i64,
    ) -> Result<Vec<LandmarkOutcome>> {
        if username.trim().is_empty() {
            return Err(PlatformError::Validation("username"));
        }
        if detected_name.trim().is_empty() {
            return Err(PlatformError::Validation("landmarkName"));
        }

        let matches = challenge::match_challenges(&self.config, detected_name);
        if matches.is_empty() {
            info!(
                "Detected landmark '{}' from {} matched no challenges",
                detected_name, username
            );
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::with_capacity(matches.len());
        for matched in matches {
            let outcome = self
                .challenges
                .record_landmark(
                    username,
                    &matched.definition.id,
                    &matched.landmark,
                    photo_score,
                )
                .await?;

            self.settle_completion_bonus(username, &outcome.challenge_id)
                .await?;

            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Move a pending completion bonus into the aggregate, then mark it
    /// banked. The tracker stamps `completed_at` before the bonus reaches
    /// the aggregate, so the bonus stays pending until the aggregate write
    /// succeeds and a failed transfer is retried on the next photo for the
    /// challenge. The per-user lock keeps concurrent photos from paying it
    /// twice.
    async fn settle_completion_bonus(&self, username: &str, challenge_id: &str) -> Result<()> {
        let _guard = self.settle_locks.acquire(username).await;
        let Some(bonus) = self
            .challenges
            .unbanked_bonus(username, challenge_id)
            .await?
        else {
            return Ok(());
        };

        let aggregate = self.aggregates.add_points(username, bonus).await?;
        self.challenges
            .mark_bonus_banked(username, challenge_id)
            .await?;
        self.ranking.publish(&aggregate).await?;
        info!(
            "Banked {} bonus points for {} from challenge {}",
            bonus, username, challenge_id
        );
        Ok(())
    }

    /// Ranked entries for one game and time window, best first.
    pub async fn leaderboard(
        &self,
        game: &str,
        period: Period,
        limit: usize,
    ) -> Result<Vec<RankedEntry>> {
        if game.trim().is_empty() {
            return Err(PlatformError::Validation("game"));
        }
        self.ledger.top(game, period, limit).await
    }

    /// Cross-game ranking, best first.
    pub async fn global_leaderboard(&self, limit: usize) -> Result<Vec<GlobalRankEntry>> {
        let top = self.ranking.top(limit).await?;
        let mut entries = Vec::with_capacity(top.len());
        for (idx, (username, total_score)) in top.into_iter().enumerate() {
            let aggregate = self.aggregates.load(&username).await?;
            entries.push(GlobalRankEntry {
                rank: idx + 1,
                username,
                total_score,
                games_played: aggregate.games_played,
            });
        }
        Ok(entries)
    }

    /// Lifetime aggregate plus current global rank.
    pub async fn user_stats(&self, username: &str) -> Result<UserStats> {
        if username.trim().is_empty() {
            return Err(PlatformError::Validation("username"));
        }
        let aggregate = self.aggregates.load(username).await?;
        let global_rank = self.ranking.rank_of(username).await?;
        Ok(UserStats {
            aggregate,
            global_rank,
        })
    }

    /// The user's progress on every challenge they have touched.
    pub async fn challenge_progress(
        &self,
        username: &str,
    ) -> Result<HashMap<String, ChallengeProgress>> {
        if username.trim().is_empty() {
            return Err(PlatformError::Validation("username"));
        }
        self.challenges.progress(username).await
    }

    /// Achievement standing and prestige total.
    pub async fn achievements(&self, username: &str) -> Result<AchievementSummary> {
        if username.trim().is_empty() {
            return Err(PlatformError::Validation("username"));
        }
        self.achievements.summary(username).await
    }

    /// Re-evaluate achievements against fresh state; returns only the
    /// newly-unlocked subset plus the full progress listing.
    pub async fn check_achievements(&self, username: &str) -> Result<CheckOutcome> {
        if username.trim().is_empty() {
            return Err(PlatformError::Validation("username"));
        }
        self.achievements.check(username).await
    }
}
