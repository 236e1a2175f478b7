use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregate::AggregateStore;
use crate::challenge::ChallengeTracker;
use crate::config::{PlatformConfig, Requirement};
use crate::error::Result;
use crate::locks::KeyedLocks;
use crate::models::{AchievementRecord, GameBreakdown};
use crate::store::keys::Keys;
use crate::store::Store;

/// Everything achievement rules are evaluated against. Recomputed from
/// source on every check; never cached.
#[derive(Debug, Clone, Default)]
pub struct PlayerStats {
    pub total_score: i64,
    pub games_played: u32,
    pub challenges_completed: u32,
    /// Unique landmarks across all challenges.
    pub landmarks_visited: u32,
    pub game_stats: HashMap<String, GameBreakdown>,
    pub completed_challenge_ids: HashSet<String>,
}

/// One achievement's standing for a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    pub achievement_id: String,
    pub name: String,
    pub description: String,
    pub prestige_points: i64,
    pub unlocked_at: Option<chrono::DateTime<Utc>>,
    /// 0-100 progress toward the requirement; pinned at 100 once
    /// unlocked.
    pub progress: f64,
}

/// Result of one `check` run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub newly_unlocked: Vec<AchievementRecord>,
    pub progress: Vec<AchievementStatus>,
}

/// Unlocked list plus prestige total, the read surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementSummary {
    pub achievements: Vec<AchievementStatus>,
    pub prestige_points: i64,
}

/// Is the requirement met by these stats? Pure rule evaluation, no state.
pub fn is_unlocked(requirement: &Requirement, stats: &PlayerStats) -> bool {
    match requirement {
        Requirement::Score { threshold, game: None } => stats.total_score >= *threshold,
        Requirement::Score {
            threshold,
            game: Some(game),
        } => stats
            .game_stats
            .get(game)
            .is_some_and(|g| g.best_score >= *threshold),
        Requirement::GamesPlayed { threshold, game: None } => stats.games_played >= *threshold,
        Requirement::GamesPlayed {
            threshold,
            game: Some(game),
        } => stats.game_stats.get(game).is_some_and(|g| g.plays >= *threshold),
        Requirement::ChallengesCompleted { threshold } => {
            stats.challenges_completed >= *threshold
        }
        Requirement::LandmarksVisited { threshold } => stats.landmarks_visited >= *threshold,
        Requirement::Specific { challenge_id } => {
            stats.completed_challenge_ids.contains(challenge_id)
        }
    }
}

fn ratio(current: i64, threshold: i64) -> f64 {
    if threshold <= 0 || current >= threshold {
        return 100.0;
    }
    (current.max(0) as f64 * 100.0) / threshold as f64
}

/// Progress toward the requirement as a 0-100 ratio. `specific` rules are
/// binary.
pub fn progress(requirement: &Requirement, stats: &PlayerStats) -> f64 {
    match requirement {
        Requirement::Score { threshold, game: None } => ratio(stats.total_score, *threshold),
        Requirement::Score {
            threshold,
            game: Some(game),
        } => ratio(
            stats.game_stats.get(game).map(|g| g.best_score).unwrap_or(0),
            *threshold,
        ),
        Requirement::GamesPlayed { threshold, game: None } => {
            ratio(stats.games_played as i64, *threshold as i64)
        }
        Requirement::GamesPlayed {
            threshold,
            game: Some(game),
        } => ratio(
            stats.game_stats.get(game).map(|g| g.plays as i64).unwrap_or(0),
            *threshold as i64,
        ),
        Requirement::ChallengesCompleted { threshold } => {
            ratio(stats.challenges_completed as i64, *threshold as i64)
        }
        Requirement::LandmarksVisited { threshold } => {
            ratio(stats.landmarks_visited as i64, *threshold as i64)
        }
        Requirement::Specific { challenge_id } => {
            if stats.completed_challenge_ids.contains(challenge_id) {
                100.0
            } else {
                0.0
            }
        }
    }
}

/// Evaluates the achievement catalog against fresh player state and
/// persists unlocks. Unlocking is monotonic: once recorded, an
/// achievement stays unlocked even if the stats later regress.
pub struct AchievementEngine {
    store: Arc<dyn Store>,
    config: Arc<PlatformConfig>,
    aggregates: Arc<AggregateStore>,
    challenges: Arc<ChallengeTracker>,
    locks: KeyedLocks,
}

impl AchievementEngine {
    pub fn new(
        store: Arc<dyn Store>,
        config: Arc<PlatformConfig>,
        aggregates: Arc<AggregateStore>,
        challenges: Arc<ChallengeTracker>,
    ) -> Self {
        Self {
            store,
            config,
            aggregates,
            challenges,
            locks: KeyedLocks::new(),
        }
    }

    /// Rebuild stats from the aggregate and challenge state as they are
    /// right now, so a completion recorded moments ago is visible.
    pub async fn compute_stats(&self, username: &str) -> Result<PlayerStats> {
        let aggregate = self.aggregates.load(username).await?;
        let challenge_progress = self.challenges.progress(username).await?;

        let completed_challenge_ids: HashSet<String> = challenge_progress
            .values()
            .filter(|p| p.completed_at.is_some())
            .map(|p| p.challenge_id.clone())
            .collect();

        let landmarks: HashSet<String> = challenge_progress
            .values()
            .flat_map(|p| p.completed_landmarks.iter())
            .map(|l| l.to_lowercase())
            .collect();

        Ok(PlayerStats {
            total_score: aggregate.total_score,
            games_played: aggregate.games_played,
            challenges_completed: completed_challenge_ids.len() as u32,
            landmarks_visited: landmarks.len() as u32,
            game_stats: aggregate.game_breakdown,
            completed_challenge_ids,
        })
    }

    /// Evaluate every achievement, persist the newly-qualifying unlocks,
    /// and return only those plus the full progress listing.
    ///
    /// Idempotent: a second run with unchanged stats unlocks nothing.
    pub async fn check(&self, username: &str) -> Result<CheckOutcome> {
        let stats = self.compute_stats(username).await?;

        // The unlock map is a whole-blob read-modify-write; overlapping
        // checks for one user must not overwrite each other's unlocks,
        // so the load and save happen under the user's lock.
        let _guard = self.locks.acquire(username).await;
        let mut unlocked = self.load_unlocked(username).await?;

        let now = Utc::now();
        let mut newly_unlocked = Vec::new();
        for definition in &self.config.achievements {
            if unlocked.contains_key(&definition.id) {
                continue;
            }
            if is_unlocked(&definition.requirement, &stats) {
                let record = AchievementRecord {
                    achievement_id: definition.id.clone(),
                    unlocked_at: now,
                };
                unlocked.insert(definition.id.clone(), record.clone());
                newly_unlocked.push(record);
                info!("{} unlocked achievement {}", username, definition.id);
            }
        }

        if !newly_unlocked.is_empty() {
            self.save_unlocked(username, &unlocked).await?;
        }

        Ok(CheckOutcome {
            newly_unlocked,
            progress: self.listing(&stats, &unlocked),
        })
    }

    /// Current standing of every achievement plus the prestige total.
    pub async fn summary(&self, username: &str) -> Result<AchievementSummary> {
        let stats = self.compute_stats(username).await?;
        let unlocked = self.load_unlocked(username).await?;

        let prestige_points = self
            .config
            .achievements
            .iter()
            .filter(|d| unlocked.contains_key(&d.id))
            .map(|d| d.prestige_points)
            .sum();

        Ok(AchievementSummary {
            achievements: self.listing(&stats, &unlocked),
            prestige_points,
        })
    }

    fn listing(
        &self,
        stats: &PlayerStats,
        unlocked: &HashMap<String, AchievementRecord>,
    ) -> Vec<AchievementStatus> {
        self.config
            .achievements
            .iter()
            .map(|definition| {
                let unlocked_at = unlocked.get(&definition.id).map(|r| r.unlocked_at);
                AchievementStatus {
                    achievement_id: definition.id.clone(),
                    name: definition.name.clone(),
                    description: definition.description.clone(),
                    prestige_points: definition.prestige_points,
                    unlocked_at,
                    progress: if unlocked_at.is_some() {
                        100.0
                    } else {
                        progress(&definition.requirement, stats)
                    },
                }
            })
            .collect()
    }

    async fn load_unlocked(
        &self,
        username: &str,
    ) -> Result<HashMap<String, AchievementRecord>> {
        let key = Keys::achievements(username);
        match self.store.get_blob(&key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(map) => Ok(map),
                Err(e) => {
                    warn!(
                        "Corrupt achievement blob for {}, treating as empty: {}",
                        username, e
                    );
                    Ok(HashMap::new())
                }
            },
            None => Ok(HashMap::new()),
        }
    }

    async fn save_unlocked(
        &self,
        username: &str,
        unlocked: &HashMap<String, AchievementRecord>,
    ) -> Result<()> {
        let raw =
            serde_json::to_string(unlocked).context("Failed to encode achievement records")?;
        self.store
            .put_blob(&Keys::achievements(username), &raw)
            .await?;
        Ok(())
    }
}
