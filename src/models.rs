use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

/// One finished minigame round, as handed to the core by a game.
/// Consumed immediately; never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub username: String,
    pub game: String,
    pub raw_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_metrics: Option<JsonValue>,
}

/// Immutable ranking-bucket entry. The `id` keeps every submission in its
/// own bucket slot, so one player can hold several of a bucket's top spots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub username: String,
    pub score: i64,
    pub game: String,
    pub timestamp: DateTime<Utc>,
}

/// Leaderboard entry with its 1-based position in the bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Per-game slice of a user's lifetime statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameBreakdown {
    pub plays: u32,
    pub total_score: i64,
    pub best_score: i64,
}

/// Lifetime statistics for one user, merged additively on each submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAggregate {
    pub username: String,
    pub total_score: i64,
    pub games_played: u32,
    #[serde(default)]
    pub game_breakdown: HashMap<String, GameBreakdown>,
    pub last_played: Option<DateTime<Utc>>,
}

impl UserAggregate {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            total_score: 0,
            games_played: 0,
            game_breakdown: HashMap::new(),
            last_played: None,
        }
    }
}

/// Snapshot row of the cross-game ranking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRankEntry {
    pub rank: usize,
    pub username: String,
    pub total_score: i64,
    pub games_played: u32,
}

/// A user's aggregate plus their current global rank.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(flatten)]
    pub aggregate: UserAggregate,
    pub global_rank: Option<usize>,
}

/// Per-user state of one challenge. `completed_at` is set exactly once,
/// the instant the required landmark count is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeProgress {
    pub challenge_id: String,
    #[serde(default)]
    pub completed_landmarks: Vec<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_score: i64,
    /// Set once the completion bonus has reached the user's aggregate.
    /// Stays false if that transfer fails, so it can be retried.
    #[serde(default)]
    pub bonus_banked: bool,
}

impl ChallengeProgress {
    pub fn new(challenge_id: &str) -> Self {
        Self {
            challenge_id: challenge_id.to_string(),
            completed_landmarks: Vec::new(),
            completed_at: None,
            total_score: 0,
            bonus_banked: false,
        }
    }
}

/// Result of recording one detected landmark against one challenge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkOutcome {
    pub challenge_id: String,
    /// Canonical landmark name from the challenge definition.
    pub landmark: String,
    /// False when the landmark was already recorded (idempotent no-op).
    pub newly_completed: bool,
    /// True only on the call that crossed the required count.
    pub challenge_completed: bool,
    pub bonus_awarded: i64,
    pub challenge_total: i64,
}

/// One unlocked achievement. At most one record per (user, achievement);
/// never revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRecord {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// What a caller gets back from a score submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReceipt {
    pub username: String,
    pub game: String,
    pub clamped_score: i64,
    /// True when the raw score fell outside the plausible range.
    pub flagged: bool,
    /// False when the bucket writes failed; the aggregate still merged.
    pub ledger_recorded: bool,
    pub aggregate: UserAggregate,
}
