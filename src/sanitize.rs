use tracing::warn;

use crate::config::PlatformConfig;
use crate::error::{PlatformError, Result};
use crate::models::ScoreSubmission;

/// Outcome of validating and clamping one submission.
#[derive(Debug, Clone, Copy)]
pub struct Sanitized {
    pub score: i64,
    /// True when the raw score fell outside `[0, limit]`.
    pub flagged: bool,
}

/// Validate a submission and clamp its score to the game's plausible
/// range.
///
/// Out-of-range scores are never rejected: a false-positive cheat signal
/// must not cost a legitimate player their completion record. They are
/// clamped and reported on the `anticheat` log target, which is routed
/// separately from the accepted-write path. Missing required fields are a
/// hard validation error and nothing is written.
pub fn sanitize(config: &PlatformConfig, submission: &ScoreSubmission) -> Result<Sanitized> {
    if submission.username.trim().is_empty() {
        return Err(PlatformError::Validation("username"));
    }
    if submission.game.trim().is_empty() {
        return Err(PlatformError::Validation("game"));
    }

    let limit = config.limit_for(&submission.game);
    let score = submission.raw_score.clamp(0, limit);
    let flagged = score != submission.raw_score;

    if flagged {
        warn!(
            target: "anticheat",
            "Out-of-range score from {} in {}: {} clamped to {} (limit {})",
            submission.username, submission.game, submission.raw_score, score, limit
        );
    }

    Ok(Sanitized { score, flagged })
}
