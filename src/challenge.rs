use anyhow::Context;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ChallengeDefinition, PlatformConfig};
use crate::error::{PlatformError, Result};
use crate::locks::KeyedLocks;
use crate::models::{ChallengeProgress, LandmarkOutcome};
use crate::store::keys::Keys;
use crate::store::Store;

/// A challenge satisfied by a detected landmark name, with the canonical
/// landmark it matched.
#[derive(Debug)]
pub struct MatchedChallenge<'a> {
    pub definition: &'a ChallengeDefinition,
    pub landmark: String,
}

fn tokens(text: &str, min_len: usize) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= min_len)
        .map(str::to_string)
        .collect()
}

/// Find every challenge the detected name satisfies, picking the landmark
/// with the largest token overlap within each challenge.
///
/// Matching is token overlap rather than raw substring containment: the
/// upstream detector phrases names loosely ("the golden gate" for "Golden
/// Gate Bridge"), but short-fragment substring matches produce false
/// positives, so only tokens of at least `min_match_token_len` characters
/// count. The best overlap must also be unique within the challenge: a
/// generic token shared by several landmarks ("lake") identifies none of
/// them, so the challenge goes uncredited rather than crediting an
/// arbitrary one.
pub fn match_challenges<'a>(
    config: &'a PlatformConfig,
    detected_name: &str,
) -> Vec<MatchedChallenge<'a>> {
    let detected = tokens(detected_name, config.min_match_token_len);
    if detected.is_empty() {
        return Vec::new();
    }

    config
        .challenges
        .iter()
        .filter_map(|definition| {
            let mut best: Option<(usize, &String)> = None;
            let mut tied = false;
            for landmark in &definition.landmarks {
                let overlap = tokens(landmark, config.min_match_token_len)
                    .intersection(&detected)
                    .count();
                if overlap == 0 {
                    continue;
                }
                match best {
                    Some((top, _)) if overlap > top => {
                        best = Some((overlap, landmark));
                        tied = false;
                    }
                    Some((top, _)) if overlap == top => tied = true,
                    Some(_) => {}
                    None => best = Some((overlap, landmark)),
                }
            }
            match best {
                Some((_, landmark)) if !tied => Some(MatchedChallenge {
                    definition,
                    landmark: landmark.clone(),
                }),
                Some(_) => {
                    debug!(
                        "Detected name '{}' matches several landmarks of {} equally, not crediting",
                        detected_name, definition.id
                    );
                    None
                }
                None => None,
            }
        })
        .collect()
}

/// Idempotent per-user, per-challenge landmark completion state machine.
pub struct ChallengeTracker {
    store: Arc<dyn Store>,
    config: Arc<PlatformConfig>,
    locks: KeyedLocks,
}

impl ChallengeTracker {
    pub fn new(store: Arc<dyn Store>, config: Arc<PlatformConfig>) -> Self {
        Self {
            store,
            config,
            locks: KeyedLocks::new(),
        }
    }

    /// Record one landmark toward one challenge.
    ///
    /// Repeating a landmark is a no-op. The completion transition fires
    /// exactly once, on the call that reaches the required count: it
    /// stamps `completed_at` and awards the bonus, and can never re-fire.
    pub async fn record_landmark(
        &self,
        username: &str,
        challenge_id: &str,
        landmark: &str,
        photo_score: i64,
    ) -> Result<LandmarkOutcome> {
        if username.trim().is_empty() {
            return Err(PlatformError::Validation("username"));
        }
        let definition = self
            .config
            .challenge(challenge_id)
            .ok_or(PlatformError::Validation("challengeId"))?;

        let _guard = self.locks.acquire(username).await;

        let mut progress_map = self.load_unlocked(username).await?;
        let progress = progress_map
            .entry(challenge_id.to_string())
            .or_insert_with(|| ChallengeProgress::new(challenge_id));

        if progress
            .completed_landmarks
            .iter()
            .any(|seen| seen.eq_ignore_ascii_case(landmark))
        {
            info!(
                "{} already recorded {} for {}, ignoring",
                username, landmark, challenge_id
            );
            return Ok(LandmarkOutcome {
                challenge_id: challenge_id.to_string(),
                landmark: landmark.to_string(),
                newly_completed: false,
                challenge_completed: false,
                bonus_awarded: 0,
                challenge_total: progress.total_score,
            });
        }

        progress.completed_landmarks.push(landmark.to_string());
        progress.total_score += photo_score;

        let mut bonus = 0;
        let mut challenge_completed = false;
        if progress.completed_landmarks.len() >= definition.required_count
            && progress.completed_at.is_none()
        {
            progress.completed_at = Some(Utc::now());
            bonus = definition.bonus_points;
            progress.total_score += bonus;
            challenge_completed = true;
            info!(
                "{} completed challenge {} ({} landmarks, {} bonus)",
                username,
                challenge_id,
                progress.completed_landmarks.len(),
                bonus
            );
        } else {
            info!(
                "{} recorded {} for {} ({}/{})",
                username,
                landmark,
                challenge_id,
                progress.completed_landmarks.len(),
                definition.required_count
            );
        }
        let challenge_total = progress.total_score;

        self.save(username, &progress_map).await?;

        Ok(LandmarkOutcome {
            challenge_id: challenge_id.to_string(),
            landmark: landmark.to_string(),
            newly_completed: true,
            challenge_completed,
            bonus_awarded: bonus,
            challenge_total,
        })
    }

    /// The user's full progress map, keyed by challenge id.
    pub async fn progress(&self, username: &str) -> Result<HashMap<String, ChallengeProgress>> {
        let _guard = self.locks.acquire(username).await;
        self.load_unlocked(username).await
    }

    /// Completion bonus that has not yet reached the user's aggregate.
    ///
    /// `completed_at` is stamped by `record_landmark`, but the bonus only
    /// stops being pending once the caller transfers it and calls
    /// `mark_bonus_banked`. A transfer cut short by a store failure is
    /// therefore picked up again on the next photo for the challenge.
    pub async fn unbanked_bonus(
        &self,
        username: &str,
        challenge_id: &str,
    ) -> Result<Option<i64>> {
        let Some(definition) = self.config.challenge(challenge_id) else {
            return Ok(None);
        };
        let _guard = self.locks.acquire(username).await;
        let progress_map = self.load_unlocked(username).await?;
        Ok(progress_map
            .get(challenge_id)
            .filter(|p| p.completed_at.is_some() && !p.bonus_banked)
            .map(|_| definition.bonus_points))
    }

    /// Mark the completion bonus as transferred into the aggregate.
    pub async fn mark_bonus_banked(&self, username: &str, challenge_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(username).await;
        let mut progress_map = self.load_unlocked(username).await?;
        let changed = match progress_map.get_mut(challenge_id) {
            Some(progress) if !progress.bonus_banked => {
                progress.bonus_banked = true;
                true
            }
            _ => false,
        };
        if changed {
            self.save(username, &progress_map).await?;
        }
        Ok(())
    }

    async fn load_unlocked(
        &self,
        username: &str,
    ) -> Result<HashMap<String, ChallengeProgress>> {
        let key = Keys::challenges(username);
        match self.store.get_blob(&key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(map) => Ok(map),
                Err(e) => {
                    warn!(
                        "Corrupt challenge progress blob for {}, resetting: {}",
                        username, e
                    );
                    Ok(HashMap::new())
                }
            },
            None => Ok(HashMap::new()),
        }
    }

    async fn save(
        &self,
        username: &str,
        progress_map: &HashMap<String, ChallengeProgress>,
    ) -> Result<()> {
        let raw =
            serde_json::to_string(progress_map).context("Failed to encode challenge progress")?;
        self.store
            .put_blob(&Keys::challenges(username), &raw)
            .await?;
        Ok(())
    }
}
