use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// A named set of landmarks a user works through by submitting photos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDefinition {
    pub id: String,
    pub name: String,
    pub landmarks: Vec<String>,
    pub required_count: usize,
    pub bonus_points: i64,
}

/// Threshold rule an achievement is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Requirement {
    /// Lifetime total score, or best score in a named game.
    Score {
        threshold: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        game: Option<String>,
    },
    /// Total plays, or plays of a named game.
    GamesPlayed {
        threshold: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        game: Option<String>,
    },
    ChallengesCompleted { threshold: u32 },
    /// Unique landmarks recorded across all challenges.
    LandmarksVisited { threshold: u32 },
    /// A named challenge must be completed.
    Specific { challenge_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub prestige_points: i64,
    pub requirement: Requirement,
}

/// Catalog data the engine runs against: per-game score bounds, the
/// challenge list, and the achievement list. All of it is data, not code,
/// so hosts can swap catalogs without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    /// Maximum plausible score per game. Submissions above are clamped,
    /// never rejected.
    pub game_limits: HashMap<String, i64>,
    /// Bound applied to games with no configured limit.
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: i64,
    pub challenges: Vec<ChallengeDefinition>,
    pub achievements: Vec<AchievementDefinition>,
    /// Minimum length of a shared token for a detected landmark name to
    /// match a challenge landmark.
    #[serde(default = "default_min_token_len")]
    pub min_match_token_len: usize,
}

fn default_fallback_limit() -> i64 {
    10_000
}

fn default_min_token_len() -> usize {
    4
}

impl PlatformConfig {
    /// Load from the JSON file named by `WAYFARER_CONFIG`, falling back to
    /// the built-in catalog when the variable is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var("WAYFARER_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path))?;
                let config: PlatformConfig = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path))?;
                info!(
                    "Loaded platform config from {} ({} games, {} challenges, {} achievements)",
                    path,
                    config.game_limits.len(),
                    config.challenges.len(),
                    config.achievements.len()
                );
                Ok(config)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn limit_for(&self, game: &str) -> i64 {
        self.game_limits
            .get(game)
            .copied()
            .unwrap_or(self.fallback_limit)
    }

    pub fn challenge(&self, challenge_id: &str) -> Option<&ChallengeDefinition> {
        self.challenges.iter().find(|c| c.id == challenge_id)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        let game_limits = HashMap::from([
            ("trivia".to_string(), 1_000),
            ("photo-hunt".to_string(), 120),
            ("geocache".to_string(), 500),
        ]);

        let challenges = vec![
            ChallengeDefinition {
                id: "great-lakes-explorer".to_string(),
                name: "Great Lakes Explorer".to_string(),
                landmarks: vec![
                    "Lake Superior".to_string(),
                    "Lake Michigan".to_string(),
                    "Lake Huron".to_string(),
                    "Lake Erie".to_string(),
                    "Lake Ontario".to_string(),
                ],
                required_count: 5,
                bonus_points: 500,
            },
            ChallengeDefinition {
                id: "downtown-discovery".to_string(),
                name: "Downtown Discovery".to_string(),
                landmarks: vec![
                    "City Hall".to_string(),
                    "Union Station".to_string(),
                    "Riverfront Park".to_string(),
                ],
                required_count: 3,
                bonus_points: 250,
            },
        ];

        let achievements = vec![
            AchievementDefinition {
                id: "first-challenge".to_string(),
                name: "Trailblazer".to_string(),
                description: "Complete your first challenge".to_string(),
                prestige_points: 50,
                requirement: Requirement::ChallengesCompleted { threshold: 1 },
            },
            AchievementDefinition {
                id: "trivia-master".to_string(),
                name: "Trivia Master".to_string(),
                description: "Score 900 or better in a trivia round".to_string(),
                prestige_points: 100,
                requirement: Requirement::Score {
                    threshold: 900,
                    game: Some("trivia".to_string()),
                },
            },
            AchievementDefinition {
                id: "high-roller".to_string(),
                name: "High Roller".to_string(),
                description: "Reach 10,000 lifetime points".to_string(),
                prestige_points: 150,
                requirement: Requirement::Score {
                    threshold: 10_000,
                    game: None,
                },
            },
            AchievementDefinition {
                id: "regular".to_string(),
                name: "Regular".to_string(),
                description: "Play 25 rounds across any games".to_string(),
                prestige_points: 75,
                requirement: Requirement::GamesPlayed {
                    threshold: 25,
                    game: None,
                },
            },
            AchievementDefinition {
                id: "sightseer".to_string(),
                name: "Sightseer".to_string(),
                description: "Visit 10 distinct landmarks".to_string(),
                prestige_points: 100,
                requirement: Requirement::LandmarksVisited { threshold: 10 },
            },
            AchievementDefinition {
                id: "lake-legend".to_string(),
                name: "Lake Legend".to_string(),
                description: "Finish the Great Lakes Explorer challenge".to_string(),
                prestige_points: 200,
                requirement: Requirement::Specific {
                    challenge_id: "great-lakes-explorer".to_string(),
                },
            },
        ];

        Self {
            game_limits,
            fallback_limit: default_fallback_limit(),
            challenges,
            achievements,
            min_match_token_len: default_min_token_len(),
        }
    }
}
