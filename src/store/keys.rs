use crate::period::Period;

/// Key layout for everything the core persists.
pub struct Keys;

impl Keys {
    /// Ranking bucket for one game and one time window.
    pub fn bucket(period: Period, period_key: &str, game: &str) -> String {
        match period {
            Period::AllTime => format!("leaderboard:alltime:{}", game),
            _ => format!("leaderboard:{}:{}:{}", period.as_str(), period_key, game),
        }
    }

    /// Cross-game ranking index, one member per username.
    pub fn global_ranking() -> String {
        "leaderboard:global".to_string()
    }

    /// A user's lifetime aggregate blob.
    pub fn aggregate(username: &str) -> String {
        format!("stats:{}", username)
    }

    /// A user's challenge progress map blob.
    pub fn challenges(username: &str) -> String {
        format!("challenges:{}", username)
    }

    /// A user's unlocked achievement records blob.
    pub fn achievements(username: &str) -> String {
        format!("achievements:{}", username)
    }
}
