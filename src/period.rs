use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DAY_SECONDS: i64 = 24 * 60 * 60;

/// Time window a leaderboard bucket covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    AllTime,
    Daily,
    Weekly,
    Quarterly,
}

impl Period {
    /// Every period a submission is recorded under.
    pub const ALL: [Period; 4] = [
        Period::AllTime,
        Period::Daily,
        Period::Weekly,
        Period::Quarterly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::AllTime => "alltime",
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Quarterly => "quarterly",
        }
    }

    /// Deterministic key identifying the window that contains `at`.
    ///
    /// Daily is `YYYY-MM-DD`. Weekly is `YYYY-Ww` where `w` is the week of
    /// the month with Sunday-first weeks. Quarterly is `YYYY-Qn`.
    pub fn key_for(&self, at: DateTime<Utc>) -> String {
        match self {
            Period::AllTime => "alltime".to_string(),
            Period::Daily => at.format("%Y-%m-%d").to_string(),
            Period::Weekly => {
                let day_of_month = at.day();
                let weekday = at.weekday().num_days_from_sunday();
                let week = (day_of_month + 6 - weekday).div_ceil(7);
                format!("{}-W{}", at.year(), week)
            }
            Period::Quarterly => {
                let quarter = (at.month() - 1) / 3 + 1;
                format!("{}-Q{}", at.year(), quarter)
            }
        }
    }

    /// Bucket lifetime, in seconds. The alltime bucket never expires.
    /// Expiry itself is delegated to the backing store.
    pub fn ttl_seconds(&self) -> Option<i64> {
        match self {
            Period::AllTime => None,
            Period::Daily => Some(30 * DAY_SECONDS),
            Period::Weekly => Some(90 * DAY_SECONDS),
            Period::Quarterly => Some(365 * DAY_SECONDS),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alltime" | "all-time" | "all" => Ok(Period::AllTime),
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "quarterly" => Ok(Period::Quarterly),
            _ => Err(()),
        }
    }
}
