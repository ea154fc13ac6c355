//! Statistic categories and their grouping policies.

use serde::{Deserialize, Serialize};
use upstream_api::{HomeStatRow, StatsType};

/// A statistic block returned by `get_home_stats`, by its `stat_id`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatCategory {
    TopMovies,
    PopularMovies,
    TopTv,
    PopularTv,
    TopMusic,
    PopularMusic,
    TopUsers,
    TopPlatforms,
    TopLibraries,
    MostConcurrent,
}

impl StatCategory {
    pub const ALL: [StatCategory; 10] = [
        Self::TopMovies,
        Self::PopularMovies,
        Self::TopTv,
        Self::PopularTv,
        Self::TopMusic,
        Self::PopularMusic,
        Self::TopUsers,
        Self::TopPlatforms,
        Self::TopLibraries,
        Self::MostConcurrent,
    ];

    /// Categories ranked by distinct viewer count rather than the query metric.
    pub fn is_popularity(&self) -> bool {
        matches!(self, Self::PopularMovies | Self::PopularTv | Self::PopularMusic)
    }

    /// Ranked value contributed by one row.
    pub fn value(&self, mode: StatsType, row: &HomeStatRow) -> i64 {
        if self.is_popularity() {
            return row.users_watched;
        }
        match mode {
            StatsType::Plays => row.total_plays,
            StatsType::Duration => row.total_duration,
        }
    }

    /// Whether values of this category are durations in seconds.
    pub fn is_duration(&self, mode: StatsType) -> bool {
        !self.is_popularity() && !matches!(self, Self::MostConcurrent) && mode == StatsType::Duration
    }

    /// Identity under which rows from different servers are merged.
    ///
    /// `None` for `MostConcurrent`, whose rows are never merged across servers.
    pub fn dedup_key(&self, server_id: i64, row: &HomeStatRow) -> Option<DedupKey> {
        let key = match self {
            Self::TopMovies | Self::PopularMovies => DedupKey::TitleYear {
                title: row.title.clone(),
                year: row.year,
            },
            // Year is ignored so every season-year variant of a show collapses.
            Self::TopTv | Self::PopularTv | Self::TopMusic | Self::PopularMusic => {
                DedupKey::Title(row.title.clone())
            }
            Self::TopUsers => DedupKey::User {
                user: row.user.clone().unwrap_or_default(),
                server_id,
            },
            Self::TopPlatforms => DedupKey::Platform(platform_name(row).to_string()),
            Self::TopLibraries => DedupKey::Library {
                name: row.section_name.clone().unwrap_or_default(),
                server_id,
            },
            Self::MostConcurrent => return None,
        };
        Some(key)
    }
}

/// Grouping key for merging rows across servers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    TitleYear { title: String, year: Option<i64> },
    Title(String),
    User { user: String, server_id: i64 },
    Platform(String),
    Library { name: String, server_id: i64 },
}

/// Display name of a platform row.
pub(crate) fn platform_name(row: &HomeStatRow) -> &str {
    row.platform
        .as_deref()
        .or(row.platform_name.as_deref())
        .unwrap_or_default()
}
