//! Typed command set understood by an upstream server.

use std::fmt;
use std::time::Duration;

/// Budget for a liveness probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_millis(1500);
/// Budget for ordinary point-in-time queries.
pub const STANDARD_TIMEOUT: Duration = Duration::from_secs(5);
/// Budget for paged history queries.
pub const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);
/// Budget for whole-window chart queries.
pub const BULK_TIMEOUT: Duration = Duration::from_secs(30);

/// Metric a statistics query is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatsType {
    #[default]
    Plays,
    Duration,
}

impl StatsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plays => "plays",
            Self::Duration => "duration",
        }
    }
}

impl fmt::Display for StatsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    GetActivity,
    GetHomeStats {
        time_range: u32,
        stats_type: StatsType,
        stats_count: u32,
    },
    GetUsers,
    GetUserWatchTimeStats {
        user_id: i64,
        query_days: Vec<u32>,
    },
    GetUserPlayerStats {
        user_id: i64,
    },
    GetHistory {
        user_id: i64,
        length: u32,
    },
    GetPlaysByDate {
        time_range: u32,
    },
}

impl Command {
    /// Wire name passed as `cmd`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::GetActivity => "get_activity",
            Self::GetHomeStats { .. } => "get_home_stats",
            Self::GetUsers => "get_users",
            Self::GetUserWatchTimeStats { .. } => "get_user_watch_time_stats",
            Self::GetUserPlayerStats { .. } => "get_user_player_stats",
            Self::GetHistory { .. } => "get_history",
            Self::GetPlaysByDate { .. } => "get_plays_by_date",
        }
    }

    /// Extra query parameters, in a stable order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Status | Self::GetActivity | Self::GetUsers => Vec::new(),
            Self::GetHomeStats {
                time_range,
                stats_type,
                stats_count,
            } => vec![
                ("time_range", time_range.to_string()),
                ("stats_type", stats_type.to_string()),
                ("stats_count", stats_count.to_string()),
            ],
            Self::GetUserWatchTimeStats {
                user_id,
                query_days,
            } => {
                let days = query_days
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                vec![("user_id", user_id.to_string()), ("query_days", days)]
            }
            Self::GetUserPlayerStats { user_id } => vec![("user_id", user_id.to_string())],
            Self::GetHistory { user_id, length } => {
                vec![("user_id", user_id.to_string()), ("length", length.to_string())]
            }
            Self::GetPlaysByDate { time_range } => vec![("time_range", time_range.to_string())],
        }
    }

    /// Default timeout class for this command.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Status => HEALTH_TIMEOUT,
            Self::GetHistory { .. } => HISTORY_TIMEOUT,
            Self::GetPlaysByDate { .. } => BULK_TIMEOUT,
            _ => STANDARD_TIMEOUT,
        }
    }
}
