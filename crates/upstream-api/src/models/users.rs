use serde::{Deserialize, Serialize};

use super::de::{lenient_bool, lenient_i64, lenient_opt_string, lenient_string};

/// Entry of `get_users`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct User {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub friendly_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub thumb: Option<String>,
}

/// Entry of `get_user_watch_time_stats`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WatchTimeStat {
    /// Window length in days; `0` means all time.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub query_days: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_plays: i64,
    /// Seconds.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_time: i64,
}

/// Entry of `get_user_player_stats`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlayerStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub platform: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub player_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_plays: i64,
}

/// Payload of `get_history`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryPage {
    #[serde(default, rename = "recordsFiltered", deserialize_with = "lenient_i64")]
    pub records_filtered: i64,
    #[serde(default)]
    pub data: Vec<HistoryRow>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryRow {
    /// Unix seconds the play started.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub date: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub full_title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub media_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub platform: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub player: Option<String>,
    /// Seconds actually played.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub play_duration: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub percent_complete: i64,
}
