use serde::{Deserialize, Serialize};

use super::de::{lenient_i64, lenient_opt_i64, lenient_opt_string, lenient_string};

/// Payload of `get_activity`: what a server is streaming right now.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Activity {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stream_count: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stream_count_transcode: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stream_count_direct_play: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub stream_count_direct_stream: i64,
    /// Kbps.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_bandwidth: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub lan_bandwidth: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub wan_bandwidth: i64,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// One playback session inside [`Activity`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Session {
    #[serde(default, deserialize_with = "lenient_string")]
    pub session_key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub friendly_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub ip_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub platform: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub player: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub product: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub full_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub grandparent_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub media_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub progress_percent: i64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub transcode_decision: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub bandwidth: i64,
    /// `lan` or `wan`.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub thumb: Option<String>,
}
