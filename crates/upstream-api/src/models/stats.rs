use serde::{Deserialize, Serialize};

use super::de::{lenient_i64, lenient_opt_i64, lenient_opt_string, lenient_string};

/// One statistic block of `get_home_stats` (e.g. `top_movies`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HomeStat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub stat_id: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub stat_type: Option<String>,
    #[serde(default)]
    pub rows: Vec<HomeStatRow>,
}

/// A row of a [`HomeStat`] block.
///
/// The same shape is shared by every category; which fields are populated
/// depends on `stat_id`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HomeStatRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_plays: i64,
    /// Seconds.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_duration: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub users_watched: i64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub friendly_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub platform: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub platform_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub section_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub section_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub section_type: Option<String>,
    /// Peak value for `most_concurrent` rows.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub count: i64,
    /// Unix seconds at which a `most_concurrent` peak started.
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub started: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub thumb: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub grandparent_thumb: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub rating_key: Option<i64>,
}

/// Payload of `get_plays_by_date`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlaysByDate {
    /// ISO dates, ascending.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub series: Vec<PlaysSeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlaysSeries {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_i64_vec")]
    pub data: Vec<i64>,
}

fn lenient_i64_vec<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Cell(#[serde(deserialize_with = "lenient_i64")] i64);

    let cells = Option::<Vec<Cell>>::deserialize(deserializer)?;
    Ok(cells
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.0)
        .collect())
}
