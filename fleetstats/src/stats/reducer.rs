//! Cross-server merge and ranking of statistic rows.

use std::collections::HashMap;

use serde::Serialize;
use upstream_api::{HomeStat, HomeStatRow, StatsType};

use super::category::{DedupKey, StatCategory, platform_name};
use super::format::{format_count, format_duration};

/// Default ranked list length.
pub const TOP_N: usize = 10;
/// Radar-style charts.
pub const RADAR_N: usize = 8;

/// One server's home statistics, as input to a merge.
#[derive(Debug, Clone, Copy)]
pub struct ServerStats<'a> {
    pub server_id: i64,
    pub server_name: &'a str,
    pub home_stats: &'a [HomeStat],
}

impl<'a> ServerStats<'a> {
    pub fn new(server_id: i64, server_name: &'a str, home_stats: &'a [HomeStat]) -> Self {
        Self {
            server_id,
            server_name,
            home_stats,
        }
    }

    /// Rows of one category; empty when the server did not report it.
    pub fn rows(&self, category: StatCategory) -> &'a [HomeStatRow] {
        let id = category.to_string();
        self.home_stats
            .iter()
            .find(|stat| stat.stat_id == id)
            .map(|stat| stat.rows.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedStatItem {
    pub rank: usize,
    /// Display identity: title, user, platform or library name.
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    pub value: i64,
    pub formatted_value: String,
    /// Server whose row was seen first for this identity.
    pub source_server: String,
    pub server_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
}

struct Group {
    label: String,
    year: Option<i64>,
    value: i64,
    source_server: String,
    server_id: i64,
    thumb: Option<String>,
}

/// Merges per-server rows into global rankings.
#[derive(Debug, Clone, Copy)]
pub struct StatsReducer {
    mode: StatsType,
}

impl StatsReducer {
    pub fn new(mode: StatsType) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> StatsType {
        self.mode
    }

    /// Top [`TOP_N`] of a category across `servers`.
    pub fn rank(&self, category: StatCategory, servers: &[ServerStats<'_>]) -> Vec<AggregatedStatItem> {
        self.rank_limited(category, servers, TOP_N)
    }

    /// Merge duplicate-key rows, sort by value descending (stable), keep `limit`.
    pub fn rank_limited(
        &self,
        category: StatCategory,
        servers: &[ServerStats<'_>],
        limit: usize,
    ) -> Vec<AggregatedStatItem> {
        let mut groups = self.group(category, servers);
        groups.truncate(limit);

        groups
            .into_iter()
            .enumerate()
            .map(|(i, group)| AggregatedStatItem {
                rank: i + 1,
                formatted_value: self.format(category, group.value),
                label: group.label,
                year: group.year,
                value: group.value,
                source_server: group.source_server,
                server_id: group.server_id,
                thumb: group.thumb,
            })
            .collect()
    }

    /// Every merged group of a category, sorted, untruncated.
    pub(crate) fn totals(&self, category: StatCategory, servers: &[ServerStats<'_>]) -> Vec<(String, i64)> {
        self.group(category, servers)
            .into_iter()
            .map(|group| (group.label, group.value))
            .collect()
    }

    pub fn format(&self, category: StatCategory, value: i64) -> String {
        if category.is_duration(self.mode) {
            format_duration(value)
        } else {
            format_count(value)
        }
    }

    fn group(&self, category: StatCategory, servers: &[ServerStats<'_>]) -> Vec<Group> {
        let mut index: HashMap<DedupKey, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();

        for server in servers {
            for row in server.rows(category) {
                let Some(key) = category.dedup_key(server.server_id, row) else {
                    continue;
                };
                let value = category.value(self.mode, row);

                if let Some(&i) = index.get(&key) {
                    groups[i].value += value;
                    continue;
                }
                index.insert(key, groups.len());
                groups.push(Group {
                    label: label(category, row),
                    year: matches!(category, StatCategory::TopMovies | StatCategory::PopularMovies)
                        .then_some(row.year)
                        .flatten(),
                    value,
                    source_server: server.server_name.to_string(),
                    server_id: server.server_id,
                    thumb: row.thumb.clone().or_else(|| row.grandparent_thumb.clone()),
                });
            }
        }

        // `sort_by` is stable: ties keep encounter order.
        groups.sort_by(|a, b| b.value.cmp(&a.value));
        groups
    }
}

fn label(category: StatCategory, row: &HomeStatRow) -> String {
    match category {
        StatCategory::TopUsers => row
            .friendly_name
            .clone()
            .or_else(|| row.user.clone())
            .unwrap_or_default(),
        StatCategory::TopPlatforms => platform_name(row).to_string(),
        StatCategory::TopLibraries => row.section_name.clone().unwrap_or_default(),
        _ => row.title.clone(),
    }
}
