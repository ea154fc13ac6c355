//! Merged home statistics across servers.

use serde::Serialize;
use upstream_api::{HomeStat, StatsType, STANDARD_TIMEOUT};

use super::{AggregationService, SNAPSHOT_DAYS, SNAPSHOT_MODE, home_stats_command};
use crate::Result;
use crate::fanout::{PerServerResult, successes};
use crate::registry::ServerSelection;
use crate::stats::{
    AggregatedStatItem, RADAR_N, ServerPeak, ServerStats, ShareSlice, StatCategory, StatsReducer,
    concurrent_peaks, device_share,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsQuery {
    pub days: u32,
    pub selection: ServerSelection,
    pub mode: StatsType,
}

impl StatsQuery {
    fn matches_snapshot(&self) -> bool {
        self.days == SNAPSHOT_DAYS && self.mode == SNAPSHOT_MODE
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    pub category: StatCategory,
    pub items: Vec<AggregatedStatItem>,
    /// Only populated for `most_concurrent`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub peaks: Vec<ServerPeak>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsOverview {
    pub days: u32,
    pub mode: &'static str,
    pub servers_queried: usize,
    pub servers_responded: usize,
    pub categories: Vec<CategoryStats>,
    pub concurrent_peaks: Vec<ServerPeak>,
    pub platform_radar: Vec<AggregatedStatItem>,
    pub device_share: Vec<ShareSlice>,
}

impl AggregationService {
    /// Every category merged, plus peaks, radar and device share.
    pub async fn stats_overview(&self, query: StatsQuery) -> Result<StatsOverview> {
        let results = self.home_stats(query).await?;
        let stats = server_stats(&results);
        let reducer = StatsReducer::new(query.mode);

        let categories = StatCategory::ALL
            .into_iter()
            .filter(|c| *c != StatCategory::MostConcurrent)
            .map(|category| CategoryStats {
                category,
                items: reducer.rank(category, &stats),
                peaks: Vec::new(),
            })
            .collect();

        Ok(StatsOverview {
            days: query.days,
            mode: query.mode.as_str(),
            servers_queried: results.len(),
            servers_responded: stats.len(),
            categories,
            concurrent_peaks: concurrent_peaks(&stats),
            platform_radar: reducer.rank_limited(StatCategory::TopPlatforms, &stats, RADAR_N),
            device_share: device_share(&reducer, &stats),
        })
    }

    /// One category merged across servers.
    pub async fn category_stats(&self, query: StatsQuery, category: StatCategory) -> Result<CategoryStats> {
        let results = self.home_stats(query).await?;
        let stats = server_stats(&results);

        Ok(match category {
            StatCategory::MostConcurrent => CategoryStats {
                category,
                items: Vec::new(),
                peaks: concurrent_peaks(&stats),
            },
            _ => CategoryStats {
                category,
                items: StatsReducer::new(query.mode).rank(category, &stats),
                peaks: Vec::new(),
            },
        })
    }

    /// Per-server home statistics; the snapshot cache answers the default window.
    async fn home_stats(&self, query: StatsQuery) -> Result<Vec<PerServerResult<Vec<HomeStat>>>> {
        let servers = self.target_servers(query.selection).await?;

        if query.matches_snapshot() {
            let snapshots = self.snapshots(&servers).await;
            return Ok(snapshots
                .into_iter()
                .map(|result| PerServerResult {
                    server_id: result.server_id,
                    server_name: result.server_name,
                    ok: result.ok,
                    payload: result.payload.map(|snapshot| snapshot.home_stats.clone()),
                })
                .collect());
        }

        let command = home_stats_command(query.days, query.mode);
        Ok(self.fanout.fan_out(&servers, &command, STANDARD_TIMEOUT).await)
    }
}

fn server_stats(results: &[PerServerResult<Vec<HomeStat>>]) -> Vec<ServerStats<'_>> {
    successes(results)
        .map(|(result, stats)| ServerStats::new(result.server_id, &result.server_name, stats))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_fixtures::*;
    use super::*;
    use serde_json::json;

    fn stats_upstream(movie_plays: i64, peak: i64, platforms: &[(&str, i64)]) -> FakeUpstream {
        let platform_rows: Vec<_> = platforms
            .iter()
            .map(|(p, n)| json!({ "platform": p, "total_plays": n }))
            .collect();
        FakeUpstream::default()
            .with("get_users", json!([]))
            .with(
                "get_home_stats",
                json!([
                    { "stat_id": "top_movies", "rows": [
                        { "title": "Heat", "year": 1995, "total_plays": movie_plays, "total_duration": 7200 }
                    ]},
                    { "stat_id": "top_tv", "rows": [
                        { "title": "Show", "year": 2020, "total_plays": 1 }
                    ]},
                    { "stat_id": "top_platforms", "rows": platform_rows },
                    { "stat_id": "most_concurrent", "rows": [
                        { "title": "Concurrent Streams", "count": peak }
                    ]}
                ]),
            )
    }

    fn query(days: u32, mode: StatsType) -> StatsQuery {
        StatsQuery {
            days,
            selection: ServerSelection::All,
            mode,
        }
    }

    #[tokio::test]
    async fn overview_merges_every_category() {
        let a = stats_upstream(2, 5, &[("Roku", 1), ("Chrome", 1)]);
        let b = stats_upstream(3, 8, &[("Android", 1)]);
        let h = harness(&[("a", &a), ("b", &b)]).await;

        let overview = h.service.stats_overview(query(30, StatsType::Plays)).await.unwrap();
        assert_eq!(overview.servers_queried, 2);
        assert_eq!(overview.servers_responded, 2);

        let movies = &overview.categories[0];
        assert_eq!(movies.category, StatCategory::TopMovies);
        assert_eq!(movies.items[0].value, 5);

        let peaks: Vec<i64> = overview.concurrent_peaks.iter().map(|p| p.streams).collect();
        assert_eq!(peaks, vec![8, 5]);

        let shares: Vec<i64> = overview.device_share.iter().map(|s| s.percentage).collect();
        assert_eq!(shares, vec![33, 33, 33]);
        assert_eq!(overview.platform_radar.len(), 3);
    }

    #[tokio::test]
    async fn default_window_reuses_snapshot_cache() {
        let a = stats_upstream(2, 1, &[]);
        let h = harness(&[("a", &a)]).await;

        h.service.stats_overview(query(30, StatsType::Plays)).await.unwrap();
        let after_first = a.call_count();
        h.service.stats_overview(query(30, StatsType::Plays)).await.unwrap();
        assert_eq!(a.call_count(), after_first);

        // Other windows always go upstream.
        h.service.stats_overview(query(7, StatsType::Duration)).await.unwrap();
        assert_eq!(a.call_count(), after_first + 1);
    }

    #[tokio::test]
    async fn duration_mode_formats_values() {
        let a = stats_upstream(2, 1, &[]);
        let h = harness(&[("a", &a)]).await;

        let movies = h
            .service
            .category_stats(query(7, StatsType::Duration), StatCategory::TopMovies)
            .await
            .unwrap();
        assert_eq!(movies.items[0].formatted_value, "2:00:00");
    }

    #[tokio::test]
    async fn most_concurrent_category_lists_peaks() {
        let a = stats_upstream(2, 4, &[]);
        let h = harness(&[("a", &a)]).await;

        let result = h
            .service
            .category_stats(query(30, StatsType::Plays), StatCategory::MostConcurrent)
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.peaks[0].streams, 4);
    }

    #[tokio::test]
    async fn all_failed_stats_are_empty() {
        let h = harness(&[]).await;
        add_dead_server(&h, "dead").await;

        let overview = h.service.stats_overview(query(30, StatsType::Plays)).await.unwrap();
        assert_eq!(overview.servers_responded, 0);
        assert!(overview.categories.iter().all(|c| c.items.is_empty()));
        assert!(overview.concurrent_peaks.is_empty());
        assert!(overview.device_share.is_empty());
    }
}
