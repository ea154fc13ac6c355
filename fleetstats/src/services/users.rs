//! Cross-server detail for one username.

use std::collections::HashMap;

use serde::Serialize;
use upstream_api::{
    Command, HISTORY_TIMEOUT, HistoryPage, HistoryRow, PlayerStat, STANDARD_TIMEOUT, WatchTimeStat,
};

use super::AggregationService;
use crate::database::models::UpstreamServer;
use crate::fanout::{PerServerResult, settle_all, successes};
use crate::registry::ServerSelection;
use crate::stats::{format_duration, percentage};
use crate::{Error, Result};

/// Watch-time windows requested per user; `0` means all time.
pub const WATCH_WINDOWS: [u32; 4] = [1, 7, 30, 0];
/// Most recent plays kept in a user's merged history.
pub const HISTORY_LIMIT: usize = 25;

#[derive(Debug, Clone, Serialize)]
pub struct UserServer {
    pub server_id: i64,
    pub server_name: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchTimeWindow {
    pub query_days: i64,
    pub total_plays: i64,
    pub total_time: i64,
    pub formatted_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub platform: String,
    pub total_plays: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub server_id: i64,
    pub server_name: String,
    #[serde(flatten)]
    pub row: HistoryRow,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    pub servers: Vec<UserServer>,
    pub watch_time: Vec<WatchTimeWindow>,
    pub players: Vec<PlayerSummary>,
    pub history: Vec<HistoryEntry>,
}

impl AggregationService {
    pub async fn user_detail(&self, username: &str, selection: ServerSelection) -> Result<UserDetail> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::validation("username must not be empty"));
        }

        let servers = self.target_servers(selection).await?;
        let snapshots = self.snapshots(&servers).await;

        // Locate the account on each server through the cached user lists.
        let mut friendly_name = None;
        let mut accounts: HashMap<i64, i64> = HashMap::new();
        let mut user_servers = Vec::new();
        for (result, snapshot) in successes(&snapshots) {
            if let Some(user) = snapshot
                .users
                .iter()
                .find(|u| u.username.eq_ignore_ascii_case(username))
            {
                friendly_name = friendly_name.or_else(|| user.friendly_name.clone());
                accounts.insert(result.server_id, user.user_id);
                user_servers.push(UserServer {
                    server_id: result.server_id,
                    server_name: result.server_name.clone(),
                    user_id: user.user_id,
                });
            }
        }
        if user_servers.is_empty() {
            return Err(Error::not_found("User", username));
        }

        let member_servers: Vec<UpstreamServer> = servers
            .into_iter()
            .filter(|s| accounts.contains_key(&s.id))
            .collect();

        let client = self.fanout.client();
        let accounts = &accounts;

        let (watch_time, players, history) = futures::join!(
            settle_all(&member_servers, STANDARD_TIMEOUT, move |server| {
                let command = Command::GetUserWatchTimeStats {
                    user_id: accounts.get(&server.id).copied().unwrap_or_default(),
                    query_days: WATCH_WINDOWS.to_vec(),
                };
                async move {
                    client
                        .call::<Vec<WatchTimeStat>>(server.endpoint(), &command, STANDARD_TIMEOUT)
                        .await
                }
            }),
            settle_all(&member_servers, STANDARD_TIMEOUT, move |server| {
                let command = Command::GetUserPlayerStats {
                    user_id: accounts.get(&server.id).copied().unwrap_or_default(),
                };
                async move {
                    client
                        .call::<Vec<PlayerStat>>(server.endpoint(), &command, STANDARD_TIMEOUT)
                        .await
                }
            }),
            settle_all(&member_servers, HISTORY_TIMEOUT, move |server| {
                // Upstreams filter history by their own account id, not the requested spelling.
                let command = Command::GetHistory {
                    user_id: accounts.get(&server.id).copied().unwrap_or_default(),
                    length: HISTORY_LIMIT as u32,
                };
                async move {
                    client
                        .call::<HistoryPage>(server.endpoint(), &command, HISTORY_TIMEOUT)
                        .await
                }
            }),
        );

        Ok(UserDetail {
            username: username.to_string(),
            friendly_name,
            servers: user_servers,
            watch_time: merge_watch_time(&watch_time),
            players: merge_players(&players),
            history: merge_history(&history),
        })
    }
}

/// Sum windows with the same `query_days`, in first-seen order.
fn merge_watch_time(results: &[PerServerResult<Vec<WatchTimeStat>>]) -> Vec<WatchTimeWindow> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut windows: Vec<WatchTimeWindow> = Vec::new();
    for (_, stats) in successes(results) {
        for stat in stats {
            match index.get(&stat.query_days) {
                Some(&i) => {
                    windows[i].total_plays += stat.total_plays;
                    windows[i].total_time += stat.total_time;
                }
                None => {
                    index.insert(stat.query_days, windows.len());
                    windows.push(WatchTimeWindow {
                        query_days: stat.query_days,
                        total_plays: stat.total_plays,
                        total_time: stat.total_time,
                        formatted_time: String::new(),
                    });
                }
            }
        }
    }
    for window in &mut windows {
        window.formatted_time = format_duration(window.total_time);
    }
    windows
}

/// Sum plays per platform across servers, most played first.
fn merge_players(results: &[PerServerResult<Vec<PlayerStat>>]) -> Vec<PlayerSummary> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut players: Vec<PlayerSummary> = Vec::new();
    for (_, stats) in successes(results) {
        for stat in stats {
            match index.get(&stat.platform) {
                Some(&i) => players[i].total_plays += stat.total_plays,
                None => {
                    index.insert(stat.platform.clone(), players.len());
                    players.push(PlayerSummary {
                        platform: stat.platform.clone(),
                        total_plays: stat.total_plays,
                        percentage: 0,
                    });
                }
            }
        }
    }

    players.sort_by(|a, b| b.total_plays.cmp(&a.total_plays));
    let total: i64 = players.iter().map(|p| p.total_plays).sum();
    for player in &mut players {
        player.percentage = percentage(player.total_plays, total);
    }
    players
}

/// Newest first across servers, capped at [`HISTORY_LIMIT`].
fn merge_history(results: &[PerServerResult<HistoryPage>]) -> Vec<HistoryEntry> {
    let mut history: Vec<HistoryEntry> = successes(results)
        .flat_map(|(result, page)| {
            page.data.iter().map(|row| HistoryEntry {
                server_id: result.server_id,
                server_name: result.server_name.clone(),
                row: row.clone(),
            })
        })
        .collect();
    history.sort_by(|a, b| b.row.date.cmp(&a.row.date));
    history.truncate(HISTORY_LIMIT);
    history
}

#[cfg(test)]
mod tests {
    use super::super::test_fixtures::*;
    use super::*;
    use serde_json::json;

    fn user_upstream(user_id: i64, plays: i64, platform: &str, dates: &[i64]) -> FakeUpstream {
        let history: Vec<_> = dates
            .iter()
            .map(|d| json!({ "date": d, "full_title": format!("Play {d}"), "platform": platform }))
            .collect();
        FakeUpstream::default()
            .with("get_home_stats", json!([]))
            .with(
                "get_users",
                json!([
                    { "user_id": 99, "username": "someone" },
                    { "user_id": user_id, "username": "Alice", "friendly_name": "Alice A." }
                ]),
            )
            .with(
                "get_user_watch_time_stats",
                json!([
                    { "query_days": 1, "total_plays": plays, "total_time": 3600 },
                    { "query_days": 0, "total_plays": plays * 10, "total_time": 36000 }
                ]),
            )
            .with(
                "get_user_player_stats",
                json!([{ "platform": platform, "total_plays": plays }]),
            )
            .with(
                "get_history",
                json!({ "recordsFiltered": dates.len(), "data": history }),
            )
            .filtered_on(
                "get_history",
                "user_id",
                user_id.to_string(),
                json!({ "recordsFiltered": 0, "data": [] }),
            )
    }

    #[tokio::test]
    async fn merges_user_across_servers() {
        let a = user_upstream(1, 2, "Roku", &[100, 300]);
        let b = user_upstream(7, 3, "Chrome", &[200]);
        let h = harness(&[("a", &a), ("b", &b)]).await;

        let detail = h.service.user_detail("alice", ServerSelection::All).await.unwrap();
        assert_eq!(detail.friendly_name.as_deref(), Some("Alice A."));
        let ids: Vec<i64> = detail.servers.iter().map(|s| s.user_id).collect();
        assert_eq!(ids, vec![1, 7]);

        assert_eq!(detail.watch_time.len(), 2);
        assert_eq!(detail.watch_time[0].query_days, 1);
        assert_eq!(detail.watch_time[0].total_plays, 5);
        assert_eq!(detail.watch_time[0].formatted_time, "2:00:00");
        assert_eq!(detail.watch_time[1].total_time, 72000);

        assert_eq!(detail.players[0].platform, "Chrome");
        assert_eq!(detail.players[0].percentage, 60);

        let dates: Vec<i64> = detail.history.iter().map(|e| e.row.date).collect();
        assert_eq!(dates, vec![300, 200, 100]);
        assert_eq!(detail.history[1].server_name, "b");
    }

    #[tokio::test]
    async fn history_is_requested_by_account_id_not_spelling() {
        // Stored as "Alice" with different ids per server; queried in lowercase.
        let a = user_upstream(1, 1, "Roku", &[500]);
        let b = user_upstream(42, 1, "Roku", &[400, 450]);
        let h = harness(&[("a", &a), ("b", &b)]).await;

        let detail = h.service.user_detail("alice", ServerSelection::All).await.unwrap();
        let dates: Vec<i64> = detail.history.iter().map(|e| e.row.date).collect();
        assert_eq!(dates, vec![500, 450, 400]);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let a = user_upstream(1, 2, "Roku", &[]);
        let h = harness(&[("a", &a)]).await;

        let err = h.service.user_detail("nobody", ServerSelection::All).await.err().unwrap();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn history_is_capped() {
        let page = HistoryPage {
            records_filtered: 40,
            data: (0..40)
                .map(|d| HistoryRow {
                    date: d,
                    ..Default::default()
                })
                .collect(),
        };
        let results = vec![PerServerResult {
            server_id: 1,
            server_name: "a".into(),
            payload: Some(page),
            ok: true,
        }];
        let merged = merge_history(&results);
        assert_eq!(merged.len(), HISTORY_LIMIT);
        assert_eq!(merged[0].row.date, 39);
    }
}
