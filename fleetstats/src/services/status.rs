//! Network status: live counters plus cached snapshot highlights.

use std::collections::HashSet;

use serde::Serialize;
use upstream_api::{Activity, Command, STANDARD_TIMEOUT};

use super::{AggregationService, SNAPSHOT_MODE};
use crate::Result;
use crate::fanout::successes;
use crate::registry::ServerSelection;
use crate::stats::{AggregatedStatItem, ServerStats, StatCategory, StatsReducer};

#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub server_id: i64,
    pub server_name: String,
    pub online: bool,
    pub stream_count: i64,
    pub transcodes: i64,
    pub direct_plays: i64,
    pub direct_streams: i64,
    pub total_bandwidth: i64,
}

/// Counters summed over every server that answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamTotals {
    pub stream_count: i64,
    pub transcodes: i64,
    pub direct_plays: i64,
    pub direct_streams: i64,
    pub total_bandwidth: i64,
    pub lan_bandwidth: i64,
    pub wan_bandwidth: i64,
}

impl StreamTotals {
    fn add(&mut self, activity: &Activity) {
        self.stream_count += activity.stream_count;
        self.transcodes += activity.stream_count_transcode;
        self.direct_plays += activity.stream_count_direct_play;
        self.direct_streams += activity.stream_count_direct_stream;
        self.total_bandwidth += activity.total_bandwidth;
        self.lan_bandwidth += activity.lan_bandwidth;
        self.wan_bandwidth += activity.wan_bandwidth;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkStatus {
    pub servers: Vec<ServerStatus>,
    pub servers_online: usize,
    pub totals: StreamTotals,
    /// Distinct usernames across all servers' user lists.
    pub total_users: usize,
    /// Distinct usernames with a live session.
    pub active_users: usize,
    pub top_movies: Vec<AggregatedStatItem>,
    pub top_shows: Vec<AggregatedStatItem>,
}

impl AggregationService {
    pub async fn network_status(&self, selection: ServerSelection) -> Result<NetworkStatus> {
        let servers = self.target_servers(selection).await?;

        let (activity, snapshots) = futures::join!(
            self.fanout
                .fan_out::<Activity>(&servers, &Command::GetActivity, STANDARD_TIMEOUT),
            self.snapshots(&servers),
        );

        let mut totals = StreamTotals::default();
        let mut streaming = HashSet::new();
        let statuses = activity
            .iter()
            .map(|result| {
                let mut status = ServerStatus {
                    server_id: result.server_id,
                    server_name: result.server_name.clone(),
                    online: result.ok,
                    stream_count: 0,
                    transcodes: 0,
                    direct_plays: 0,
                    direct_streams: 0,
                    total_bandwidth: 0,
                };
                if let Some(activity) = &result.payload {
                    totals.add(activity);
                    streaming.extend(activity.sessions.iter().map(|s| s.user.clone()));
                    status.stream_count = activity.stream_count;
                    status.transcodes = activity.stream_count_transcode;
                    status.direct_plays = activity.stream_count_direct_play;
                    status.direct_streams = activity.stream_count_direct_stream;
                    status.total_bandwidth = activity.total_bandwidth;
                }
                status
            })
            .collect::<Vec<_>>();

        // Same person on several servers counts once here.
        let users: HashSet<&str> = successes(&snapshots)
            .flat_map(|(_, snapshot)| snapshot.users.iter().map(|u| u.username.as_str()))
            .collect();

        let stats: Vec<ServerStats<'_>> = successes(&snapshots)
            .map(|(result, snapshot)| {
                ServerStats::new(result.server_id, &result.server_name, &snapshot.home_stats)
            })
            .collect();
        let reducer = StatsReducer::new(SNAPSHOT_MODE);

        Ok(NetworkStatus {
            servers_online: statuses.iter().filter(|s| s.online).count(),
            servers: statuses,
            totals,
            total_users: users.len(),
            active_users: streaming.len(),
            top_movies: reducer.rank(StatCategory::TopMovies, &stats),
            top_shows: reducer.rank(StatCategory::TopTv, &stats),
        })
    }
}
