//! Query services behind the inbound HTTP surface.
//!
//! Each query resolves its target servers through the registry, fans out one
//! call per server, and reduces the settled results. Zero configured servers
//! is an error ([`Error::NoServers`]); servers that fail simply contribute
//! nothing, so an all-failed query yields a zero-valued result.

mod charts;
mod health;
mod sessions;
mod stats;
mod status;
mod users;

pub use charts::PlaysByDateChart;
pub use health::ServerHealth;
pub use sessions::{LiveSessions, SessionView};
pub use stats::{CategoryStats, StatsOverview, StatsQuery};
pub use status::{NetworkStatus, ServerStatus, StreamTotals};
pub use users::{HistoryEntry, PlayerSummary, UserDetail, UserServer, WatchTimeWindow};

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use upstream_api::{Command, HomeStat, STANDARD_TIMEOUT, StatsType, UpstreamError, User};

use crate::cache::{MetadataCache, MetadataCacheEntry, ServerSnapshot};
use crate::database::models::UpstreamServer;
use crate::fanout::{FanoutAggregator, PerServerResult, settle_all};
use crate::geo::GeoResolver;
use crate::registry::{ServerRegistry, ServerSelection};
use crate::{Error, Result};

pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 3650;

/// Window and metric of the cached snapshot's home statistics.
pub const SNAPSHOT_DAYS: u32 = DEFAULT_DAYS;
pub const SNAPSHOT_MODE: StatsType = StatsType::Plays;
/// Rows requested per statistic block.
pub const STATS_COUNT: u32 = 25;

/// Query window in days, defaulted and clamped to `1..=MAX_DAYS`.
pub fn clamp_days(days: Option<u32>) -> u32 {
    days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
}

fn home_stats_command(days: u32, mode: StatsType) -> Command {
    Command::GetHomeStats {
        time_range: days,
        stats_type: mode,
        stats_count: STATS_COUNT,
    }
}

/// Shared collaborators of every aggregation query.
pub struct AggregationService {
    registry: Arc<ServerRegistry>,
    fanout: FanoutAggregator,
    metadata_cache: MetadataCache,
    metadata_ttl: Duration,
    geo: Arc<GeoResolver>,
}

impl AggregationService {
    pub fn new(
        registry: Arc<ServerRegistry>,
        fanout: FanoutAggregator,
        metadata_cache: MetadataCache,
        geo: Arc<GeoResolver>,
    ) -> Self {
        Self {
            registry,
            fanout,
            metadata_cache,
            metadata_ttl: crate::cache::METADATA_TTL,
            geo,
        }
    }

    pub fn with_metadata_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_ttl = ttl;
        self
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    /// Servers a query fans out to; none configured is [`Error::NoServers`].
    async fn target_servers(&self, selection: ServerSelection) -> Result<Vec<UpstreamServer>> {
        let servers = self.registry.select(selection).await?;
        if servers.is_empty() {
            return Err(Error::NoServers);
        }
        Ok(servers)
    }

    /// Home statistics (30 days, plays) and user list per server, served from
    /// the metadata cache while fresh and refetched otherwise.
    async fn snapshots(&self, servers: &[UpstreamServer]) -> Vec<PerServerResult<Arc<ServerSnapshot>>> {
        let client = self.fanout.client();
        let cache = &self.metadata_cache;
        let ttl = self.metadata_ttl;
        let command = home_stats_command(SNAPSHOT_DAYS, SNAPSHOT_MODE);
        let command = &command;

        settle_all(servers, STANDARD_TIMEOUT, move |server| async move {
            let key = server.id.to_string();
            if let Some(snapshot) = cache.get_fresh(&key, ttl) {
                debug!(server = %server.name, "Metadata cache hit");
                return Ok(snapshot);
            }

            let (home_stats, users) = futures::try_join!(
                client.call::<Vec<HomeStat>>(server.endpoint(), command, STANDARD_TIMEOUT),
                client.call::<Vec<User>>(server.endpoint(), &Command::GetUsers, STANDARD_TIMEOUT),
            )?;

            let entry = MetadataCacheEntry::new(ServerSnapshot { home_stats, users });
            let snapshot = entry.stats.clone();
            cache.set(key, entry);
            debug!(server = %server.name, "Metadata cache refreshed");
            Ok::<_, UpstreamError>(snapshot)
        })
        .await
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    //! Simulated upstream servers for service tests.

    use super::*;
    use crate::database::models::ServerInput;
    use crate::database::repositories::{SqlxGeoCacheRepository, SqlxServerRepository};
    use crate::database::test_pool;
    use crate::test_support::{envelope, spawn_upstream};
    use axum::Router;
    use axum::extract::Query;
    use axum::routing::get;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned responses of one fake upstream, keyed by `cmd`.
    #[derive(Clone, Default)]
    pub struct FakeUpstream {
        pub responses: HashMap<&'static str, Value>,
        /// `cmd -> (param, expected value, data served on mismatch)`.
        pub filters: HashMap<&'static str, (&'static str, String, Value)>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeUpstream {
        pub fn with(mut self, cmd: &'static str, data: Value) -> Self {
            self.responses.insert(cmd, data);
            self
        }

        /// Serve `cmd`'s canned data only when `param` equals `value`.
        pub fn filtered_on(
            mut self,
            cmd: &'static str,
            param: &'static str,
            value: impl Into<String>,
            otherwise: Value,
        ) -> Self {
            self.filters.insert(cmd, (param, value.into(), otherwise));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn router(&self) -> Router {
            let responses = Arc::new(self.responses.clone());
            let filters = Arc::new(self.filters.clone());
            let calls = self.calls.clone();
            Router::new().route(
                "/api/v2",
                get(move |Query(params): Query<HashMap<String, String>>| {
                    let responses = responses.clone();
                    let filters = filters.clone();
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let cmd = params.get("cmd").cloned().unwrap_or_default();
                        if let Some((param, expected, otherwise)) = filters.get(cmd.as_str()) {
                            if params.get(*param) != Some(expected) {
                                return envelope(otherwise.clone());
                            }
                        }
                        match responses.get(cmd.as_str()) {
                            Some(data) => envelope(data.clone()),
                            None => json!({
                                "response": { "result": "error", "message": "unknown cmd", "data": {} }
                            })
                            .to_string(),
                        }
                    }
                }),
            )
        }
    }

    pub struct Harness {
        pub service: AggregationService,
        pub cache: MetadataCache,
    }

    /// Register each upstream (in order) and build a service over them.
    pub async fn harness(upstreams: &[(&str, &FakeUpstream)]) -> Harness {
        let pool = test_pool().await;
        let cache = MetadataCache::new();
        let registry = Arc::new(ServerRegistry::new(
            Arc::new(SqlxServerRepository::new(pool.clone())),
            cache.clone(),
        ));
        for (name, upstream) in upstreams {
            let base_url = spawn_upstream(upstream.router()).await;
            registry
                .create_server(ServerInput {
                    name: name.to_string(),
                    base_url,
                    credential: "k".into(),
                })
                .await
                .unwrap();
        }
        let geo = Arc::new(GeoResolver::new(
            Arc::new(SqlxGeoCacheRepository::new(pool)),
            None,
        ));
        let service = AggregationService::new(
            registry,
            FanoutAggregator::default(),
            cache.clone(),
            geo,
        );
        Harness { service, cache }
    }

    /// Register a server nobody listens on.
    pub async fn add_dead_server(harness: &Harness, name: &str) {
        harness
            .service
            .registry()
            .create_server(ServerInput {
                name: name.to_string(),
                base_url: "http://127.0.0.1:1".into(),
                credential: "k".into(),
            })
            .await
            .unwrap();
    }
}
