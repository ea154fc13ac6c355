//! Concurrent per-server querying with settle-all semantics.
//!
//! One call is issued per server, all at once. Every call is bounded by its
//! own timeout and the aggregation waits until each has either produced a
//! payload or failed. A failure only marks that server's result `ok = false`;
//! siblings are never cancelled. Results come back in the order of the input
//! server list, regardless of which server answered first.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use upstream_api::{Command, UpstreamClient};

use crate::database::models::UpstreamServer;

/// Outcome of one server's call within a fan-out.
#[derive(Debug, Clone)]
pub struct PerServerResult<T> {
    pub server_id: i64,
    pub server_name: String,
    pub payload: Option<T>,
    pub ok: bool,
}

impl<T> PerServerResult<T> {
    fn success(server: &UpstreamServer, payload: T) -> Self {
        Self {
            server_id: server.id,
            server_name: server.name.clone(),
            payload: Some(payload),
            ok: true,
        }
    }

    fn failure(server: &UpstreamServer) -> Self {
        Self {
            server_id: server.id,
            server_name: server.name.clone(),
            payload: None,
            ok: false,
        }
    }
}

/// Payloads of the successful results, paired with their server, in input order.
pub fn successes<T>(results: &[PerServerResult<T>]) -> impl Iterator<Item = (&PerServerResult<T>, &T)> {
    results
        .iter()
        .filter_map(|result| result.payload.as_ref().map(|payload| (result, payload)))
}

/// Run `call` once per server concurrently and wait for every one to settle.
pub async fn settle_all<'a, T, E, F, Fut>(
    servers: &'a [UpstreamServer],
    timeout: Duration,
    call: F,
) -> Vec<PerServerResult<T>>
where
    F: Fn(&'a UpstreamServer) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let calls = servers.iter().map(|server| {
        let fut = call(server);
        async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(Ok(payload)) => PerServerResult::success(server, payload),
                Ok(Err(e)) => {
                    warn!(server = %server.name, server_id = server.id, error = %e, "Upstream call failed");
                    PerServerResult::failure(server)
                }
                Err(_) => {
                    warn!(
                        server = %server.name,
                        server_id = server.id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Upstream call timed out"
                    );
                    PerServerResult::failure(server)
                }
            }
        }
    });

    let results = join_all(calls).await;
    debug!(
        servers = results.len(),
        ok = results.iter().filter(|r| r.ok).count(),
        "Fan-out settled"
    );
    results
}

/// Issues typed upstream commands to many servers at once.
#[derive(Debug, Clone, Default)]
pub struct FanoutAggregator {
    client: UpstreamClient,
}

impl FanoutAggregator {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// Send `command` to every server, one attempt each.
    pub async fn fan_out<T: DeserializeOwned>(
        &self,
        servers: &[UpstreamServer],
        command: &Command,
        timeout: Duration,
    ) -> Vec<PerServerResult<T>> {
        let client = &self.client;
        settle_all(servers, timeout, move |server| {
            client.call::<T>(server.endpoint(), command, timeout)
        })
        .await
    }
}
