//! Per-server liveness probes.

use std::time::Instant;

use serde::Serialize;
use upstream_api::{Command, HEALTH_TIMEOUT};

use super::AggregationService;
use crate::Result;
use crate::fanout::settle_all;

#[derive(Debug, Clone, Serialize)]
pub struct ServerHealth {
    pub server_id: i64,
    pub server_name: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl AggregationService {
    /// Probe every registered server. No servers yields an empty list.
    pub async fn server_health(&self) -> Result<Vec<ServerHealth>> {
        let servers = self.registry.list_servers().await?;
        let client = self.fanout.client();

        let results = settle_all(&servers, HEALTH_TIMEOUT, move |server| async move {
            let started = Instant::now();
            client
                .call::<serde_json::Value>(server.endpoint(), &Command::Status, HEALTH_TIMEOUT)
                .await?;
            Ok::<_, upstream_api::UpstreamError>(started.elapsed().as_millis() as u64)
        })
        .await;

        Ok(results
            .into_iter()
            .map(|result| ServerHealth {
                server_id: result.server_id,
                server_name: result.server_name,
                online: result.ok,
                latency_ms: result.payload,
            })
            .collect())
    }
}
