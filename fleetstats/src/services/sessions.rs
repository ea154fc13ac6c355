//! Live sessions across servers with approximate viewer locations.

use std::collections::HashSet;

use serde::Serialize;
use upstream_api::{Activity, Command, STANDARD_TIMEOUT, Session};

use super::AggregationService;
use crate::Result;
use crate::fanout::successes;
use crate::geo::GeoLocation;
use crate::registry::ServerSelection;

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub server_id: i64,
    pub server_name: String,
    #[serde(flatten)]
    pub session: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoLocation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveSessions {
    pub stream_count: usize,
    pub sessions: Vec<SessionView>,
}

impl AggregationService {
    /// Sessions flattened in server order.
    pub async fn live_sessions(&self, selection: ServerSelection) -> Result<LiveSessions> {
        let servers = self.target_servers(selection).await?;
        let results = self
            .fanout
            .fan_out::<Activity>(&servers, &Command::GetActivity, STANDARD_TIMEOUT)
            .await;

        let mut sessions: Vec<SessionView> = successes(&results)
            .flat_map(|(result, activity)| {
                activity.sessions.iter().map(|session| SessionView {
                    server_id: result.server_id,
                    server_name: result.server_name.clone(),
                    session: session.clone(),
                    geo: None,
                })
            })
            .collect();

        let ips: HashSet<String> = sessions
            .iter()
            .filter_map(|view| view.session.ip_address.clone())
            .filter(|ip| !ip.is_empty())
            .collect();
        let locations = self.geo.resolve_all(&ips).await;

        for view in &mut sessions {
            view.geo = view
                .session
                .ip_address
                .as_ref()
                .and_then(|ip| locations.get(ip).cloned());
        }

        Ok(LiveSessions {
            stream_count: sessions.len(),
            sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_fixtures::*;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sessions_keep_server_order_and_tags() {
        let a = FakeUpstream::default().with(
            "get_activity",
            json!({ "stream_count": 1, "sessions": [
                { "session_key": "1", "user": "alice", "title": "Heat", "ip_address": "192.168.1.4" }
            ]}),
        );
        let b = FakeUpstream::default().with(
            "get_activity",
            json!({ "stream_count": 2, "sessions": [
                { "session_key": "7", "user": "bob", "title": "Alien" },
                { "session_key": "8", "user": "carol", "title": "Dune" }
            ]}),
        );
        let h = harness(&[("a", &a), ("b", &b)]).await;
        add_dead_server(&h, "dead").await;

        let live = h.service.live_sessions(ServerSelection::All).await.unwrap();
        assert_eq!(live.stream_count, 3);
        let users: Vec<&str> = live.sessions.iter().map(|s| s.session.user.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
        assert_eq!(live.sessions[0].server_name, "a");
        // Private address: never located.
        assert!(live.sessions[0].geo.is_none());

        let json = serde_json::to_value(&live.sessions[1]).unwrap();
        assert_eq!(json["user"], "bob");
        assert_eq!(json["server_name"], "b");
    }
}
