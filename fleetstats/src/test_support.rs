//! Helpers shared by unit tests.

use axum::Router;
use tokio::net::TcpListener;

use crate::database::models::UpstreamServer;

/// Serve `app` on an ephemeral local port and return its base URL.
pub(crate) async fn spawn_upstream(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub(crate) fn server(id: i64, name: &str, base_url: &str) -> UpstreamServer {
    UpstreamServer {
        id,
        name: name.to_string(),
        base_url: base_url.to_string(),
        credential: "test-key".to_string(),
        created_at: 0,
        updated_at: 0,
    }
}

/// Wrap `data` in a success envelope.
pub(crate) fn envelope(data: serde_json::Value) -> String {
    serde_json::json!({ "response": { "result": "success", "message": null, "data": data } })
        .to_string()
}
