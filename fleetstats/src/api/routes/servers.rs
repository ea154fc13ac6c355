//! Server registration routes.
//!
//! Credentials are accepted on write and never returned.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::database::models::{ServerInput, UpstreamServer};
use crate::services::ServerHealth;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_servers).post(create_server))
        .route("/health", get(server_health))
        .route("/{id}", put(update_server).delete(delete_server))
}

async fn list_servers(State(state): State<AppState>) -> ApiResult<Json<Vec<UpstreamServer>>> {
    Ok(Json(state.registry()?.list_servers().await?))
}

async fn create_server(
    State(state): State<AppState>,
    Json(input): Json<ServerInput>,
) -> ApiResult<(StatusCode, Json<UpstreamServer>)> {
    let server = state.registry()?.create_server(input).await?;
    Ok((StatusCode::CREATED, Json(server)))
}

async fn update_server(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ServerInput>,
) -> ApiResult<Json<UpstreamServer>> {
    Ok(Json(state.registry()?.update_server(id, input).await?))
}

async fn delete_server(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.registry()?.delete_server(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn server_health(State(state): State<AppState>) -> ApiResult<Json<Vec<ServerHealth>>> {
    Ok(Json(state.aggregation()?.server_health().await?))
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{get as get_uri, json_body, send};
    use super::*;
    use crate::cache::MetadataCache;
    use crate::database::repositories::SqlxServerRepository;
    use crate::database::test_pool;
    use crate::registry::ServerRegistry;
    use axum::body::Body;
    use axum::http::{Request, header};
    use std::sync::Arc;

    async fn state() -> AppState {
        let registry = ServerRegistry::new(
            Arc::new(SqlxServerRepository::new(test_pool().await)),
            MetadataCache::new(),
        );
        AppState::new().with_registry(Arc::new(registry))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn crud_round_trip_hides_credential() {
        let state = state().await;

        let (status, created) = json_body(
            send(
                state.clone(),
                json_request(
                    "POST",
                    "/api/servers",
                    serde_json::json!({
                        "name": "home",
                        "base_url": "http://10.0.0.2:8181/",
                        "credential": "secret"
                    }),
                ),
            )
            .await,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["base_url"], "http://10.0.0.2:8181");
        assert!(created.get("credential").is_none());
        let id = created["id"].as_i64().unwrap();

        let (status, updated) = json_body(
            send(
                state.clone(),
                json_request(
                    "PUT",
                    &format!("/api/servers/{id}"),
                    serde_json::json!({
                        "name": "renamed",
                        "base_url": "https://monitor.example.com",
                        "credential": "secret"
                    }),
                ),
            )
            .await,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "renamed");

        let (_, listed) = json_body(get_uri(state.clone(), "/api/servers").await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert!(!listed.to_string().contains("secret"));

        let response = send(
            state.clone(),
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/servers/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(
            state,
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/servers/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_input_is_unprocessable() {
        let (status, body) = json_body(
            send(
                state().await,
                json_request(
                    "POST",
                    "/api/servers",
                    serde_json::json!({ "name": "x", "base_url": "ftp://x", "credential": "k" }),
                ),
            )
            .await,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_registry_is_unavailable() {
        let response = get_uri(AppState::new(), "/api/servers").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
