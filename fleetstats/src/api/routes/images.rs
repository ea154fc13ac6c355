//! Image proxy route backed by the on-disk cache.

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::api::error::ApiResult;
use crate::api::models::ImageQuery;
use crate::api::server::AppState;
use crate::images::FALLBACK_CONTENT_TYPE;

/// Cached entries never change for a given key.
const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

const DEFAULT_WIDTH: u32 = 300;
const DEFAULT_HEIGHT: u32 = 450;

pub fn router() -> Router<AppState> {
    Router::new().route("/{server_id}", get(proxy_image))
}

async fn proxy_image(
    State(state): State<AppState>,
    Path(server_id): Path<i64>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<Response> {
    let image = state
        .image_proxy()?
        .fetch(
            server_id,
            &query.img,
            query.width.unwrap_or(DEFAULT_WIDTH),
            query.height.unwrap_or(DEFAULT_HEIGHT),
        )
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&image.content_type)
            .unwrap_or(HeaderValue::from_static(FALLBACK_CONTENT_TYPE)),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
    );
    headers.insert(X_CACHE, HeaderValue::from_static(image.cache_status.as_str()));
    if let Some(len) = image.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    Ok((headers, Body::from_stream(image.body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{get as get_uri, json_body};
    use super::*;
    use crate::cache::MetadataCache;
    use crate::database::models::ServerInput;
    use crate::database::repositories::SqlxServerRepository;
    use crate::database::test_pool;
    use crate::images::ImageCacheProxy;
    use crate::registry::ServerRegistry;
    use crate::test_support::spawn_upstream;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;
    use upstream_api::UpstreamClient;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 1, 2, 3];

    async fn state_with_upstream(app: Router, dir: &std::path::Path) -> (AppState, i64) {
        let base_url = spawn_upstream(app).await;
        let registry = Arc::new(ServerRegistry::new(
            Arc::new(SqlxServerRepository::new(test_pool().await)),
            MetadataCache::new(),
        ));
        let server = registry
            .create_server(ServerInput {
                name: "home".into(),
                base_url,
                credential: "k".into(),
            })
            .await
            .unwrap();
        let proxy = ImageCacheProxy::new(dir, registry.clone(), UpstreamClient::new());
        let state = AppState::new()
            .with_registry(registry)
            .with_image_proxy(Arc::new(proxy));
        (state, server.id)
    }

    #[tokio::test]
    async fn miss_then_hit_headers() {
        // Upstream claims a generic type; the cached copy is sniffed.
        let upstream = Router::new().route(
            "/api/v2",
            get(|| async { ([(header::CONTENT_TYPE, "application/octet-stream")], JPEG) }),
        );
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state_with_upstream(upstream, dir.path()).await;
        let uri = format!("/api/images/{id}?img=%2Fthumb%2F9&width=100&height=100");

        let first = get_uri(state.clone(), &uri).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[X_CACHE], "MISS");
        assert_eq!(first.headers()[header::CACHE_CONTROL], IMMUTABLE_CACHE_CONTROL);
        assert_eq!(to_bytes(first.into_body(), usize::MAX).await.unwrap(), JPEG);

        let mut second = get_uri(state.clone(), &uri).await;
        for _ in 0..50 {
            if second.headers()[X_CACHE] == "HIT" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            second = get_uri(state.clone(), &uri).await;
        }
        assert_eq!(second.headers()[X_CACHE], "HIT");
        assert_eq!(second.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(to_bytes(second.into_body(), usize::MAX).await.unwrap(), JPEG);
    }

    #[tokio::test]
    async fn upstream_401_becomes_502() {
        let upstream = Router::new().route(
            "/api/v2",
            get(|| async { (StatusCode::UNAUTHORIZED, "nope") }),
        );
        let dir = tempfile::tempdir().unwrap();
        let (state, id) = state_with_upstream(upstream, dir.path()).await;

        let (status, body) =
            json_body(get_uri(state, &format!("/api/images/{id}?img=/x")).await).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "UPSTREAM_AUTH_FAILED");
    }
}
