//! API server setup and configuration.

use axum::Router;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::error::{ApiError, ApiResult};
use crate::api::routes;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::images::ImageCacheProxy;
use crate::logging::LoggingConfig;
use crate::registry::ServerRegistry;
use crate::services::AggregationService;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8383,
            enable_cors: true,
        }
    }
}

impl From<&AppConfig> for ApiServerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            bind_address: config.bind_address.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Server registrations
    pub registry: Option<Arc<ServerRegistry>>,
    /// Fan-out queries and their reducers
    pub aggregation: Option<Arc<AggregationService>>,
    /// On-disk image cache
    pub image_proxy: Option<Arc<ImageCacheProxy>>,
    /// Logging configuration for dynamic log level changes
    pub logging_config: Option<Arc<LoggingConfig>>,
}

impl AppState {
    /// Create a new application state without services (for testing).
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            registry: None,
            aggregation: None,
            image_proxy: None,
            logging_config: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<ServerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_aggregation(mut self, aggregation: Arc<AggregationService>) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn with_image_proxy(mut self, image_proxy: Arc<ImageCacheProxy>) -> Self {
        self.image_proxy = Some(image_proxy);
        self
    }

    pub fn with_logging_config(mut self, config: Arc<LoggingConfig>) -> Self {
        self.logging_config = Some(config);
        self
    }

    pub(crate) fn registry(&self) -> ApiResult<&Arc<ServerRegistry>> {
        self.registry
            .as_ref()
            .ok_or_else(|| ApiError::service_unavailable("Server registry not available"))
    }

    pub(crate) fn aggregation(&self) -> ApiResult<&Arc<AggregationService>> {
        self.aggregation
            .as_ref()
            .ok_or_else(|| ApiError::service_unavailable("Aggregation service not available"))
    }

    pub(crate) fn image_proxy(&self) -> ApiResult<&Arc<ImageCacheProxy>> {
        self.image_proxy
            .as_ref()
            .ok_or_else(|| ApiError::service_unavailable("Image cache not available"))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn with_state(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        // Health probes and image fetches are too chatty to trace.
        let quiet = |path: &str| path.starts_with("/health") || path.starts_with("/api/images");

        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(move |req: &Request| {
                    if quiet(req.uri().path()) {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                        use tower_http::trace::MakeSpan;
                        make_span.make_span(req)
                    }
                })
                .on_request(|req: &Request, span: &Span| {
                    if span.is_disabled() {
                        return;
                    }
                    let mut on_request =
                        tower_http::trace::DefaultOnRequest::new().level(tracing::Level::INFO);
                    use tower_http::trace::OnRequest;
                    on_request.on_request(req, span);
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response =
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                )
                .on_failure(
                    |class: tower_http::classify::ServerErrorsFailureClass,
                     latency: Duration,
                     span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let mut on_failure =
                            tower_http::trace::DefaultOnFailure::new().level(tracing::Level::ERROR);
                        use tower_http::trace::OnFailure;
                        on_failure.on_failure(class, latency, span);
                    },
                ),
        )
    }

    /// Start the server.
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| Error::ApiError(format!("Invalid address: {}", e)))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("API server listening on http://{}", addr);

        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await
            .map_err(|e| Error::ApiError(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
