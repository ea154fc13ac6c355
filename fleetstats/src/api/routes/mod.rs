//! API route modules.
//!
//! Organizes routes by resource type.

pub mod charts;
pub mod health;
pub mod images;
pub mod logging;
pub mod servers;
pub mod sessions;
pub mod stats;
pub mod status;
pub mod users;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/status", status::router())
        .nest("/api/sessions", sessions::router())
        .nest("/api/stats", stats::router())
        .nest("/api/users", users::router())
        .nest("/api/charts", charts::router())
        .nest("/api/servers", servers::router())
        .nest("/api/images", images::router())
        .nest("/api/logging", logging::router())
        .nest("/health", health::router())
        .with_state(state)
}
