//! Logging API routes.
//!
//! Read and replace the live log filter.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{LoggingConfigResponse, ModuleInfo, UpdateLogFilterRequest};
use crate::api::server::AppState;
use crate::logging::{LoggingConfig, available_modules};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/filter", get(get_filter).put(update_filter))
        .route("/modules", get(list_modules))
}

fn logging_config(state: &AppState) -> ApiResult<&Arc<LoggingConfig>> {
    state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Logging configuration not available"))
}

fn modules() -> Vec<ModuleInfo> {
    available_modules()
        .into_iter()
        .map(|(name, description)| ModuleInfo {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
}

fn response(config: &LoggingConfig) -> LoggingConfigResponse {
    LoggingConfigResponse {
        filter: config.get_filter(),
        available_modules: modules(),
    }
}

async fn list_modules() -> Json<Vec<ModuleInfo>> {
    Json(modules())
}

async fn get_filter(State(state): State<AppState>) -> ApiResult<Json<LoggingConfigResponse>> {
    Ok(Json(response(logging_config(&state)?)))
}

async fn update_filter(
    State(state): State<AppState>,
    Json(request): Json<UpdateLogFilterRequest>,
) -> ApiResult<Json<LoggingConfigResponse>> {
    let config = logging_config(&state)?;
    config.set_filter(&request.filter)?;
    Ok(Json(response(config)))
}
