//! Live session routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::api::error::ApiResult;
use crate::api::models::ServerQuery;
use crate::api::server::AppState;
use crate::services::LiveSessions;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(live_sessions))
}

async fn live_sessions(
    State(state): State<AppState>,
    Query(query): Query<ServerQuery>,
) -> ApiResult<Json<LiveSessions>> {
    let sessions = state.aggregation()?.live_sessions(query.selection()?).await?;
    Ok(Json(sessions))
}
