//! Network status route.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::api::error::ApiResult;
use crate::api::models::ServerQuery;
use crate::api::server::AppState;
use crate::services::NetworkStatus;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(network_status))
}

async fn network_status(
    State(state): State<AppState>,
    Query(query): Query<ServerQuery>,
) -> ApiResult<Json<NetworkStatus>> {
    let status = state.aggregation()?.network_status(query.selection()?).await?;
    Ok(Json(status))
}
