//! Chart routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::api::error::ApiResult;
use crate::api::models::WindowQuery;
use crate::api::server::AppState;
use crate::services::PlaysByDateChart;

pub fn router() -> Router<AppState> {
    Router::new().route("/plays-by-date", get(plays_by_date))
}

async fn plays_by_date(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<PlaysByDateChart>> {
    let chart = state
        .aggregation()?
        .plays_by_date(query.days(), query.selection()?)
        .await?;
    Ok(Json(chart))
}
