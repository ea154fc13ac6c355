//! User detail route.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::api::error::ApiResult;
use crate::api::models::ServerQuery;
use crate::api::server::AppState;
use crate::services::UserDetail;

pub fn router() -> Router<AppState> {
    Router::new().route("/{username}", get(user_detail))
}

async fn user_detail(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<ServerQuery>,
) -> ApiResult<Json<UserDetail>> {
    let detail = state
        .aggregation()?
        .user_detail(&username, query.selection()?)
        .await?;
    Ok(Json(detail))
}
