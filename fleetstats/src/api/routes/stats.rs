//! Statistics routes.
//!
//! `GET /` returns every category at once; `GET /{category}` a single one.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::WindowQuery;
use crate::api::server::AppState;
use crate::services::{CategoryStats, StatsOverview, StatsQuery};
use crate::stats::StatCategory;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stats_overview))
        .route("/{category}", get(category_stats))
}

fn stats_query(query: &WindowQuery) -> ApiResult<StatsQuery> {
    Ok(StatsQuery {
        days: query.days(),
        selection: query.selection()?,
        mode: query.mode()?,
    })
}

async fn stats_overview(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<StatsOverview>> {
    let overview = state.aggregation()?.stats_overview(stats_query(&query)?).await?;
    Ok(Json(overview))
}

async fn category_stats(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<CategoryStats>> {
    let category: StatCategory = category.parse().map_err(|_| {
        let valid: Vec<String> = StatCategory::ALL.iter().map(ToString::to_string).collect();
        ApiError::bad_request(format!("Unknown statistic category '{category}'"))
            .with_details(serde_json::json!({ "valid": valid }))
    })?;
    let stats = state
        .aggregation()?
        .category_stats(stats_query(&query)?, category)
        .await?;
    Ok(Json(stats))
}
