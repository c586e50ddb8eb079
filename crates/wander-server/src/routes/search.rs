//! Search endpoint

use axum::{extract::State, routing::post, Json, Router};
use tracing::info;
use wander_common::{SearchRequest, SearchResponse};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    validate::validate_search_request,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/search", post(search))
}

/// Search for places around a location, or refine a stored result set when
/// the request context marks a follow-up.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    validate_search_request(&request, state.settings.max_radius_m)
        .map_err(ApiError::validation)?;

    info!(
        query = request.query.as_deref().unwrap_or(""),
        follow_up = request
            .context
            .as_ref()
            .map(|context| context.follow_up)
            .unwrap_or(false),
        "search request received"
    );

    let response = state.service.search(request).await?;
    Ok(Json(response))
}
