//! Place detail lookup
//!
//! A place id is only addressable through the result set that produced it;
//! both expire together with the session TTL.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use wander_common::Place;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/places/:place_id", get(place_detail))
}

#[derive(Debug, Deserialize)]
pub struct PlaceDetailParams {
    pub result_set_id: String,
}

/// Fetch one place from a live result set; 404 once the set has expired or
/// the id is not part of it.
pub async fn place_detail(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
    Query(params): Query<PlaceDetailParams>,
) -> ApiResult<Json<Place>> {
    let result_set = state
        .result_store
        .get_result_set(&params.result_set_id)
        .await?
        .ok_or_else(|| ApiError::not_found("result_set", &params.result_set_id))?;

    let place = result_set
        .places
        .into_iter()
        .find(|place| place.id.to_string() == place_id)
        .ok_or_else(|| ApiError::not_found("place", &place_id))?;

    Ok(Json(place))
}
