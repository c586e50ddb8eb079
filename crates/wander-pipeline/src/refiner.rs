//! Follow-up refinement over a stored result set
//!
//! Filters apply in a fixed order (radius, price, rating, features), then
//! the sort, then truncation. The input order is the stored scoring order,
//! so `SortBy::Score` is a no-op re-sort. Applying the same intent twice
//! yields the same list.

use tracing::info;
use wander_common::Place;
use wander_fusion::amenities::normalize_amenity;
use wander_llm::{FollowupIntent, SortBy};

/// Apply filter and sort deltas to a previously stored result set.
pub fn apply_followup_filters(
    places: Vec<Place>,
    intent: &FollowupIntent,
    top_k: usize,
) -> Vec<Place> {
    let before = places.len();
    let mut filtered: Vec<Place> = places;

    if let Some(radius_m) = intent.adjust_radius_m {
        filtered.retain(|place| {
            place
                .distance_km
                .map(|km| km * 1000.0 <= radius_m as f64)
                .unwrap_or(true)
        });
    }

    if let (Some(min), Some(max)) = (intent.price_min, intent.price_max) {
        filtered.retain(|place| {
            place
                .price_level
                .map(|level| min <= level && level <= max)
                .unwrap_or(false)
        });
    }

    if let Some(min_rating) = intent.min_rating {
        filtered.retain(|place| place.rating.map(|r| r >= min_rating).unwrap_or(false));
    }

    if !intent.required_features.is_empty() {
        let required: Vec<String> = intent
            .required_features
            .iter()
            .map(|feature| normalize_amenity(feature))
            .collect();
        filtered.retain(|place| {
            required
                .iter()
                .all(|feature| place.features.contains(feature))
        });
    }

    match intent.sort_by.unwrap_or_default() {
        // The stored order is already score-descending.
        SortBy::Score => {}
        SortBy::Distance => filtered.sort_by(|a, b| {
            let da = a.distance_km.unwrap_or(f64::MAX);
            let db = b.distance_km.unwrap_or(f64::MAX);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortBy::Rating => filtered.sort_by(|a, b| {
            let ra = a.rating.unwrap_or(0.0);
            let rb = b.rating.unwrap_or(0.0);
            rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortBy::Price => filtered.sort_by_key(|place| place.price_level.unwrap_or(u8::MAX)),
    }

    filtered.truncate(top_k);

    info!(before, after = filtered.len(), "follow-up filters applied");
    filtered
}
