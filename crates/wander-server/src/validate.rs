//! Request validation
//!
//! Range and shape checks run before any pipeline work; the first
//! violation is returned as a 422 problem detail.

use wander_common::{Intent, SearchRequest};

const MIN_RADIUS_M: u32 = 100;
const MIN_TOP_K: usize = 1;
const MAX_TOP_K: usize = 100;

/// Validate a search request against the documented constraints.
pub fn validate_search_request(request: &SearchRequest, max_radius_m: u32) -> Result<(), String> {
    if !(-90.0..=90.0).contains(&request.lat) {
        return Err(format!("lat must be within [-90, 90], got {}", request.lat));
    }
    if !(-180.0..=180.0).contains(&request.lng) {
        return Err(format!("lng must be within [-180, 180], got {}", request.lng));
    }
    if request.radius_m < MIN_RADIUS_M || request.radius_m > max_radius_m {
        return Err(format!(
            "radius_m must be within [{MIN_RADIUS_M}, {max_radius_m}], got {}",
            request.radius_m
        ));
    }
    if request.top_k < MIN_TOP_K || request.top_k > MAX_TOP_K {
        return Err(format!(
            "top_k must be within [{MIN_TOP_K}, {MAX_TOP_K}], got {}",
            request.top_k
        ));
    }

    if let Some((min, max)) = request.filters.as_ref().and_then(|f| f.price) {
        if max > 4 {
            return Err(format!("price levels must be within [0, 4], got {max}"));
        }
        if min > max {
            return Err(format!("price range is inverted: [{min}, {max}]"));
        }
    }

    if let Some(multi_entity) = &request.multi_entity {
        let intent = Intent::MultiEntity {
            entities: multi_entity.entities.clone(),
            relations: multi_entity.relations.clone(),
        };
        intent.validate()?;
    }

    Ok(())
}
