//! Yelp Fusion API client
//!
//! Paginates `/v3/businesses/search` in pages of 50 up to the requested
//! maximum. Yelp caps the search radius at 40 km; larger requests are
//! clamped rather than rejected.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use tracing::info;
use wander_common::geo::haversine_km;
use wander_common::{ProviderPlace, StructuredAmenities};

use crate::{send_with_retry, PlaceProvider, ProviderError, ProviderQuery};

const YELP_BASE_URL: &str = "https://api.yelp.com/v3";

/// Yelp caps radius at 40 000 meters.
const MAX_RADIUS_M: u32 = 40_000;

/// Yelp caps page size at 50 businesses.
const PAGE_LIMIT: usize = 50;

/// Yelp Fusion search client.
pub struct YelpClient {
    client: reqwest::Client,
    api_key: String,
    max_retries: u32,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl YelpClient {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64, max_retries: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(5).unwrap());

        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            max_retries,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl PlaceProvider for YelpClient {
    async fn search_nearby(
        &self,
        query: &ProviderQuery,
    ) -> Result<Vec<ProviderPlace>, ProviderError> {
        let mut places: Vec<ProviderPlace> = Vec::new();
        let mut offset = 0usize;

        while places.len() < query.max_results {
            self.rate_limiter.until_ready().await;

            let limit = PAGE_LIMIT.min(query.max_results - places.len());
            let mut params: Vec<(&str, String)> = vec![
                ("latitude", query.lat.to_string()),
                ("longitude", query.lng.to_string()),
                ("radius", query.radius_m.min(MAX_RADIUS_M).to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("sort_by", "best_match".to_string()),
            ];
            if let Some(term) = query.query.as_deref().filter(|t| !t.is_empty()) {
                params.push(("term", term.to_string()));
            }
            if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
                params.push(("categories", category.to_string()));
            }

            let builder = self
                .client
                .get(format!("{YELP_BASE_URL}/businesses/search"))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Accept", "application/json")
                .query(&params);

            let response = send_with_retry(builder, "yelp", self.max_retries).await?;
            let payload: SearchPayload = response
                .json()
                .await
                .map_err(|e| ProviderError::Parse(e.to_string()))?;

            let page_len = payload.businesses.len();
            if page_len == 0 {
                break;
            }

            places.extend(
                payload
                    .businesses
                    .into_iter()
                    .filter_map(|business| normalize_business(business, query.lat, query.lng)),
            );

            offset += page_len;
            if page_len < limit {
                break;
            }
        }

        places.truncate(query.max_results);
        info!(count = places.len(), "yelp search complete");
        Ok(places)
    }

    fn name(&self) -> &str {
        "yelp"
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    businesses: Vec<YelpBusiness>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YelpBusiness {
    id: Option<String>,
    name: Option<String>,
    coordinates: Option<Coordinates>,
    categories: Vec<YelpCategory>,
    location: Option<YelpLocation>,
    price: Option<String>,
    rating: Option<f64>,
    review_count: Option<u64>,
    phone: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Coordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YelpCategory {
    alias: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YelpLocation {
    address1: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
}

fn map_price_level(price: &str) -> Option<u8> {
    match price {
        "$" => Some(1),
        "$$" => Some(2),
        "$$$" => Some(3),
        "$$$$" => Some(4),
        _ => None,
    }
}

fn build_address(location: Option<YelpLocation>) -> Option<String> {
    let location = location?;
    let parts: Vec<String> = [
        location.address1,
        location.city,
        location.state,
        location.zip_code,
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Normalize one business. Records without coordinates or a name are dropped.
fn normalize_business(
    business: YelpBusiness,
    origin_lat: f64,
    origin_lng: f64,
) -> Option<ProviderPlace> {
    let id = business.id.filter(|id| !id.is_empty())?;
    let name = business.name.filter(|n| !n.is_empty())?;
    let coordinates = business.coordinates?;
    let (lat, lng) = (coordinates.latitude?, coordinates.longitude?);

    let types: Vec<String> = business
        .categories
        .iter()
        .filter_map(|category| category.alias.clone())
        .collect();

    // Yelp has no structured amenity payload on the search endpoint.
    let amenities = StructuredAmenities::default();

    Some(ProviderPlace {
        provider: "yelp".to_string(),
        provider_id: id,
        name,
        category: types.first().cloned(),
        lat,
        lng,
        rating: business.rating,
        user_rating_count: business.review_count,
        price_level: business.price.as_deref().and_then(map_price_level),
        phone: business.phone.filter(|p| !p.is_empty()),
        website: business.url.clone(),
        maps_url: business.url,
        address: build_address(business.location),
        distance_km: Some(haversine_km(origin_lat, origin_lng, lat, lng)),
        types,
        amenities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_business() -> serde_json::Value {
        json!({
            "id": "blue-bottle-sf",
            "name": "Blue Bottle Coffee",
            "coordinates": { "latitude": 37.7750, "longitude": -122.4195 },
            "categories": [
                { "alias": "coffee", "title": "Coffee & Tea" },
                { "alias": "cafes", "title": "Cafes" }
            ],
            "location": {
                "address1": "66 Mint St",
                "city": "San Francisco",
                "state": "CA",
                "zip_code": "94103"
            },
            "price": "$$",
            "rating": 4.3,
            "review_count": 820,
            "phone": "+14151234567",
            "url": "https://www.yelp.com/biz/blue-bottle-sf"
        })
    }

    #[test]
    fn normalizes_full_business() {
        let wire: YelpBusiness = serde_json::from_value(sample_business()).unwrap();
        let place = normalize_business(wire, 37.7700, -122.4100).unwrap();

        assert_eq!(place.provider, "yelp");
        assert_eq!(place.provider_id, "blue-bottle-sf");
        assert_eq!(place.category.as_deref(), Some("coffee"));
        assert_eq!(place.types, vec!["coffee", "cafes"]);
        assert_eq!(place.price_level, Some(2));
        assert_eq!(
            place.address.as_deref(),
            Some("66 Mint St, San Francisco, CA, 94103")
        );
        assert!(place.distance_km.unwrap() > 0.0);
    }

    #[test]
    fn drops_business_without_coordinates() {
        let mut raw = sample_business();
        raw["coordinates"] = json!({ "latitude": null, "longitude": null });
        let wire: YelpBusiness = serde_json::from_value(raw).unwrap();

        assert!(normalize_business(wire, 37.77, -122.41).is_none());
    }

    #[test]
    fn drops_business_without_name() {
        let mut raw = sample_business();
        raw.as_object_mut().unwrap().remove("name");
        let wire: YelpBusiness = serde_json::from_value(raw).unwrap();

        assert!(normalize_business(wire, 37.77, -122.41).is_none());
    }

    #[test]
    fn price_mapping() {
        assert_eq!(map_price_level("$"), Some(1));
        assert_eq!(map_price_level("$$$$"), Some(4));
        assert_eq!(map_price_level(""), None);
    }

    #[test]
    fn address_built_from_parts() {
        let location: YelpLocation = serde_json::from_value(json!({
            "address1": "1 Market St",
            "city": "San Francisco",
            "state": "",
            "zip_code": null
        }))
        .unwrap();

        assert_eq!(
            build_address(Some(location)).as_deref(),
            Some("1 Market St, San Francisco")
        );
        assert_eq!(build_address(None), None);
    }

    #[tokio::test]
    #[ignore] // Requires network and YELP_API_KEY.
    async fn live_search() {
        let api_key = std::env::var("YELP_API_KEY").unwrap();
        let client = YelpClient::new(api_key, 10, 3);
        let query = ProviderQuery::nearby(37.7749, -122.4194, 3000).with_query("coffee");

        let places = client.search_nearby(&query).await.unwrap();
        assert!(!places.is_empty());
    }
}
