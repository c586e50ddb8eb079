//! Google Places API v1 client
//!
//! Uses `places:searchText` when the plan carries a text query and
//! `places:searchNearby` otherwise. The field mask requests the amenity
//! booleans that feed `StructuredAmenities`; nothing outside the mask is
//! ever parsed, and raw payloads are not kept past conversion.

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use wander_common::geo::haversine_km;
use wander_common::{ProviderPlace, StructuredAmenities};

use crate::{send_with_retry, PlaceProvider, ProviderError, ProviderQuery};

const GOOGLE_PLACES_BASE: &str = "https://places.googleapis.com/v1";

/// Google caps nearby/text search pages at 20 results.
const MAX_RESULTS_PER_PAGE: usize = 20;

const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.location,places.rating,places.userRatingCount,\
places.priceLevel,places.primaryType,places.types,\
places.nationalPhoneNumber,places.websiteUri,places.googleMapsUri,\
places.editorialSummary,\
places.goodForChildren,places.goodForGroups,\
places.outdoorSeating,places.reservable,\
places.allowsDogs,places.servesBeer,places.servesBreakfast,\
places.servesBrunch,places.servesDinner,places.servesLunch,\
places.servesVegetarianFood,places.servesWine,\
places.takeout,places.delivery,places.dineIn,\
places.accessibilityOptions,places.parkingOptions,places.paymentOptions";

/// Google Places v1 search client.
pub struct GooglePlacesClient {
    client: reqwest::Client,
    api_key: String,
    max_retries: u32,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl GooglePlacesClient {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64, max_retries: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(10).unwrap());

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

    fn request_body(&self, query: &ProviderQuery) -> (String, serde_json::Value) {
        let circle = json!({
            "circle": {
                "center": { "latitude": query.lat, "longitude": query.lng },
                "radius": query.radius_m as f64,
            }
        });
        let max_result_count = query.max_results.min(MAX_RESULTS_PER_PAGE);

        if let Some(text) = query.query.as_deref().filter(|t| !t.is_empty()) {
            let url = format!("{GOOGLE_PLACES_BASE}/places:searchText");
            let body = json!({
                "textQuery": text,
                "locationBias": circle,
                "maxResultCount": max_result_count,
            });
            (url, body)
        } else {
            let url = format!("{GOOGLE_PLACES_BASE}/places:searchNearby");
            let mut body = json!({
                "locationRestriction": circle,
                "maxResultCount": max_result_count,
            });
            if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
                body["includedTypes"] = json!([category]);
            }
            (url, body)
        }
    }
}

#[async_trait]
impl PlaceProvider for GooglePlacesClient {
    async fn search_nearby(
        &self,
        query: &ProviderQuery,
    ) -> Result<Vec<ProviderPlace>, ProviderError> {
        self.rate_limiter.until_ready().await;

        let (url, body) = self.request_body(query);
        debug!(url, query = ?query.query, "google places request");

        let builder = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body);

        let response = send_with_retry(builder, "google", self.max_retries).await?;
        let payload: SearchPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let places: Vec<ProviderPlace> = payload
            .places
            .into_iter()
            .filter_map(|place| convert_place(place, query.lat, query.lng))
            .collect();

        info!(count = places.len(), "google search complete");
        Ok(places)
    }

    fn name(&self) -> &str {
        "google"
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    places: Vec<GooglePlace>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GooglePlace {
    id: Option<String>,
    display_name: Option<LocalizedText>,
    formatted_address: Option<String>,
    location: Option<LatLng>,
    rating: Option<f64>,
    user_rating_count: Option<u64>,
    price_level: Option<String>,
    primary_type: Option<String>,
    types: Vec<String>,
    national_phone_number: Option<String>,
    website_uri: Option<String>,
    google_maps_uri: Option<String>,
    editorial_summary: Option<LocalizedText>,
    outdoor_seating: Option<bool>,
    good_for_children: Option<bool>,
    good_for_groups: Option<bool>,
    allows_dogs: Option<bool>,
    reservable: Option<bool>,
    serves_beer: Option<bool>,
    serves_breakfast: Option<bool>,
    serves_brunch: Option<bool>,
    serves_dinner: Option<bool>,
    serves_lunch: Option<bool>,
    serves_vegetarian_food: Option<bool>,
    serves_wine: Option<bool>,
    takeout: Option<bool>,
    delivery: Option<bool>,
    dine_in: Option<bool>,
    accessibility_options: Option<AccessibilityOptions>,
    parking_options: Option<BTreeMap<String, serde_json::Value>>,
    payment_options: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct LocalizedText {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AccessibilityOptions {
    wheelchair_accessible_entrance: Option<bool>,
}

fn map_price_level(level: &str) -> Option<u8> {
    match level {
        "PRICE_LEVEL_FREE" => Some(0),
        "PRICE_LEVEL_INEXPENSIVE" => Some(1),
        "PRICE_LEVEL_MODERATE" => Some(2),
        "PRICE_LEVEL_EXPENSIVE" => Some(3),
        "PRICE_LEVEL_VERY_EXPENSIVE" => Some(4),
        _ => None,
    }
}

/// "movie_theater" -> "Movie Theater"
fn title_case_category(primary_type: &str) -> String {
    primary_type
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_uppercase() {
            out.push('_');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Keep only boolean entries of an upstream option map, snake-cased.
fn bool_options(options: Option<BTreeMap<String, serde_json::Value>>) -> BTreeMap<String, bool> {
    options
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.as_bool().map(|flag| (camel_to_snake(&key), flag)))
        .collect()
}

/// Convert one upstream place. Records without an id, display name or
/// coordinates are dropped.
fn convert_place(place: GooglePlace, origin_lat: f64, origin_lng: f64) -> Option<ProviderPlace> {
    let id = place.id.filter(|id| !id.is_empty())?;
    let name = place.display_name.map(|n| n.text).filter(|n| !n.is_empty())?;
    let location = place.location?;
    let (lat, lng) = (location.latitude?, location.longitude?);

    let amenities = StructuredAmenities {
        outdoor_seating: place.outdoor_seating.unwrap_or(false),
        good_for_children: place.good_for_children.unwrap_or(false),
        good_for_groups: place.good_for_groups.unwrap_or(false),
        allows_dogs: place.allows_dogs.unwrap_or(false),
        reservable: place.reservable.unwrap_or(false),
        serves_beer: place.serves_beer.unwrap_or(false),
        serves_breakfast: place.serves_breakfast.unwrap_or(false),
        serves_brunch: place.serves_brunch.unwrap_or(false),
        serves_dinner: place.serves_dinner.unwrap_or(false),
        serves_lunch: place.serves_lunch.unwrap_or(false),
        serves_vegetarian_food: place.serves_vegetarian_food.unwrap_or(false),
        serves_wine: place.serves_wine.unwrap_or(false),
        takeout: place.takeout.unwrap_or(false),
        delivery: place.delivery.unwrap_or(false),
        dine_in: place.dine_in.unwrap_or(false),
        wheelchair_accessible: place
            .accessibility_options
            .and_then(|options| options.wheelchair_accessible_entrance)
            .unwrap_or(false),
        wifi: false,
        live_music: false,
        editorial_summary: place
            .editorial_summary
            .map(|summary| summary.text)
            .filter(|text| !text.is_empty()),
        parking: bool_options(place.parking_options),
        payment: bool_options(place.payment_options),
    };

    Some(ProviderPlace {
        provider: "google".to_string(),
        provider_id: id,
        name,
        category: place
            .primary_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(title_case_category),
        lat,
        lng,
        rating: place.rating,
        user_rating_count: place.user_rating_count,
        price_level: place.price_level.as_deref().and_then(map_price_level),
        phone: place.national_phone_number,
        website: place.website_uri,
        maps_url: place.google_maps_uri,
        address: place.formatted_address,
        distance_km: Some(haversine_km(origin_lat, origin_lng, lat, lng)),
        types: place.types,
        amenities,
    })
}
