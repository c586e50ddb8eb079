//! Amenity vocabulary
//!
//! Maps loose amenity wording to a canonical feature key and renders a
//! place's textual surface (name, category, address, editorial summary,
//! structured amenities as text) for alias matching. Must-have checks and
//! the keyword matcher both search this surface.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use wander_common::ProviderPlace;

/// Canonical feature -> accepted aliases. Order is presentation order.
pub static AMENITY_MAP: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        // Family features
        (
            "changing_station",
            vec!["changing_station", "changing table", "baby changing", "diaper changing"],
        ),
        (
            "stroller_parking",
            vec!["stroller_parking", "stroller friendly", "pram parking"],
        ),
        (
            "playground",
            vec!["playground", "play area", "kids play", "children playground"],
        ),
        (
            "family_friendly",
            vec!["family_friendly", "family friendly", "kid friendly", "kids welcome", "good for children"],
        ),
        // Cinema features
        ("recliners", vec!["recliners", "recliner seats", "luxury seating"]),
        ("dolby", vec!["dolby", "dolby atmos", "dolby cinema"]),
        // Outdoor features
        ("shade", vec!["shade", "shaded area", "covered seating", "umbrella"]),
        (
            "outdoor_seating",
            vec!["outdoor_seating", "outdoor seating", "patio", "terrace", "outdoor dining", "garden seating"],
        ),
        // Connectivity
        ("wifi", vec!["wifi", "wi-fi", "wireless", "internet", "free wifi"]),
        // Accessibility
        (
            "wheelchair_accessible",
            vec!["wheelchair_accessible", "wheelchair accessible", "accessible", "ada compliant"],
        ),
        // Parking
        ("parking", vec!["parking", "parking lot", "valet parking", "free parking"]),
        // Pets
        (
            "pet_friendly",
            vec!["pet_friendly", "pet friendly", "dog friendly", "pets allowed", "allows dogs"],
        ),
        // Food options
        ("vegetarian", vec!["vegetarian", "veggie options", "vegetarian friendly"]),
        ("vegan", vec!["vegan", "vegan options", "plant based"]),
        ("gluten_free", vec!["gluten_free", "gluten free", "gf options"]),
        // Service
        ("takeout", vec!["takeout", "take out", "to go"]),
        ("delivery", vec!["delivery", "food delivery"]),
        ("reservations", vec!["reservations", "booking", "table booking", "reservable"]),
        // Atmosphere
        ("quiet", vec!["quiet", "peaceful", "calm", "relaxing"]),
        ("live_music", vec!["live_music", "live music", "entertainment"]),
    ]
});

static ALIAS_TO_FEATURE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (feature, aliases) in AMENITY_MAP.iter() {
        for alias in aliases {
            map.insert(*alias, *feature);
        }
    }
    map
});

/// Normalize amenity wording to its canonical feature key. Unknown terms
/// become their own snake_cased key.
pub fn normalize_amenity(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    match ALIAS_TO_FEATURE.get(lowered.as_str()) {
        Some(feature) => (*feature).to_string(),
        None => lowered.replace(' ', "_"),
    }
}

/// "outdoor_seating" -> "Outdoor Seating"
pub fn feature_display_name(feature: &str) -> String {
    feature
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

/// Lowercased concatenation of everything textual about a place: name,
/// category, address, type tags, editorial summary, structured amenities
/// rendered as words, and true parking/payment option names.
pub fn place_text(place: &ProviderPlace) -> String {
    let mut parts: Vec<String> = vec![place.name.to_lowercase()];

    if let Some(category) = &place.category {
        parts.push(category.to_lowercase());
    }
    if let Some(address) = &place.address {
        parts.push(address.to_lowercase());
    }
    for tag in &place.types {
        parts.push(tag.to_lowercase().replace('_', " "));
    }
    if let Some(summary) = &place.amenities.editorial_summary {
        parts.push(summary.to_lowercase());
    }
    for flag in place.amenities.true_flags() {
        parts.push(flag.replace('_', " "));
    }
    for (option, enabled) in &place.amenities.parking {
        if *enabled {
            parts.push(option.replace('_', " "));
        }
    }
    for (option, enabled) in &place.amenities.payment {
        if *enabled {
            parts.push(option.replace('_', " "));
        }
    }

    parts.join(" ")
}

/// Does any textual field of the place mention an alias of this amenity?
pub fn place_mentions_amenity(place: &ProviderPlace, amenity: &str) -> bool {
    let feature = normalize_amenity(amenity);
    let text = place_text(place);

    let aliases: Vec<String> = AMENITY_MAP
        .iter()
        .find(|(key, _)| *key == feature)
        .map(|(_, aliases)| aliases.iter().map(|a| a.replace('_', " ")).collect())
        .unwrap_or_else(|| vec![feature.replace('_', " ")]);

    aliases.iter().any(|alias| text.contains(alias.as_str()))
}

/// Check a candidate against required amenities.
///
/// Returns whether every must-have is satisfied, plus the satisfied subset
/// in input order.
pub fn check_must_haves(place: &ProviderPlace, must_haves: &[String]) -> (bool, Vec<String>) {
    let matched: Vec<String> = must_haves
        .iter()
        .filter(|must_have| place_mentions_amenity(place, must_have))
        .cloned()
        .collect();

    (matched.len() == must_haves.len(), matched)
}

/// Canonical features whose aliases appear anywhere on the place, in
/// vocabulary order. Surfaced as `Place.features`.
pub fn extract_features(place: &ProviderPlace) -> Vec<String> {
    let text = place_text(place);

    AMENITY_MAP
        .iter()
        .filter(|(_, aliases)| {
            aliases
                .iter()
                .any(|alias| text.contains(alias.replace('_', " ").as_str()))
        })
        .map(|(feature, _)| (*feature).to_string())
        .collect()
}
