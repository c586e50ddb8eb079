//! Four-method requirement matching
//!
//! For each (place, requirement) pair the methods run in order and stop at
//! the first hit, with decreasing confidence:
//!
//! 1. structured amenity lookup (confidence 1.00)
//! 2. keyword substring over the place's textual surface (0.80)
//! 3. embedding similarity against name/category/address/summary (0.75-1.00)
//! 4. editorial mention with a 60-char evidence window (0.70)
//!
//! Methods 3 and 4 need the embedding collaborator; without it the chain
//! degrades to methods 1-2 and the pipeline continues.

use tracing::debug;
use wander_common::{MatchMethod, MatchedRequirement, ProviderPlace, Requirement};
use wander_llm::{cosine_similarity, Embedder};

use crate::amenities::place_text;

const STRUCTURED_CONFIDENCE: f64 = 1.0;
const KEYWORD_CONFIDENCE: f64 = 0.8;
const EDITORIAL_CONFIDENCE: f64 = 0.7;

/// Points granted per matched requirement, scaled by confidence.
pub const REQUIREMENT_BONUS_POINTS: f64 = 10.0;

/// Pseudo-fields resolved against the amenity sub-maps.
const PARKING_FIELD: &str = "~parking";
const PAYMENT_FIELD: &str = "~payment";

/// keyword fragment -> structured amenity field. A requirement keyword
/// containing the fragment resolves to the field.
const KEYWORD_FIELD_TABLE: [(&str, &str); 29] = [
    ("wifi", "wifi"),
    ("wi-fi", "wifi"),
    ("wireless", "wifi"),
    ("outdoor", "outdoor_seating"),
    ("patio", "outdoor_seating"),
    ("terrace", "outdoor_seating"),
    ("pet", "allows_dogs"),
    ("dog", "allows_dogs"),
    ("family", "good_for_children"),
    ("kid", "good_for_children"),
    ("children", "good_for_children"),
    ("group", "good_for_groups"),
    ("vegetarian", "serves_vegetarian_food"),
    ("vegan", "serves_vegetarian_food"),
    ("takeout", "takeout"),
    ("take out", "takeout"),
    ("delivery", "delivery"),
    ("reservation", "reservable"),
    ("wheelchair", "wheelchair_accessible"),
    ("accessible", "wheelchair_accessible"),
    ("beer", "serves_beer"),
    ("wine", "serves_wine"),
    ("breakfast", "serves_breakfast"),
    ("brunch", "serves_brunch"),
    ("lunch", "serves_lunch"),
    ("dinner", "serves_dinner"),
    ("parking", PARKING_FIELD),
    ("valet", PARKING_FIELD),
    ("card", PAYMENT_FIELD),
];

struct MethodMatch {
    method: MatchMethod,
    confidence: f64,
    evidence: String,
}

/// Method 1: structured amenity data.
fn structured_match(requirement: &Requirement, place: &ProviderPlace) -> Option<MethodMatch> {
    for keyword in &requirement.keywords {
        for (fragment, field) in KEYWORD_FIELD_TABLE {
            if !keyword.contains(fragment) {
                continue;
            }

            let hit = match field {
                PARKING_FIELD => place.amenities.has_parking(),
                PAYMENT_FIELD => place.amenities.has_payment(),
                _ => place.amenities.flag(field) == Some(true),
            };

            if hit {
                let field_name = match field {
                    PARKING_FIELD => "parking",
                    PAYMENT_FIELD => "payment",
                    other => other,
                };
                return Some(MethodMatch {
                    method: MatchMethod::Structured,
                    confidence: STRUCTURED_CONFIDENCE,
                    evidence: format!("structured amenity '{field_name}' is available"),
                });
            }
        }
    }
    None
}

/// Method 2: keyword substring over the full textual surface.
fn keyword_match(requirement: &Requirement, place: &ProviderPlace) -> Option<MethodMatch> {
    let haystack = place_text(place);

    requirement
        .keywords
        .iter()
        .find(|keyword| haystack.contains(keyword.as_str()))
        .map(|keyword| MethodMatch {
            method: MatchMethod::Keyword,
            confidence: KEYWORD_CONFIDENCE,
            evidence: format!("found '{keyword}' in place details"),
        })
}

/// Method 3: embedding similarity between the requirement name and the
/// place's descriptive fields.
async fn semantic_match(
    requirement: &Requirement,
    place: &ProviderPlace,
    embedder: &dyn Embedder,
    threshold: f64,
) -> Option<MethodMatch> {
    let query_embedding = match embedder.embed(&requirement.name).await {
        Ok(embedding) => embedding,
        Err(error) => {
            debug!(%error, "requirement embedding failed, skipping semantic match");
            return None;
        }
    };

    let mut candidates: Vec<&str> = vec![place.name.as_str()];
    if let Some(category) = place.category.as_deref() {
        candidates.push(category);
    }
    if let Some(address) = place.address.as_deref() {
        candidates.push(address);
    }
    if let Some(summary) = place.amenities.editorial_summary.as_deref() {
        candidates.push(summary);
    }

    let mut best: Option<(f64, &str)> = None;
    for text in candidates {
        if text.is_empty() {
            continue;
        }
        let embedding = match embedder.embed(text).await {
            Ok(embedding) => embedding,
            Err(error) => {
                debug!(%error, "place text embedding failed");
                continue;
            }
        };

        let similarity = cosine_similarity(&query_embedding, &embedding);
        if similarity >= threshold && best.map_or(true, |(prev, _)| similarity > prev) {
            best = Some((similarity, text));
        }
    }

    best.map(|(similarity, text)| {
        let snippet: String = text.chars().take(60).collect();
        MethodMatch {
            method: MatchMethod::Semantic,
            confidence: similarity.min(1.0),
            evidence: format!("semantically similar to \"{snippet}\" ({similarity:.2})"),
        }
    })
}

/// Method 4: mention of the requirement in the editorial summary, with a
/// 60-char window around the hit as evidence.
fn editorial_match(requirement: &Requirement, place: &ProviderPlace) -> Option<MethodMatch> {
    let summary = place.amenities.editorial_summary.as_deref()?;
    let summary_lower = summary.to_lowercase();

    let mut needles: Vec<String> = vec![requirement.name.to_lowercase()];
    needles.extend(requirement.keywords.iter().cloned());

    for needle in needles {
        if needle.is_empty() {
            continue;
        }
        if let Some(index) = summary_lower.find(&needle) {
            let mut start = index.saturating_sub(30);
            let mut end = (index + needle.len() + 30).min(summary_lower.len());
            while start > 0 && !summary_lower.is_char_boundary(start) {
                start -= 1;
            }
            while end < summary_lower.len() && !summary_lower.is_char_boundary(end) {
                end += 1;
            }

            return Some(MethodMatch {
                method: MatchMethod::Editorial,
                confidence: EDITORIAL_CONFIDENCE,
                evidence: format!("editorial mention: \"...{}...\"", &summary_lower[start..end]),
            });
        }
    }
    None
}

/// Run the method chain for one (place, requirement) pair.
///
/// Exactly one method is recorded; `bonus_points = 10 x confidence` iff
/// matched, else 0.
pub async fn match_requirement(
    requirement: &Requirement,
    place: &ProviderPlace,
    embedder: Option<&dyn Embedder>,
    semantic_threshold: f64,
) -> MatchedRequirement {
    let mut outcome = structured_match(requirement, place)
        .or_else(|| keyword_match(requirement, place));

    if outcome.is_none() {
        if let Some(embedder) = embedder {
            outcome = semantic_match(requirement, place, embedder, semantic_threshold).await;
            if outcome.is_none() {
                outcome = editorial_match(requirement, place);
            }
        }
    }

    match outcome {
        Some(hit) => MatchedRequirement {
            requirement: requirement.name.clone(),
            matched: true,
            method: hit.method,
            confidence: hit.confidence,
            bonus_points: REQUIREMENT_BONUS_POINTS * hit.confidence,
            evidence: Some(hit.evidence),
        },
        None => MatchedRequirement {
            requirement: requirement.name.clone(),
            matched: false,
            method: MatchMethod::None,
            confidence: 0.0,
            bonus_points: 0.0,
            evidence: None,
        },
    }
}
