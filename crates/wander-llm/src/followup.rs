//! Follow-up utterance parsing
//!
//! A follow-up either restarts the pipeline with a new query or refines the
//! stored result set with filter and sort deltas. The LLM path prompts for
//! strict JSON; the deterministic fallback implements the same distance,
//! price, feature and sort tables in code so refinement works with no
//! collaborator configured.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{prompts, TextCompletion};

static WITHIN_DISTANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"within\s+(\d+(?:\.\d+)?)\s*(miles?|mi\b|kilometers?|km\b)").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Score,
    Distance,
    Rating,
    Price,
}

/// Parsed follow-up: either a new search or a set of refinement deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowupIntent {
    #[serde(default)]
    pub is_new_search: bool,
    #[serde(default)]
    pub new_query: Option<String>,
    #[serde(default, alias = "adjust_radius")]
    pub adjust_radius_m: Option<u32>,
    #[serde(default)]
    pub price_min: Option<u8>,
    #[serde(default)]
    pub price_max: Option<u8>,
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub required_features: Vec<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub sort_by: Option<SortBy>,
}

/// Parses follow-up utterances into `FollowupIntent`.
pub struct FollowupParser {
    completion: Option<Arc<dyn TextCompletion>>,
}

impl FollowupParser {
    pub fn new(completion: Option<Arc<dyn TextCompletion>>) -> Self {
        Self { completion }
    }

    pub fn deterministic() -> Self {
        Self { completion: None }
    }

    pub async fn parse(
        &self,
        followup_text: &str,
        original_query: &str,
        current_radius_m: u32,
    ) -> FollowupIntent {
        if let Some(completion) = &self.completion {
            let prompt = prompts::followup_prompt(followup_text, original_query, current_radius_m);
            match completion
                .complete(
                    "You are a search refinement parser. Return only valid JSON.",
                    &prompt,
                )
                .await
            {
                Ok(raw) => match serde_json::from_str::<FollowupIntent>(&raw) {
                    Ok(intent) => return intent,
                    Err(error) => {
                        warn!(%error, "follow-up JSON parse failed, using deterministic parser");
                    }
                },
                Err(error) => {
                    warn!(%error, "follow-up completion failed, using deterministic parser");
                }
            }
        }

        parse_deterministic(followup_text, current_radius_m)
    }
}

/// Rule-based follow-up parsing, mirroring the tables in the LLM prompt.
pub fn parse_deterministic(followup_text: &str, current_radius_m: u32) -> FollowupIntent {
    let text = followup_text.to_lowercase();
    let mut intent = FollowupIntent::default();

    // Distance words, most specific first.
    if let Some(captures) = WITHIN_DISTANCE.captures(&text) {
        let amount: f64 = captures[1].parse().unwrap_or(0.0);
        let meters = if captures[2].starts_with("mi") {
            amount * 1609.0
        } else {
            amount * 1000.0
        };
        intent.adjust_radius_m = Some(meters.round() as u32);
    } else if text.contains("closer") {
        intent.adjust_radius_m = Some(current_radius_m / 2);
    } else if text.contains("walking distance") {
        intent.adjust_radius_m = Some(800);
    } else if text.contains("nearby") {
        intent.adjust_radius_m = Some(1000);
    }

    // Price words.
    if ["cheap", "affordable", "budget", "inexpensive"]
        .iter()
        .any(|word| text.contains(word))
    {
        intent.price_min = Some(1);
        intent.price_max = Some(2);
    } else if ["moderate", "mid-range"].iter().any(|word| text.contains(word)) {
        intent.price_min = Some(2);
        intent.price_max = Some(3);
    } else if ["expensive", "fancy", "upscale"]
        .iter()
        .any(|word| text.contains(word))
    {
        intent.price_min = Some(3);
        intent.price_max = Some(4);
    }

    if text.contains("open now") {
        intent.open_now = Some(true);
    }

    if ["highly rated", "top rated", "best rated"]
        .iter()
        .any(|phrase| text.contains(phrase))
    {
        intent.min_rating = Some(4.0);
    }

    // Sort words.
    if text.contains("highest rated first") {
        intent.sort_by = Some(SortBy::Rating);
    } else if text.contains("closest first") || text.contains("nearest") {
        intent.sort_by = Some(SortBy::Distance);
    } else if text.contains("cheapest first") {
        intent.sort_by = Some(SortBy::Price);
    }

    // Feature words, per the prompt table.
    let feature_words: [(&str, &[&str]); 5] = [
        ("wifi", &["wifi", "internet"]),
        ("outdoor_seating", &["outdoor seating", "patio", "outside"]),
        ("parking", &["parking"]),
        ("family_friendly", &["family friendly", "family-friendly", "kids"]),
        ("pet_friendly", &["pet friendly", "pet-friendly", "dog friendly"]),
    ];
    for (feature, words) in feature_words {
        if words.iter().any(|word| text.contains(word)) {
            intent.required_features.push(feature.to_string());
        }
    }

    intent
}
