//! Intent parsing and requirement extraction
//!
//! Two modes, per the pipeline contract:
//! - *Deterministic*: the query passes through as a simple intent and no
//!   requirements are extracted. Used when no completion collaborator is
//!   configured and as the fallback for every LLM failure.
//! - *LLM-assisted*: the completion collaborator is prompted for strict
//!   JSON; parse failures and call errors degrade to deterministic mode.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};
use wander_common::{Intent, Requirement};

use crate::{prompts, TextCompletion};

/// Distance and proximity words that must never become requirement keywords.
const DISTANCE_STOPWORDS: [&str; 8] = [
    "nearby",
    "close",
    "closest",
    "near",
    "walking distance",
    "within",
    "around",
    "local",
];

/// Generic place nouns that carry no requirement signal.
const GENERIC_PLACE_NOUNS: [&str; 9] = [
    "restaurant",
    "food",
    "cafe",
    "bar",
    "place",
    "spot",
    "venue",
    "shop",
    "store",
];

#[derive(Debug, Deserialize)]
struct RequirementsPayload {
    #[serde(default)]
    normalized_requirements: Vec<Requirement>,
}

/// Turns a query string into a structured intent and ranked requirements.
pub struct IntentExtractor {
    completion: Option<Arc<dyn TextCompletion>>,
}

impl IntentExtractor {
    pub fn new(completion: Option<Arc<dyn TextCompletion>>) -> Self {
        Self { completion }
    }

    /// Extractor with no collaborator; always deterministic.
    pub fn deterministic() -> Self {
        Self { completion: None }
    }

    /// Parse a query into a structured intent. Never fails: every error
    /// path degrades to `Simple { query, category: None }`.
    pub async fn parse(&self, query: &str) -> Intent {
        let Some(completion) = &self.completion else {
            return Intent::simple(query);
        };

        let user = format!("{}\n\nQuery: {query}", prompts::PARSE_INTENT_EXAMPLES);
        let raw = match completion.complete(prompts::PARSE_INTENT_SYSTEM, &user).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "intent completion failed, using deterministic parse");
                return Intent::simple(query);
            }
        };

        match serde_json::from_str::<Intent>(&raw) {
            Ok(intent) if intent.validate().is_ok() => intent,
            Ok(intent) => {
                warn!(?intent, "parsed intent failed validation, using deterministic parse");
                Intent::simple(query)
            }
            Err(error) => {
                warn!(%error, "intent JSON parse failed, using deterministic parse");
                Intent::simple(query)
            }
        }
    }

    /// Extract ranked requirements from a query. Deterministic mode and all
    /// failure paths return an empty list; extraction never blocks a search.
    pub async fn extract_requirements(&self, query: &str) -> Vec<Requirement> {
        let trimmed = query.trim();
        if trimmed.len() < 3 {
            return Vec::new();
        }
        if GENERIC_PLACE_NOUNS.contains(&trimmed.to_lowercase().as_str()) {
            return Vec::new();
        }

        let Some(completion) = &self.completion else {
            return Vec::new();
        };

        let user = format!("Query: {trimmed}");
        let raw = match completion
            .complete(prompts::REQUIREMENT_EXTRACTION_SYSTEM, &user)
            .await
        {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "requirement extraction failed");
                return Vec::new();
            }
        };

        let payload: RequirementsPayload = match serde_json::from_str(&raw) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%error, "requirement JSON parse failed");
                return Vec::new();
            }
        };

        let requirements = sanitize_requirements(payload.normalized_requirements);
        debug!(count = requirements.len(), "requirements extracted");
        requirements
    }
}

/// Lowercase keywords, strip distance words and generic place nouns, and
/// drop requirements whose keyword set ends up empty.
fn sanitize_requirements(requirements: Vec<Requirement>) -> Vec<Requirement> {
    requirements
        .into_iter()
        .filter_map(|mut requirement| {
            requirement.keywords = requirement
                .keywords
                .iter()
                .map(|keyword| keyword.trim().to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .filter(|keyword| !DISTANCE_STOPWORDS.contains(&keyword.as_str()))
                .filter(|keyword| !GENERIC_PLACE_NOUNS.contains(&keyword.as_str()))
                .collect();

            if requirement.keywords.is_empty() {
                None
            } else {
                Some(requirement)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCompletion;
    use wander_common::{Importance, RequirementCategory};

    #[tokio::test]
    async fn deterministic_mode_passes_query_through() {
        let extractor = IntentExtractor::deterministic();

        let intent = extractor.parse("coffee with wifi").await;
        assert_eq!(intent, Intent::simple("coffee with wifi"));

        let requirements = extractor.extract_requirements("coffee with wifi").await;
        assert!(requirements.is_empty());
    }

    #[tokio::test]
    async fn parses_multi_entity_intent_from_llm() {
        let response = r#"{
            "type": "multi_entity",
            "entities": [
                {"kind": "restaurant", "must_haves": ["family_friendly"]},
                {"kind": "park", "must_haves": ["playground"]}
            ],
            "relations": [
                {"left": 0, "right": 1, "relation": "NEAR", "distance_m": 500}
            ]
        }"#;
        let extractor = IntentExtractor::new(Some(MockCompletion::new(response)));

        let intent = extractor
            .parse("family restaurant near a park with playground")
            .await;

        match intent {
            Intent::MultiEntity { entities, .. } => assert_eq!(entities.len(), 2),
            Intent::Simple { .. } => panic!("expected multi-entity intent"),
        }
    }

    #[tokio::test]
    async fn invalid_json_falls_back_to_simple() {
        let extractor = IntentExtractor::new(Some(MockCompletion::new("not json at all")));

        let intent = extractor.parse("coffee").await;
        assert_eq!(intent, Intent::simple("coffee"));
    }

    #[tokio::test]
    async fn invalid_relation_index_falls_back_to_simple() {
        let response = r#"{
            "type": "multi_entity",
            "entities": [{"kind": "restaurant", "must_haves": []}],
            "relations": [{"left": 0, "right": 3, "relation": "NEAR"}]
        }"#;
        let extractor = IntentExtractor::new(Some(MockCompletion::new(response)));

        let intent = extractor.parse("restaurant near a park").await;
        assert_eq!(intent, Intent::simple("restaurant near a park"));
    }

    #[tokio::test]
    async fn completion_error_falls_back() {
        let extractor = IntentExtractor::new(Some(MockCompletion::failing()));

        let intent = extractor.parse("coffee").await;
        assert_eq!(intent, Intent::simple("coffee"));
        assert!(extractor.extract_requirements("coffee with wifi").await.is_empty());
    }

    #[tokio::test]
    async fn requirements_parsed_and_lowercased() {
        let response = r#"{
            "normalized_requirements": [
                {
                    "requirement": "WiFi",
                    "category": "feature",
                    "keywords": ["WiFi", "Internet", "wireless"],
                    "importance": "high"
                }
            ]
        }"#;
        let extractor = IntentExtractor::new(Some(MockCompletion::new(response)));

        let requirements = extractor.extract_requirements("coffee with wifi").await;

        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].name, "WiFi");
        assert_eq!(requirements[0].category, RequirementCategory::Feature);
        assert_eq!(requirements[0].importance, Importance::High);
        assert_eq!(requirements[0].keywords, vec!["wifi", "internet", "wireless"]);
    }

    #[tokio::test]
    async fn distance_words_are_rejected() {
        let response = r#"{
            "normalized_requirements": [
                {
                    "requirement": "Proximity",
                    "category": "quality",
                    "keywords": ["nearby", "close", "walking distance"],
                    "importance": "high"
                },
                {
                    "requirement": "Outdoor Seating",
                    "category": "feature",
                    "keywords": ["patio", "nearby", "outdoor"],
                    "importance": "medium"
                }
            ]
        }"#;
        let extractor = IntentExtractor::new(Some(MockCompletion::new(response)));

        let requirements = extractor.extract_requirements("patio spot nearby").await;

        // Proximity loses every keyword and is dropped entirely.
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].name, "Outdoor Seating");
        assert_eq!(requirements[0].keywords, vec!["patio", "outdoor"]);
    }

    #[tokio::test]
    async fn generic_queries_short_circuit() {
        let extractor = IntentExtractor::new(Some(MockCompletion::new("{}")));

        assert!(extractor.extract_requirements("restaurant").await.is_empty());
        assert!(extractor.extract_requirements("ok").await.is_empty());
    }
}
