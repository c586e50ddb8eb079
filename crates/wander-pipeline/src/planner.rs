//! Provider call planning
//!
//! The baseline plan calls every configured provider, routing a text query
//! when the intent carries one and a category-filtered nearby search
//! otherwise. An LLM plan can replace the baseline; any failure or
//! malformed output falls back to it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use wander_common::Intent;
use wander_llm::{prompts, TextCompletion};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub providers: Vec<String>,
    #[serde(default)]
    pub params_by_provider: HashMap<String, ProviderParams>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl SearchPlan {
    pub fn params_for(&self, provider: &str) -> ProviderParams {
        self.params_by_provider
            .get(provider)
            .cloned()
            .unwrap_or_default()
    }
}

/// Decides which providers to call and with what parameters.
pub struct Planner {
    completion: Option<Arc<dyn TextCompletion>>,
}

impl Planner {
    pub fn new(completion: Option<Arc<dyn TextCompletion>>) -> Self {
        Self { completion }
    }

    pub fn deterministic() -> Self {
        Self { completion: None }
    }

    /// The plan every failure path degrades to: all providers, shared params.
    pub fn baseline(intent: &Intent, available_providers: &[String]) -> SearchPlan {
        let (query, category) = match intent {
            Intent::Simple { query, category } => (
                Some(query.clone()).filter(|q| !q.is_empty()),
                category.clone(),
            ),
            // Multi-entity searches anchor on the first entity's kind.
            Intent::MultiEntity { entities, .. } => {
                (entities.first().map(|entity| entity.kind.clone()), None)
            }
        };

        let params = ProviderParams { query, category };
        let params_by_provider = available_providers
            .iter()
            .map(|provider| (provider.clone(), params.clone()))
            .collect();

        SearchPlan {
            providers: available_providers.to_vec(),
            params_by_provider,
            reasoning: Some("baseline plan: all providers".to_string()),
        }
    }

    pub async fn plan(&self, intent: &Intent, available_providers: &[String]) -> SearchPlan {
        let Some(completion) = &self.completion else {
            return Self::baseline(intent, available_providers);
        };

        let user = match serde_json::to_string(intent) {
            Ok(serialized) => format!("Intent: {serialized}"),
            Err(_) => return Self::baseline(intent, available_providers),
        };

        let raw = match completion.complete(prompts::PLAN_SYSTEM, &user).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "plan completion failed, using baseline");
                return Self::baseline(intent, available_providers);
            }
        };

        match serde_json::from_str::<SearchPlan>(&raw) {
            Ok(mut plan) => {
                // Never call providers that are not configured.
                plan.providers
                    .retain(|provider| available_providers.contains(provider));
                if plan.providers.is_empty() {
                    warn!("LLM plan selected no known provider, using baseline");
                    return Self::baseline(intent, available_providers);
                }
                plan
            }
            Err(error) => {
                warn!(%error, "plan JSON parse failed, using baseline");
                Self::baseline(intent, available_providers)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wander_common::EntitySpec;
    use wander_llm::MockCompletion;

    fn providers() -> Vec<String> {
        vec!["google".to_string(), "yelp".to_string()]
    }

    #[test]
    fn baseline_routes_text_query() {
        let intent = Intent::simple("blue bottle coffee");
        let plan = Planner::baseline(&intent, &providers());

        assert_eq!(plan.providers, providers());
        assert_eq!(
            plan.params_for("google").query.as_deref(),
            Some("blue bottle coffee")
        );
        assert_eq!(plan.params_for("yelp").query.as_deref(), Some("blue bottle coffee"));
    }

    #[test]
    fn baseline_routes_category_for_empty_query() {
        let intent = Intent::Simple {
            query: String::new(),
            category: Some("cafe".to_string()),
        };
        let plan = Planner::baseline(&intent, &providers());

        assert_eq!(plan.params_for("google").query, None);
        assert_eq!(plan.params_for("google").category.as_deref(), Some("cafe"));
    }

    #[test]
    fn baseline_anchors_multi_entity_on_first_kind() {
        let intent = Intent::MultiEntity {
            entities: vec![
                EntitySpec {
                    kind: "restaurant".into(),
                    must_haves: vec![],
                    filters: None,
                },
                EntitySpec {
                    kind: "park".into(),
                    must_haves: vec![],
                    filters: None,
                },
            ],
            relations: vec![],
        };
        let plan = Planner::baseline(&intent, &providers());

        assert_eq!(plan.params_for("google").query.as_deref(), Some("restaurant"));
    }

    #[tokio::test]
    async fn llm_plan_is_used_when_valid() {
        let response = r#"{
            "providers": ["google"],
            "params_by_provider": {
                "google": { "query": "espresso", "category": "cafe" }
            },
            "reasoning": "specific brand query"
        }"#;
        let planner = Planner::new(Some(MockCompletion::new(response)));

        let plan = planner.plan(&Intent::simple("espresso"), &providers()).await;

        assert_eq!(plan.providers, vec!["google"]);
        assert_eq!(plan.params_for("google").query.as_deref(), Some("espresso"));
    }

    #[tokio::test]
    async fn llm_plan_with_unknown_providers_is_filtered() {
        let response = r#"{ "providers": ["google", "foursquare"] }"#;
        let planner = Planner::new(Some(MockCompletion::new(response)));

        let plan = planner.plan(&Intent::simple("coffee"), &providers()).await;
        assert_eq!(plan.providers, vec!["google"]);
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_baseline() {
        let planner = Planner::new(Some(MockCompletion::failing()));

        let plan = planner.plan(&Intent::simple("coffee"), &providers()).await;
        assert_eq!(plan.providers, providers());
    }

    #[tokio::test]
    async fn malformed_plan_falls_back_to_baseline() {
        let planner = Planner::new(Some(MockCompletion::new("[1, 2, 3]")));

        let plan = planner.plan(&Intent::simple("coffee"), &providers()).await;
        assert_eq!(plan.providers, providers());
        assert!(plan.reasoning.unwrap().contains("baseline"));
    }
}
