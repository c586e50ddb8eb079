//! The staged discovery pipeline
//!
//! Stages run in data-flow order; CPU-bound stages (dedupe, scoring) are
//! synchronous, provider and collaborator calls are the only suspension
//! points. Per-stage wall times land in the debug block.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use uuid::Uuid;
use wander_common::{
    AgentMode, Intent, MatchedPartner, Place, Requirement, ScoredPlace, SearchDebug,
    SearchRequest, ValidationInfo,
};
use wander_config::Settings;
use wander_fusion::amenities::extract_features;
use wander_fusion::{apply_constraints, fuse_places, rank_places, DedupeConfig, RankingPreset};
use wander_llm::{Embedder, IntentExtractor, TextCompletion};
use wander_providers::PlaceProvider;

use crate::executor::FanOutExecutor;
use crate::planner::Planner;

/// End-to-end request processor from query string to ranked places.
pub struct DiscoveryPipeline {
    settings: Arc<Settings>,
    providers: Vec<Arc<dyn PlaceProvider>>,
    completion: Option<Arc<dyn TextCompletion>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl DiscoveryPipeline {
    pub fn new(
        settings: Arc<Settings>,
        providers: Vec<Arc<dyn PlaceProvider>>,
        completion: Option<Arc<dyn TextCompletion>>,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Self {
        Self {
            settings,
            providers,
            completion,
            embedder,
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    fn resolve_mode(&self, request: &SearchRequest) -> AgentMode {
        match request.context.as_ref().and_then(|c| c.agent_mode) {
            Some(mode) => mode,
            None if self.settings.deterministic_mode() => AgentMode::Deterministic,
            None => AgentMode::Full,
        }
    }

    /// Run all stages for a fresh search.
    pub async fn run(&self, request: &SearchRequest, trace_id: &str) -> (Vec<Place>, SearchDebug) {
        let total_started = Instant::now();
        let mode = self.resolve_mode(request);
        let query = request.query.clone().unwrap_or_default();

        let mut debug = SearchDebug {
            trace_id: trace_id.to_string(),
            agent_mode: mode_name(mode).to_string(),
            ..Default::default()
        };

        info!(
            query = %query,
            lat = request.lat,
            lng = request.lng,
            radius_m = request.radius_m,
            trace_id,
            "search start"
        );

        let completion = match mode {
            AgentMode::Full => self.completion.clone(),
            AgentMode::Deterministic => None,
        };
        let extractor = IntentExtractor::new(completion.clone());

        // Parse intent. An explicit multi-entity block wins over parsing.
        let stage = Instant::now();
        let intent = match &request.multi_entity {
            Some(multi) => Intent::MultiEntity {
                entities: multi.entities.clone(),
                relations: multi.relations.clone(),
            },
            None => extractor.parse(&query).await,
        };
        debug.timings.insert("parse_intent".into(), ms_since(stage));

        // Plan provider calls.
        let stage = Instant::now();
        let available = self.provider_names();
        let plan = Planner::new(completion.clone())
            .plan(&intent, &available)
            .await;
        debug.timings.insert("plan".into(), ms_since(stage));

        // Fan out to providers.
        let stage = Instant::now();
        let executor = FanOutExecutor::new(
            Duration::from_secs(self.settings.provider_timeout_secs),
            Duration::from_secs(self.settings.request_deadline_secs),
        );
        let fan_out = executor
            .execute(
                &self.providers,
                &plan,
                request.lat,
                request.lng,
                request.radius_m,
                self.settings.max_results_per_provider,
            )
            .await;
        debug.timings.insert("providers".into(), ms_since(stage));
        for (provider, count) in &fan_out.counts {
            debug.counts_before_after.insert(provider.clone(), *count);
        }

        // Fuse and dedupe.
        let stage = Instant::now();
        let dedupe_config = DedupeConfig {
            name_threshold: self.settings.name_similarity_threshold * 100.0,
            geo_threshold_m: self.settings.geo_distance_threshold_m,
            provider_preference: self.settings.provider_preference.clone(),
        };
        let (fused, dedupe_stats) = fuse_places(fan_out.places, &dedupe_config);
        debug.timings.insert("dedupe".into(), ms_since(stage));
        debug
            .counts_before_after
            .insert("fused".into(), dedupe_stats.output_count as i64);

        // Constraint join for multi-entity intents.
        let stage = Instant::now();
        let (fused, partners) = match &intent {
            Intent::MultiEntity {
                entities,
                relations,
            } => {
                let (kept, partners, stats) = apply_constraints(
                    fused,
                    entities,
                    relations,
                    self.settings.default_near_distance_m,
                );
                debug
                    .constraints_satisfied
                    .insert("kept".into(), stats.kept as i64);
                debug
                    .constraints_satisfied
                    .insert("dropped".into(), stats.dropped as i64);
                (kept, partners)
            }
            Intent::Simple { .. } => (fused, HashMap::new()),
        };
        debug.timings.insert("constraint_join".into(), ms_since(stage));

        // Requirement extraction, matching and ranking.
        let stage = Instant::now();
        let requirements = extractor.extract_requirements(&query).await;
        let preset_name = request
            .context
            .as_ref()
            .and_then(|c| c.ranking_preset.clone())
            .unwrap_or_else(|| self.settings.ranking_preset.clone());
        let preset = RankingPreset::from_name(&preset_name);
        debug.ranking_preset = preset.name.to_string();

        let embedder = if self.settings.enable_semantic_matching {
            self.embedder.as_deref()
        } else {
            None
        };
        let scored = rank_places(
            fused,
            preset,
            request.filters.as_ref(),
            &requirements,
            embedder,
            self.settings.semantic_match_threshold,
        )
        .await;
        debug.timings.insert("score_rank".into(), ms_since(stage));

        // Validate result quality.
        debug.validation = validate_results(&scored);
        if !debug.validation.valid {
            warn!(trace_id, "search produced no results");
        }

        // Format the final answer.
        let places: Vec<Place> = scored
            .into_iter()
            .take(request.top_k)
            .map(|scored| format_place(scored, &requirements, &partners))
            .collect();
        debug
            .counts_before_after
            .insert("final".into(), places.len() as i64);
        debug.timings.insert("total".into(), ms_since(total_started));

        info!(places = places.len(), trace_id, "search complete");

        (places, debug)
    }
}

fn mode_name(mode: AgentMode) -> &'static str {
    match mode {
        AgentMode::Full => "full",
        AgentMode::Deterministic => "deterministic",
    }
}

fn ms_since(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn validate_results(scored: &[ScoredPlace]) -> ValidationInfo {
    let mut validation = ValidationInfo {
        valid: !scored.is_empty(),
        issues: Vec::new(),
        suggestions: Vec::new(),
        expand_search: false,
    };

    if scored.is_empty() {
        validation.issues.push("No results found".to_string());
        validation
            .suggestions
            .push("Try broadening your search criteria".to_string());
        validation.expand_search = true;
    } else if scored.len() < 5 {
        validation.issues.push("Few results found".to_string());
        validation
            .suggestions
            .push("Consider increasing search radius".to_string());
    }

    validation
}

fn format_place(
    scored: ScoredPlace,
    requirements: &[Requirement],
    partners: &HashMap<Uuid, Vec<MatchedPartner>>,
) -> Place {
    let fused = scored.fused;
    let representative = fused.representative;
    let features = extract_features(&representative);

    Place {
        id: fused.id,
        name: representative.name,
        category: representative.category,
        lat: representative.lat,
        lng: representative.lng,
        rating: representative.rating,
        user_rating_count: representative.user_rating_count,
        price_level: representative.price_level,
        phone: representative.phone,
        website: representative.website,
        maps_url: representative.maps_url,
        address: representative.address,
        distance_km: representative.distance_km,
        features,
        score: scored.score,
        max_possible_score: scored.max_possible_score,
        evidence: scored.evidence,
        user_requirements: requirements.iter().map(|r| r.name.clone()).collect(),
        requirements_matched: scored.requirement_matches,
        match_percentage: scored.match_percentage,
        provenance: fused.provenance,
        matched_partners: partners.get(&fused.id).cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;
    use wander_common::{EntitySpec, MultiEntityQuery, ProviderPlace, Relation, RelationPredicate};
    use wander_llm::MockCompletion;

    fn place(provider: &str, id: &str, name: &str, lat: f64, lng: f64) -> ProviderPlace {
        let mut p = ProviderPlace::new(provider, id, name, lat, lng);
        p.rating = Some(4.2);
        p.user_rating_count = Some(120);
        p.distance_km = Some(0.8);
        p
    }

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::default())
    }

    fn request(query: &str) -> SearchRequest {
        SearchRequest {
            query: Some(query.to_string()),
            lat: 37.7749,
            lng: -122.4194,
            radius_m: 3000,
            filters: None,
            multi_entity: None,
            context: None,
            top_k: 30,
        }
    }

    #[tokio::test]
    async fn fresh_search_dedupes_across_providers() {
        let google = MockProvider::new(
            "google",
            vec![
                place("google", "g1", "Blue Bottle Coffee", 37.7749, -122.4194),
                place("google", "g2", "Starbucks", 37.7800, -122.4200),
            ],
        );
        let yelp = MockProvider::new(
            "yelp",
            vec![place("yelp", "y1", "Blue Bottle Coffee", 37.7750, -122.4195)],
        );
        let pipeline = DiscoveryPipeline::new(
            settings(),
            vec![google, yelp],
            None,
            None,
        );

        let (places, debug) = pipeline.run(&request("coffee"), "trace-1").await;

        assert_eq!(places.len(), 2);
        assert_eq!(debug.counts_before_after["google"], 2);
        assert_eq!(debug.counts_before_after["yelp"], 1);
        assert_eq!(debug.counts_before_after["fused"], 2);
        assert_eq!(debug.counts_before_after["final"], 2);
        assert_eq!(debug.agent_mode, "full");
        assert!(debug.validation.valid);

        let blue_bottle = places.iter().find(|p| p.name.contains("Blue Bottle")).unwrap();
        assert_eq!(blue_bottle.provenance.len(), 2);
    }

    #[tokio::test]
    async fn all_providers_dead_yields_empty_with_expand_flag() {
        let pipeline = DiscoveryPipeline::new(
            settings(),
            vec![MockProvider::failing("google"), MockProvider::failing("yelp")],
            None,
            None,
        );

        let (places, debug) = pipeline.run(&request("coffee"), "trace-2").await;

        assert!(places.is_empty());
        assert!(!debug.validation.valid);
        assert!(debug.validation.expand_search);
        assert_eq!(debug.counts_before_after["google"], 0);
    }

    #[tokio::test]
    async fn top_k_truncates_output() {
        let many: Vec<ProviderPlace> = (0..8)
            .map(|i| {
                place(
                    "google",
                    &format!("g{i}"),
                    &format!("Distinct Cafe Number {i}"),
                    37.70 + i as f64 * 0.01,
                    -122.41,
                )
            })
            .collect();
        let pipeline = DiscoveryPipeline::new(
            settings(),
            vec![MockProvider::new("google", many)],
            None,
            None,
        );

        let mut req = request("coffee");
        req.top_k = 3;
        let (places, debug) = pipeline.run(&req, "trace-3").await;

        assert_eq!(places.len(), 3);
        assert_eq!(debug.counts_before_after["fused"], 8);
        assert_eq!(debug.counts_before_after["final"], 3);
    }

    #[tokio::test]
    async fn explicit_multi_entity_block_drives_constraint_join() {
        let mut diner = place("google", "g1", "Family Diner", 37.7749, -122.4194);
        diner.amenities.editorial_summary = Some("family friendly diner".into());
        let mut park = place("google", "g2", "Dolores Park", 37.7752, -122.4194);
        park.amenities.editorial_summary = Some("park with a playground".into());
        let lonely = place("google", "g3", "Far Cafe", 37.8500, -122.4194);

        let pipeline = DiscoveryPipeline::new(
            settings(),
            vec![MockProvider::new("google", vec![diner, park, lonely])],
            None,
            None,
        );

        let mut req = request("");
        req.multi_entity = Some(MultiEntityQuery {
            entities: vec![
                EntitySpec {
                    kind: "restaurant".into(),
                    must_haves: vec!["family_friendly".into()],
                    filters: None,
                },
                EntitySpec {
                    kind: "park".into(),
                    must_haves: vec!["playground".into()],
                    filters: None,
                },
            ],
            relations: vec![Relation {
                left: 0,
                right: 1,
                predicate: RelationPredicate::Near,
                distance_m: Some(500.0),
            }],
        });

        let (places, debug) = pipeline.run(&req, "trace-4").await;

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Family Diner");
        assert_eq!(places[0].matched_partners.len(), 1);
        assert_eq!(places[0].matched_partners[0].name, "Dolores Park");
        assert_eq!(debug.constraints_satisfied["kept"], 1);
    }

    #[tokio::test]
    async fn requirements_flow_into_scores_and_evidence() {
        let mut wired = place("google", "g1", "Wired Cafe", 37.7749, -122.4194);
        wired.amenities.wifi = true;
        let plain = place("google", "g2", "Plain Cafe", 37.7751, -122.4300);

        let requirements_json = r#"{
            "normalized_requirements": [
                {
                    "requirement": "WiFi",
                    "category": "feature",
                    "keywords": ["wifi", "internet"],
                    "importance": "high"
                }
            ]
        }"#;
        let pipeline = DiscoveryPipeline::new(
            settings(),
            vec![MockProvider::new("google", vec![plain, wired])],
            Some(MockCompletion::new(requirements_json)),
            None,
        );

        let (places, _) = pipeline.run(&request("coffee with wifi"), "trace-5").await;

        // Intent parse also consumes the canned JSON and falls back to a
        // simple intent; only the requirement path understands it.
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].name, "Wired Cafe");
        assert_eq!(places[0].match_percentage, 100.0);
        assert!(places[0].requirements_matched[0].matched);
        assert_eq!(places[0].max_possible_score, 110.0);
        assert_eq!(places[1].match_percentage, 0.0);
        assert_eq!(places[0].user_requirements, vec!["WiFi"]);
    }

    #[tokio::test]
    async fn deterministic_context_disables_llm_paths() {
        let pipeline = DiscoveryPipeline::new(
            settings(),
            vec![MockProvider::new(
                "google",
                vec![place("google", "g1", "Cafe", 37.7749, -122.4194)],
            )],
            Some(MockCompletion::new("{\"normalized_requirements\":[]}")),
            None,
        );

        let mut req = request("coffee");
        req.context = Some(wander_common::SearchContext {
            agent_mode: Some(AgentMode::Deterministic),
            ..Default::default()
        });

        let (places, debug) = pipeline.run(&req, "trace-6").await;

        assert_eq!(debug.agent_mode, "deterministic");
        assert_eq!(places[0].user_requirements.len(), 0);
        assert_eq!(places[0].match_percentage, 100.0);
    }

    #[tokio::test]
    async fn preset_comes_from_context() {
        let pipeline = DiscoveryPipeline::new(
            settings(),
            vec![MockProvider::new(
                "google",
                vec![place("google", "g1", "Cafe", 37.7749, -122.4194)],
            )],
            None,
            None,
        );

        let mut req = request("coffee");
        req.context = Some(wander_common::SearchContext {
            ranking_preset: Some("nearby".to_string()),
            ..Default::default()
        });

        let (_, debug) = pipeline.run(&req, "trace-7").await;
        assert_eq!(debug.ranking_preset, "nearby");
    }
}
