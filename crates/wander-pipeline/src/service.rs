//! Search service orchestration
//!
//! The entry point above the pipeline: response caching, result-set
//! storage, and dispatch between fresh searches and follow-up refinement.
//! The two request shapes are a tagged variant so each branch is
//! statically exhaustive.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;
use wander_common::{SearchDebug, SearchRequest, SearchResponse, WanderError};
use wander_config::Settings;
use wander_llm::{FollowupParser, TextCompletion};
use wander_session::{generate_cache_key, KvStore, ResultStore, SearchCache};

use crate::pipeline::DiscoveryPipeline;
use crate::refiner::apply_followup_filters;

/// A request is either a fresh search or a refinement of a stored set.
#[derive(Debug)]
pub enum RequestKind {
    Fresh(SearchRequest),
    Followup(SearchRequest),
}

impl RequestKind {
    pub fn from_request(request: SearchRequest) -> Self {
        let follow_up = request
            .context
            .as_ref()
            .map(|context| context.follow_up)
            .unwrap_or(false);

        if follow_up {
            RequestKind::Followup(request)
        } else {
            RequestKind::Fresh(request)
        }
    }
}

pub struct SearchService {
    pipeline: DiscoveryPipeline,
    result_store: ResultStore,
    cache: SearchCache,
    followup_parser: FollowupParser,
    settings: Arc<Settings>,
}

impl SearchService {
    pub fn new(
        pipeline: DiscoveryPipeline,
        store: Arc<dyn KvStore>,
        completion: Option<Arc<dyn TextCompletion>>,
        settings: Arc<Settings>,
    ) -> Self {
        let result_store = ResultStore::new(
            store.clone(),
            std::time::Duration::from_secs(settings.conversation_ttl_seconds),
        );
        let cache = SearchCache::new(
            store,
            std::time::Duration::from_secs(settings.cache_ttl_seconds),
        );

        Self {
            pipeline,
            result_store,
            cache,
            followup_parser: FollowupParser::new(completion),
            settings,
        }
    }

    /// Execute a search request end to end.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, WanderError> {
        let trace_id = Uuid::new_v4().to_string();

        match RequestKind::from_request(request) {
            RequestKind::Followup(request) => self.handle_followup(request, &trace_id).await,
            RequestKind::Fresh(request) => self.fresh_search(request, &trace_id).await,
        }
    }

    fn preset_for(&self, request: &SearchRequest) -> String {
        request
            .context
            .as_ref()
            .and_then(|context| context.ranking_preset.clone())
            .unwrap_or_else(|| self.settings.ranking_preset.clone())
    }

    async fn fresh_search(
        &self,
        request: SearchRequest,
        trace_id: &str,
    ) -> Result<SearchResponse, WanderError> {
        let cache_key = generate_cache_key(
            request.query.as_deref(),
            request.lat,
            request.lng,
            request.radius_m,
            &self.preset_for(&request),
            request.filters.as_ref(),
            request.multi_entity.as_ref(),
        );

        match self.cache.get(&cache_key).await {
            Ok(Some(mut cached)) => {
                info!(cache_key, trace_id, "cache hit");
                cached.debug.cache_hit = true;
                cached.debug.trace_id = trace_id.to_string();
                return Ok(cached);
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "response cache read failed"),
        }

        let (places, debug) = self.pipeline.run(&request, trace_id).await;

        let conversation_id = request
            .context
            .as_ref()
            .and_then(|context| context.conversation_id.clone());
        let result_set = self
            .result_store
            .store_result_set(places.clone(), conversation_id)
            .await
            .map_err(|error| WanderError::Internal(error.to_string()))?;

        let response = SearchResponse {
            places,
            debug,
            result_set_id: result_set.result_set_id.to_string(),
        };

        if let Err(error) = self.cache.set(&cache_key, &response).await {
            warn!(%error, "response cache write failed");
        }

        Ok(response)
    }

    /// Refine a stored result set, or fall back to a fresh search when the
    /// referenced set is gone.
    async fn handle_followup(
        &self,
        mut request: SearchRequest,
        trace_id: &str,
    ) -> Result<SearchResponse, WanderError> {
        let context = request.context.clone().unwrap_or_default();

        let prior = if let Some(result_set_id) = &context.result_set_id {
            self.result_store
                .get_result_set(result_set_id)
                .await
                .unwrap_or_default()
        } else if let Some(conversation_id) = &context.conversation_id {
            self.result_store
                .latest_for_conversation(conversation_id)
                .await
                .unwrap_or_default()
        } else {
            None
        };

        let Some(prior) = prior else {
            info!(trace_id, "no stored result set, falling back to fresh search");
            if let Some(context) = request.context.as_mut() {
                context.follow_up = false;
            }
            return self.fresh_search(request, trace_id).await;
        };

        let utterance = request.query.clone().unwrap_or_default();
        let original_query = context
            .original_query
            .clone()
            .unwrap_or_else(|| utterance.clone());

        let intent = self
            .followup_parser
            .parse(&utterance, &original_query, request.radius_m)
            .await;

        if intent.is_new_search {
            info!(trace_id, new_query = ?intent.new_query, "follow-up is a new search");
            if let Some(new_query) = intent.new_query {
                request.query = Some(new_query);
            }
            if let Some(context) = request.context.as_mut() {
                context.follow_up = false;
            }
            return self.fresh_search(request, trace_id).await;
        }

        let started = Instant::now();
        let before = prior.places.len();
        let filtered = apply_followup_filters(prior.places, &intent, request.top_k);

        let result_set = self
            .result_store
            .store_result_set(filtered.clone(), context.conversation_id.clone())
            .await
            .map_err(|error| WanderError::Internal(error.to_string()))?;

        let mut debug = SearchDebug {
            cache_hit: false,
            trace_id: trace_id.to_string(),
            ranking_preset: self.preset_for(&request),
            agent_mode: "followup".to_string(),
            ..Default::default()
        };
        debug
            .counts_before_after
            .insert("before".into(), before as i64);
        debug
            .counts_before_after
            .insert("after".into(), filtered.len() as i64);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug.timings.insert("followup_filter".into(), elapsed_ms);
        debug.timings.insert("total".into(), elapsed_ms);
        debug.validation.valid = !filtered.is_empty();

        info!(before, after = filtered.len(), trace_id, "follow-up complete");

        Ok(SearchResponse {
            places: filtered,
            debug,
            result_set_id: result_set.result_set_id.to_string(),
        })
    }
}
