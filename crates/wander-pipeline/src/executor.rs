//! Provider fan-out
//!
//! One task per planned provider call, all bounded by the per-call timeout
//! capped at the request deadline. A provider that errors or times out
//! contributes an empty list; its failure is logged and never propagates.
//! Concatenation follows plan order, so the combined list is deterministic.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{info, warn};
use wander_common::ProviderPlace;
use wander_providers::{PlaceProvider, ProviderQuery};

use crate::planner::SearchPlan;

#[derive(Debug, Default)]
pub struct FanOutResult {
    /// All places, concatenated in plan order with upstream order preserved.
    pub places: Vec<ProviderPlace>,
    /// Records returned per provider (0 for failed or timed-out calls).
    pub counts: BTreeMap<String, i64>,
    pub elapsed_ms: f64,
}

/// Invokes the planned providers concurrently and rejoins their results.
pub struct FanOutExecutor {
    per_call_timeout: Duration,
    request_deadline: Duration,
}

impl FanOutExecutor {
    pub fn new(per_call_timeout: Duration, request_deadline: Duration) -> Self {
        Self {
            per_call_timeout,
            request_deadline,
        }
    }

    pub async fn execute(
        &self,
        providers: &[Arc<dyn PlaceProvider>],
        plan: &SearchPlan,
        lat: f64,
        lng: f64,
        radius_m: u32,
        max_results: usize,
    ) -> FanOutResult {
        let started = Instant::now();
        let call_timeout = self.per_call_timeout.min(self.request_deadline);

        let mut names: Vec<String> = Vec::new();
        let mut tasks = Vec::new();

        for provider_name in &plan.providers {
            let Some(provider) = providers
                .iter()
                .find(|p| p.name() == provider_name)
                .cloned()
            else {
                warn!(provider = %provider_name, "planned provider is not configured");
                continue;
            };

            let params = plan.params_for(provider_name);
            let mut query = ProviderQuery::nearby(lat, lng, radius_m).with_max_results(max_results);
            if let Some(text) = params.query {
                query = query.with_query(text);
            }
            if let Some(category) = params.category {
                query = query.with_category(category);
            }

            names.push(provider_name.clone());
            tasks.push(tokio::spawn(async move {
                tokio::time::timeout(call_timeout, provider.search_nearby(&query)).await
            }));
        }

        let outcomes = join_all(tasks).await;

        let mut result = FanOutResult::default();
        for (name, outcome) in names.into_iter().zip(outcomes) {
            let places: Vec<ProviderPlace> = match outcome {
                Ok(Ok(Ok(places))) => places,
                Ok(Ok(Err(error))) => {
                    warn!(provider = %name, %error, "provider call failed");
                    Vec::new()
                }
                Ok(Err(_elapsed)) => {
                    warn!(provider = %name, timeout_s = call_timeout.as_secs(), "provider call timed out");
                    Vec::new()
                }
                Err(join_error) => {
                    warn!(provider = %name, %join_error, "provider task panicked");
                    Vec::new()
                }
            };

            result.counts.insert(name, places.len() as i64);
            result.places.extend(places);
        }

        result.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            total = result.places.len(),
            elapsed_ms = result.elapsed_ms,
            "provider fan-out complete"
        );

        result
    }
}
