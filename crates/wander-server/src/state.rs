//! Shared application state
//!
//! Builds the provider clients, optional LLM collaborators and the session
//! store from settings. Missing credentials disable the corresponding
//! collaborator with a log line instead of failing startup; the pipeline
//! degrades gracefully around them.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use wander_config::Settings;
use wander_llm::{
    CachedEmbedder, Embedder, OpenAiCompletionClient, OpenAiEmbedder, TextCompletion,
};
use wander_pipeline::{DiscoveryPipeline, SearchService};
use wander_providers::{GooglePlacesClient, PlaceProvider, YelpClient};
use wander_session::{KvStore, MemoryStore, RedisStore, ResultStore};

/// Immutable state shared between handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<SearchService>,
    pub result_store: Arc<ResultStore>,
    pub store_backend: &'static str,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);

        let (store, store_backend): (Arc<dyn KvStore>, &'static str) =
            match &settings.redis_url {
                Some(redis_url) => match RedisStore::connect(redis_url).await {
                    Ok(store) => (Arc::new(store), "redis"),
                    Err(error) => {
                        warn!(%error, "Redis unavailable, using in-process session store");
                        (Arc::new(MemoryStore::new()), "memory")
                    }
                },
                None => {
                    info!("REDIS_URL not set, using in-process session store");
                    (Arc::new(MemoryStore::new()), "memory")
                }
            };

        let mut providers: Vec<Arc<dyn PlaceProvider>> = Vec::new();
        for provider_name in &settings.provider_preference {
            match provider_name.as_str() {
                "google" => match &settings.google_places_api_key {
                    Some(api_key) => providers.push(Arc::new(GooglePlacesClient::new(
                        api_key.clone(),
                        settings.provider_timeout_secs,
                        settings.provider_max_retries,
                    ))),
                    None => warn!("GOOGLE_PLACES_API_KEY not set, Google provider disabled"),
                },
                "yelp" => match &settings.yelp_api_key {
                    Some(api_key) => providers.push(Arc::new(YelpClient::new(
                        api_key.clone(),
                        settings.provider_timeout_secs,
                        settings.provider_max_retries,
                    ))),
                    None => warn!("YELP_API_KEY not set, Yelp provider disabled"),
                },
                other => warn!(provider = other, "unknown provider in preference list"),
            }
        }
        if providers.is_empty() {
            warn!("no provider credentials configured, every search will come back empty");
        }

        let (completion, embedder): (
            Option<Arc<dyn TextCompletion>>,
            Option<Arc<dyn Embedder>>,
        ) = match &settings.openai_api_key {
            Some(api_key) => {
                info!("LLM collaborators enabled");
                let completion =
                    OpenAiCompletionClient::new(api_key.clone(), settings.openai_base_url.clone());
                let embedder = CachedEmbedder::new(Arc::new(OpenAiEmbedder::new(
                    api_key.clone(),
                    settings.openai_base_url.clone(),
                )));
                (Some(Arc::new(completion)), Some(Arc::new(embedder)))
            }
            None => {
                info!("OPENAI_API_KEY not set, running with deterministic fallbacks");
                (None, None)
            }
        };

        let pipeline = DiscoveryPipeline::new(
            settings.clone(),
            providers,
            completion.clone(),
            embedder,
        );
        let service = SearchService::new(pipeline, store.clone(), completion, settings.clone());

        let result_store = ResultStore::new(
            store,
            Duration::from_secs(settings.conversation_ttl_seconds),
        );

        Ok(Self {
            settings,
            service: Arc::new(service),
            result_store: Arc::new(result_store),
            store_backend,
        })
    }
}
