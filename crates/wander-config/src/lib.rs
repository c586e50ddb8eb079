//! Configuration loading for the Wander service
//!
//! Everything comes from environment variables (a `.env` file is loaded by
//! the server binary before this runs). Every knob has a default so the
//! service starts with no configuration at all; provider and LLM API keys
//! are optional and their absence degrades the pipeline rather than
//! stopping it.

use anyhow::{Context, Result};
use config::Environment;
use tracing::warn;

/// Complete runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    // HTTP binding
    pub host: String,
    pub port: u16,

    // Provider credentials (absent -> provider disabled)
    pub google_places_api_key: Option<String>,
    pub yelp_api_key: Option<String>,

    // LLM collaborators (absent -> deterministic fallbacks everywhere)
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,

    // Session store (absent -> in-process memory store)
    pub redis_url: Option<String>,

    // Provider behavior
    pub provider_timeout_secs: u64,
    pub provider_max_retries: u32,
    pub max_results_per_provider: usize,
    pub request_deadline_secs: u64,

    // Search defaults
    pub default_radius_m: u32,
    pub default_top_k: usize,
    pub max_radius_m: u32,

    // Fusion
    pub name_similarity_threshold: f64,
    pub geo_distance_threshold_m: f64,
    pub provider_preference: Vec<String>,

    // Multi-entity
    pub default_near_distance_m: f64,

    // Ranking
    pub ranking_preset: String,
    pub agent_mode: String,

    // Requirement matching
    pub enable_semantic_matching: bool,
    pub semantic_match_threshold: f64,

    // Follow-ups and caching
    pub conversation_ttl_seconds: u64,
    pub cache_ttl_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            google_places_api_key: None,
            yelp_api_key: None,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            redis_url: None,
            provider_timeout_secs: 10,
            provider_max_retries: 3,
            max_results_per_provider: 60,
            request_deadline_secs: 25,
            default_radius_m: 3000,
            default_top_k: 30,
            max_radius_m: 50_000,
            name_similarity_threshold: 0.82,
            geo_distance_threshold_m: 120.0,
            provider_preference: vec!["google".to_string(), "yelp".to_string()],
            default_near_distance_m: 500.0,
            ranking_preset: "balanced".to_string(),
            agent_mode: "full".to_string(),
            enable_semantic_matching: true,
            semantic_match_threshold: 0.75,
            conversation_ttl_seconds: 900,
            cache_ttl_seconds: 1200,
        }
    }
}

impl Settings {
    /// Load settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(Environment::default().try_parsing(true))
            .build()
            .context("failed to read environment configuration")?;

        let defaults = Settings::default();

        let get_string =
            |key: &str, fallback: String| source.get_string(key).unwrap_or(fallback);
        let get_opt = |key: &str| source.get_string(key).ok().filter(|v| !v.is_empty());

        let agent_mode = get_string("AGENT_MODE", defaults.agent_mode.clone());
        if agent_mode != "full" && agent_mode != "deterministic" {
            warn!(agent_mode, "unknown AGENT_MODE, using \"full\"");
        }

        let provider_preference = source
            .get_string("PROVIDER_PREFERENCE")
            .map(|raw| {
                raw.split(',')
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
            })
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.provider_preference.clone());

        Ok(Self {
            host: get_string("HOST", defaults.host.clone()),
            port: source
                .get_int("PORT")
                .map(|v| v as u16)
                .unwrap_or(defaults.port),
            google_places_api_key: get_opt("GOOGLE_PLACES_API_KEY"),
            yelp_api_key: get_opt("YELP_API_KEY"),
            openai_api_key: get_opt("OPENAI_API_KEY"),
            openai_base_url: get_string("OPENAI_BASE_URL", defaults.openai_base_url.clone()),
            redis_url: get_opt("REDIS_URL"),
            provider_timeout_secs: source
                .get_int("PROVIDER_TIMEOUT_SECS")
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.provider_timeout_secs),
            provider_max_retries: source
                .get_int("PROVIDER_MAX_RETRIES")
                .map(|v| v.max(1) as u32)
                .unwrap_or(defaults.provider_max_retries),
            max_results_per_provider: source
                .get_int("MAX_RESULTS_PER_PROVIDER")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.max_results_per_provider),
            request_deadline_secs: source
                .get_int("REQUEST_DEADLINE_SECS")
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.request_deadline_secs),
            default_radius_m: source
                .get_int("DEFAULT_RADIUS_M")
                .map(|v| v as u32)
                .unwrap_or(defaults.default_radius_m),
            default_top_k: source
                .get_int("DEFAULT_TOP_K")
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.default_top_k),
            max_radius_m: source
                .get_int("MAX_RADIUS_M")
                .map(|v| v as u32)
                .unwrap_or(defaults.max_radius_m),
            name_similarity_threshold: source
                .get_float("NAME_SIMILARITY_THRESHOLD")
                .unwrap_or(defaults.name_similarity_threshold),
            geo_distance_threshold_m: source
                .get_float("GEO_DISTANCE_THRESHOLD_M")
                .unwrap_or(defaults.geo_distance_threshold_m),
            provider_preference,
            default_near_distance_m: source
                .get_float("DEFAULT_NEAR_DISTANCE_M")
                .unwrap_or(defaults.default_near_distance_m),
            ranking_preset: get_string("RANKING_PRESET", defaults.ranking_preset.clone()),
            agent_mode,
            enable_semantic_matching: source
                .get_bool("ENABLE_SEMANTIC_MATCHING")
                .unwrap_or(defaults.enable_semantic_matching),
            semantic_match_threshold: source
                .get_float("SEMANTIC_MATCH_THRESHOLD")
                .unwrap_or(defaults.semantic_match_threshold),
            conversation_ttl_seconds: source
                .get_int("CONVERSATION_TTL_SECONDS")
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.conversation_ttl_seconds),
            cache_ttl_seconds: source
                .get_int("CACHE_TTL_SECONDS")
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.cache_ttl_seconds),
        })
    }

    pub fn deterministic_mode(&self) -> bool {
        self.agent_mode == "deterministic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();

        assert_eq!(settings.name_similarity_threshold, 0.82);
        assert_eq!(settings.geo_distance_threshold_m, 120.0);
        assert_eq!(settings.default_near_distance_m, 500.0);
        assert_eq!(settings.semantic_match_threshold, 0.75);
        assert_eq!(settings.conversation_ttl_seconds, 900);
        assert_eq!(settings.max_radius_m, 50_000);
        assert_eq!(settings.provider_timeout_secs, 10);
        assert_eq!(settings.provider_max_retries, 3);
        assert_eq!(
            settings.provider_preference,
            vec!["google".to_string(), "yelp".to_string()]
        );
    }

    #[test]
    fn deterministic_mode_flag() {
        let mut settings = Settings::default();
        assert!(!settings.deterministic_mode());

        settings.agent_mode = "deterministic".to_string();
        assert!(settings.deterministic_mode());
    }
}
