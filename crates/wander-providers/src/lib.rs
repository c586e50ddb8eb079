//! wander-providers - Place provider adapters
//!
//! Normalizes heterogeneous upstream catalogs into the shared
//! `ProviderPlace` record:
//! - Google Places API v1 (text and nearby search)
//! - Yelp Fusion (offset-paginated business search)
//!
//! All clients support:
//! - Rate limiting (respects API limits)
//! - Retry with exponential backoff on 5xx and transport errors
//! - Per-call timeouts
//! - Silent dropping of records missing coordinates or a display name

pub mod google;
pub mod yelp;

pub use google::GooglePlacesClient;
pub use yelp::YelpClient;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use wander_common::ProviderPlace;

/// Parameters of one provider call, already resolved by the planner.
#[derive(Debug, Clone)]
pub struct ProviderQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: u32,
    pub query: Option<String>,
    pub category: Option<String>,
    pub max_results: usize,
}

impl ProviderQuery {
    pub fn nearby(lat: f64, lng: f64, radius_m: u32) -> Self {
        Self {
            lat,
            lng,
            radius_m,
            query: None,
            category: None,
            max_results: 60,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

/// Provider adapter errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Unified trait for place search backends.
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    /// Search places around an origin, normalized into `ProviderPlace`s.
    ///
    /// Upstream order is preserved. Records the upstream returns without
    /// coordinates or a display name are dropped, not surfaced as errors.
    async fn search_nearby(&self, query: &ProviderQuery)
        -> Result<Vec<ProviderPlace>, ProviderError>;

    /// Name of this provider ("google", "yelp").
    fn name(&self) -> &str;
}

/// Send a request, retrying 5xx and transport failures with exponential
/// backoff (2^attempt seconds). 4xx responses fail fast.
pub(crate) async fn send_with_retry(
    builder: reqwest::RequestBuilder,
    provider: &str,
    max_retries: u32,
) -> Result<reqwest::Response, ProviderError> {
    let mut attempt = 0;
    loop {
        let request = builder
            .try_clone()
            .ok_or_else(|| ProviderError::Api("request body is not cloneable".into()))?;

        let outcome = request.send().await;
        match outcome {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                let retryable = status.is_server_error();
                if retryable && attempt + 1 < max_retries {
                    let wait = Duration::from_secs(1 << attempt);
                    warn!(
                        provider,
                        attempt = attempt + 1,
                        status = status.as_u16(),
                        wait_s = wait.as_secs(),
                        "provider request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                    continue;
                }

                let body = response.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(200).collect();
                return Err(ProviderError::Api(format!("HTTP {status}: {snippet}")));
            }
            Err(error) => {
                if attempt + 1 < max_retries {
                    let wait = Duration::from_secs(1 << attempt);
                    warn!(
                        provider,
                        attempt = attempt + 1,
                        error = %error,
                        wait_s = wait.as_secs(),
                        "provider transport error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                    continue;
                }
                return Err(ProviderError::Http(error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_query_builder() {
        let query = ProviderQuery::nearby(37.77, -122.41, 3000)
            .with_query("coffee")
            .with_max_results(20);

        assert_eq!(query.query.as_deref(), Some("coffee"));
        assert_eq!(query.max_results, 20);
        assert!(query.category.is_none());
    }
}
