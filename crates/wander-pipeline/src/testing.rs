//! Mock provider for tests
//!
//! Returns canned places without network access; can be made slow or
//! failing to exercise timeout and degradation paths.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wander_common::ProviderPlace;
use wander_providers::{PlaceProvider, ProviderError, ProviderQuery};

pub struct MockProvider {
    name: String,
    places: Vec<ProviderPlace>,
    delay: Option<Duration>,
    fail: bool,
}

impl MockProvider {
    pub fn new(name: impl Into<String>, places: Vec<ProviderPlace>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            places,
            delay: None,
            fail: false,
        })
    }

    /// A provider that sleeps before answering, for timeout tests.
    pub fn slow(name: impl Into<String>, places: Vec<ProviderPlace>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            places,
            delay: Some(delay),
            fail: false,
        })
    }

    /// A provider whose calls always error.
    pub fn failing(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            places: Vec::new(),
            delay: None,
            fail: true,
        })
    }
}

#[async_trait]
impl PlaceProvider for MockProvider {
    async fn search_nearby(
        &self,
        query: &ProviderQuery,
    ) -> Result<Vec<ProviderPlace>, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::Api("mock provider configured to fail".into()));
        }

        let mut places = self.places.clone();
        places.truncate(query.max_results);
        Ok(places)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
