//! Result-set storage and search response caching
//!
//! A result set is stored under `result_set:<uuid>` with the conversation's
//! latest pointer under `conversation:<id>`. Each refinement writes a fresh
//! result set; prior sets stay untouched until their TTL expires.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;
use wander_common::{
    MultiEntityQuery, Place, ResultSet, SearchFilters, SearchResponse,
};

use crate::KvStore;

/// Stores and retrieves result sets for conversational follow-ups.
pub struct ResultStore {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ResultStore {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn result_set_key(result_set_id: &str) -> String {
        format!("result_set:{result_set_id}")
    }

    fn conversation_key(conversation_id: &str) -> String {
        format!("conversation:{conversation_id}")
    }

    /// Store a result set under a fresh id and point the conversation at it.
    pub async fn store_result_set(
        &self,
        places: Vec<Place>,
        conversation_id: Option<String>,
    ) -> Result<ResultSet> {
        let result_set = ResultSet {
            result_set_id: Uuid::new_v4(),
            places,
            created_at: Utc::now(),
            conversation_id: conversation_id.clone(),
        };

        let key = Self::result_set_key(&result_set.result_set_id.to_string());
        self.store
            .set(&key, serde_json::to_value(&result_set)?, self.ttl)
            .await?;

        if let Some(conversation_id) = &conversation_id {
            let pointer = serde_json::json!({
                "latest_result_set_id": result_set.result_set_id.to_string(),
            });
            self.store
                .set(&Self::conversation_key(conversation_id), pointer, self.ttl)
                .await?;
        }

        info!(
            result_set_id = %result_set.result_set_id,
            conversation_id = conversation_id.as_deref().unwrap_or(""),
            count = result_set.places.len(),
            "result set stored"
        );

        Ok(result_set)
    }

    pub async fn get_result_set(&self, result_set_id: &str) -> Result<Option<ResultSet>> {
        let key = Self::result_set_key(result_set_id);
        match self.store.get(&key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => {
                warn!(result_set_id, "result set not found");
                Ok(None)
            }
        }
    }

    /// Latest result set of a conversation, following the pointer key.
    pub async fn latest_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ResultSet>> {
        let pointer = self
            .store
            .get(&Self::conversation_key(conversation_id))
            .await?;

        let Some(pointer) = pointer else {
            return Ok(None);
        };
        let Some(result_set_id) = pointer
            .get("latest_result_set_id")
            .and_then(|id| id.as_str())
        else {
            return Ok(None);
        };

        self.get_result_set(result_set_id).await
    }
}

/// Whole-response cache for identical search requests.
pub struct SearchCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn get(&self, key: &str) -> Result<Option<SearchResponse>> {
        match self.store.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, response: &SearchResponse) -> Result<()> {
        self.store
            .set(key, serde_json::to_value(response)?, self.ttl)
            .await
    }
}

/// Deterministic cache key over everything that changes a search's output.
pub fn generate_cache_key(
    query: Option<&str>,
    lat: f64,
    lng: f64,
    radius_m: u32,
    ranking_preset: &str,
    filters: Option<&SearchFilters>,
    multi_entity: Option<&MultiEntityQuery>,
) -> String {
    let mut parts: Vec<String> = vec![
        query.unwrap_or("").to_string(),
        format!("{lat:.6}"),
        format!("{lng:.6}"),
        radius_m.to_string(),
        ranking_preset.to_string(),
    ];

    if let Some(filters) = filters {
        parts.push(serde_json::to_string(filters).unwrap_or_default());
    }
    if let Some(multi_entity) = multi_entity {
        parts.push(serde_json::to_string(multi_entity).unwrap_or_default());
    }

    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("search:{}", &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::collections::BTreeMap;

    fn place(name: &str) -> Place {
        Place {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: None,
            lat: 37.77,
            lng: -122.41,
            rating: Some(4.5),
            user_rating_count: Some(100),
            price_level: Some(2),
            phone: None,
            website: None,
            maps_url: None,
            address: None,
            distance_km: Some(1.0),
            features: vec![],
            score: 80.0,
            max_possible_score: 100.0,
            evidence: BTreeMap::new(),
            user_requirements: vec![],
            requirements_matched: vec![],
            match_percentage: 100.0,
            provenance: vec![],
            matched_partners: vec![],
        }
    }

    fn result_store() -> ResultStore {
        ResultStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(900))
    }

    #[tokio::test]
    async fn stores_and_retrieves_exact_result_set() {
        let store = result_store();
        let stored = store
            .store_result_set(vec![place("A"), place("B")], None)
            .await
            .unwrap();

        let loaded = store
            .get_result_set(&stored.result_set_id.to_string())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn each_store_gets_a_fresh_id() {
        let store = result_store();
        let first = store.store_result_set(vec![place("A")], None).await.unwrap();
        let second = store.store_result_set(vec![place("A")], None).await.unwrap();

        assert_ne!(first.result_set_id, second.result_set_id);
    }

    #[tokio::test]
    async fn conversation_pointer_tracks_latest() {
        let store = result_store();
        let conversation = Some("conv-1".to_string());

        let _first = store
            .store_result_set(vec![place("A")], conversation.clone())
            .await
            .unwrap();
        let second = store
            .store_result_set(vec![place("B")], conversation)
            .await
            .unwrap();

        let latest = store
            .latest_for_conversation("conv-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.result_set_id, second.result_set_id);
        assert_eq!(latest.places[0].name, "B");
    }

    #[tokio::test]
    async fn missing_result_set_returns_none() {
        let store = result_store();
        assert!(store
            .get_result_set(&Uuid::new_v4().to_string())
            .await
            .unwrap()
            .is_none());
        assert!(store.latest_for_conversation("nope").await.unwrap().is_none());
    }

    #[test]
    fn cache_keys_are_deterministic_and_sensitive() {
        let base = generate_cache_key(Some("coffee"), 37.7749, -122.4194, 3000, "balanced", None, None);
        let same = generate_cache_key(Some("coffee"), 37.7749, -122.4194, 3000, "balanced", None, None);
        assert_eq!(base, same);
        assert!(base.starts_with("search:"));
        assert_eq!(base.len(), "search:".len() + 16);

        let other_query =
            generate_cache_key(Some("tea"), 37.7749, -122.4194, 3000, "balanced", None, None);
        assert_ne!(base, other_query);

        let other_preset =
            generate_cache_key(Some("coffee"), 37.7749, -122.4194, 3000, "nearby", None, None);
        assert_ne!(base, other_preset);

        let filters = SearchFilters {
            price: Some((1, 2)),
            ..Default::default()
        };
        let with_filters = generate_cache_key(
            Some("coffee"),
            37.7749,
            -122.4194,
            3000,
            "balanced",
            Some(&filters),
            None,
        );
        assert_ne!(base, with_filters);
    }
}
