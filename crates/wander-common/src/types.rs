//! Canonical data model for the discovery pipeline

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Boolean amenity flags with a closed vocabulary.
///
/// Provider adapters map loose upstream JSON into this struct; nothing past
/// the adapter sees raw provider payloads. The `parking` and `payment`
/// sub-maps carry upstream option keys (e.g. `free_parking_lot`) with
/// boolean values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredAmenities {
    #[serde(default)]
    pub outdoor_seating: bool,
    #[serde(default)]
    pub good_for_children: bool,
    #[serde(default)]
    pub good_for_groups: bool,
    #[serde(default)]
    pub allows_dogs: bool,
    #[serde(default)]
    pub reservable: bool,
    #[serde(default)]
    pub serves_beer: bool,
    #[serde(default)]
    pub serves_breakfast: bool,
    #[serde(default)]
    pub serves_brunch: bool,
    #[serde(default)]
    pub serves_dinner: bool,
    #[serde(default)]
    pub serves_lunch: bool,
    #[serde(default)]
    pub serves_vegetarian_food: bool,
    #[serde(default)]
    pub serves_wine: bool,
    #[serde(default)]
    pub takeout: bool,
    #[serde(default)]
    pub delivery: bool,
    #[serde(default)]
    pub dine_in: bool,
    #[serde(default)]
    pub wheelchair_accessible: bool,
    #[serde(default)]
    pub wifi: bool,
    #[serde(default)]
    pub live_music: bool,

    /// Free-text description from the provider, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editorial_summary: Option<String>,

    /// Parking options keyed by upstream option name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parking: BTreeMap<String, bool>,

    /// Payment options keyed by upstream option name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub payment: BTreeMap<String, bool>,
}

impl StructuredAmenities {
    /// Look up a boolean flag by its field name.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match name {
            "outdoor_seating" => Some(self.outdoor_seating),
            "good_for_children" => Some(self.good_for_children),
            "good_for_groups" => Some(self.good_for_groups),
            "allows_dogs" => Some(self.allows_dogs),
            "reservable" => Some(self.reservable),
            "serves_beer" => Some(self.serves_beer),
            "serves_breakfast" => Some(self.serves_breakfast),
            "serves_brunch" => Some(self.serves_brunch),
            "serves_dinner" => Some(self.serves_dinner),
            "serves_lunch" => Some(self.serves_lunch),
            "serves_vegetarian_food" => Some(self.serves_vegetarian_food),
            "serves_wine" => Some(self.serves_wine),
            "takeout" => Some(self.takeout),
            "delivery" => Some(self.delivery),
            "dine_in" => Some(self.dine_in),
            "wheelchair_accessible" => Some(self.wheelchair_accessible),
            "wifi" => Some(self.wifi),
            "live_music" => Some(self.live_music),
            _ => None,
        }
    }

    /// Names of all flags that are set, in declaration order.
    pub fn true_flags(&self) -> Vec<&'static str> {
        const FIELDS: [&str; 18] = [
            "outdoor_seating",
            "good_for_children",
            "good_for_groups",
            "allows_dogs",
            "reservable",
            "serves_beer",
            "serves_breakfast",
            "serves_brunch",
            "serves_dinner",
            "serves_lunch",
            "serves_vegetarian_food",
            "serves_wine",
            "takeout",
            "delivery",
            "dine_in",
            "wheelchair_accessible",
            "wifi",
            "live_music",
        ];
        FIELDS
            .iter()
            .filter(|f| self.flag(f) == Some(true))
            .copied()
            .collect()
    }

    pub fn has_parking(&self) -> bool {
        self.parking.values().any(|v| *v)
    }

    pub fn has_payment(&self) -> bool {
        self.payment.values().any(|v| *v)
    }
}

/// Normalized place record emitted by a provider adapter.
///
/// `(provider, provider_id)` is unique within one provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPlace {
    pub provider: String,
    pub provider_id: String,
    pub name: String,
    pub category: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub rating: Option<f64>,
    pub user_rating_count: Option<u64>,
    pub price_level: Option<u8>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub maps_url: Option<String>,
    pub address: Option<String>,
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub amenities: StructuredAmenities,
}

impl ProviderPlace {
    /// Create a minimal record; optional fields start empty.
    pub fn new(
        provider: impl Into<String>,
        provider_id: impl Into<String>,
        name: impl Into<String>,
        lat: f64,
        lng: f64,
    ) -> Self {
        Self {
            provider: provider.into(),
            provider_id: provider_id.into(),
            name: name.into(),
            category: None,
            lat,
            lng,
            rating: None,
            user_rating_count: None,
            price_level: None,
            phone: None,
            website: None,
            maps_url: None,
            address: None,
            distance_km: None,
            types: Vec::new(),
            amenities: StructuredAmenities::default(),
        }
    }
}

/// Spatial predicate between two entities of a multi-entity query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationPredicate {
    #[serde(rename = "NEAR")]
    Near,
    #[serde(rename = "WITHIN_DISTANCE")]
    WithinDistance,
}

/// Relation between two entities, by index into the entity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub left: usize,
    pub right: usize,
    #[serde(rename = "relation")]
    pub predicate: RelationPredicate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

/// One entity of a multi-entity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Place kind, e.g. "restaurant" or "park".
    pub kind: String,
    /// Amenity names the entity must carry; a candidate failing any is dropped.
    #[serde(default)]
    pub must_haves: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
}

/// Structured search intent produced by the intent extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    Simple {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
    MultiEntity {
        entities: Vec<EntitySpec>,
        #[serde(default)]
        relations: Vec<Relation>,
    },
}

impl Intent {
    pub fn simple(query: impl Into<String>) -> Self {
        Intent::Simple {
            query: query.into(),
            category: None,
        }
    }

    /// Check structural invariants: relation indices in range,
    /// WITHIN_DISTANCE relations carrying a distance.
    pub fn validate(&self) -> Result<(), String> {
        if let Intent::MultiEntity {
            entities,
            relations,
        } = self
        {
            if entities.is_empty() {
                return Err("multi-entity intent requires at least one entity".into());
            }
            for relation in relations {
                if relation.left >= entities.len() || relation.right >= entities.len() {
                    return Err(format!(
                        "relation index out of range: {} -> {}",
                        relation.left, relation.right
                    ));
                }
                if relation.predicate == RelationPredicate::WithinDistance
                    && relation.distance_m.is_none()
                {
                    return Err("WITHIN_DISTANCE relation requires distance_m".into());
                }
            }
        }
        Ok(())
    }
}

/// Requirement category: physical amenity vs subjective attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementCategory {
    Feature,
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

/// A user-stated want extracted from the query, e.g. "WiFi".
///
/// Unmet requirements never drop a candidate, they only reduce its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "requirement")]
    pub name: String,
    pub category: RequirementCategory,
    /// Lowercased keyword set, in extraction order.
    pub keywords: Vec<String>,
    pub importance: Importance,
}

/// Which matcher method produced a requirement verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Structured,
    Keyword,
    Semantic,
    Editorial,
    None,
}

/// Verdict of the requirement matcher for one (place, requirement) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRequirement {
    pub requirement: String,
    pub matched: bool,
    pub method: MatchMethod,
    pub confidence: f64,
    pub bonus_points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// Cluster membership record kept for every fused place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub provider: String,
    pub provider_id: String,
    pub name: String,
    /// Name similarity to the cluster representative, in [0, 1].
    pub name_similarity: f64,
    /// Distance to the representative in meters.
    pub geo_offset_m: f64,
    pub rating: Option<f64>,
    pub user_rating_count: Option<u64>,
}

/// A dedupe cluster collapsed to its representative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedPlace {
    pub id: Uuid,
    pub representative: ProviderPlace,
    pub members: Vec<ProviderPlace>,
    pub provenance: Vec<ProvenanceEntry>,
}

/// Partner place that satisfied a multi-entity relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPartner {
    pub kind: String,
    pub name: String,
    pub distance_m: f64,
    #[serde(default)]
    pub matched_must_haves: Vec<String>,
    pub lat: f64,
    pub lng: f64,
}

/// Fused place with ranking output attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPlace {
    pub fused: FusedPlace,
    pub score: f64,
    /// Per-signal score contributions, keyed by signal name.
    pub evidence: BTreeMap<String, f64>,
    pub requirement_matches: Vec<MatchedRequirement>,
    pub max_possible_score: f64,
    pub match_percentage: f64,
}

/// Canonical place surfaced by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub rating: Option<f64>,
    pub user_rating_count: Option<u64>,
    pub price_level: Option<u8>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub maps_url: Option<String>,
    pub address: Option<String>,
    pub distance_km: Option<f64>,
    /// Amenity feature names present on the place.
    #[serde(default)]
    pub features: Vec<String>,
    pub score: f64,
    pub max_possible_score: f64,
    #[serde(default)]
    pub evidence: BTreeMap<String, f64>,
    #[serde(default)]
    pub user_requirements: Vec<String>,
    #[serde(default)]
    pub requirements_matched: Vec<MatchedRequirement>,
    pub match_percentage: f64,
    #[serde(default)]
    pub provenance: Vec<ProvenanceEntry>,
    #[serde(default)]
    pub matched_partners: Vec<MatchedPartner>,
}

/// Stored output of one search, re-referenced by follow-ups until TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub result_set_id: Uuid,
    pub places: Vec<Place>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Request-level filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Inclusive price range, both ends in 0..=4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<(u8, u8)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Multi-entity query block of a search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiEntityQuery {
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Full,
    Deterministic,
}

/// Conversation context carried by follow-up requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_set_id: Option<String>,
    #[serde(default)]
    pub follow_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_mode: Option<AgentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_preset: Option<String>,
}

fn default_radius_m() -> u32 {
    3000
}

fn default_top_k() -> usize {
    30
}

/// Search request as received by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius_m")]
    pub radius_m: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_entity: Option<MultiEntityQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<SearchContext>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Result-quality assessment attached to the debug block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationInfo {
    pub valid: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub expand_search: bool,
}

/// Diagnostic block returned with every search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchDebug {
    /// Per-stage wall time in milliseconds.
    #[serde(default)]
    pub timings: BTreeMap<String, f64>,
    pub cache_hit: bool,
    pub trace_id: String,
    #[serde(default)]
    pub counts_before_after: BTreeMap<String, i64>,
    pub ranking_preset: String,
    #[serde(default)]
    pub constraints_satisfied: BTreeMap<String, i64>,
    pub agent_mode: String,
    #[serde(default)]
    pub validation: ValidationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub places: Vec<Place>,
    pub debug: SearchDebug,
    pub result_set_id: String,
}
