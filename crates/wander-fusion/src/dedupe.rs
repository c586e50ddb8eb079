//! Cross-provider deduplication
//!
//! Two records are duplicates iff their normalized names are fuzzy-similar
//! (>= name threshold, 0-100 scale) AND they sit within the geo threshold
//! of each other. Connected components of the duplicate relation become
//! clusters; each cluster is collapsed to a representative with provenance
//! for every member.

use tracing::{debug, info};
use uuid::Uuid;
use wander_common::geo::haversine_m;
use wander_common::{FusedPlace, ProvenanceEntry, ProviderPlace};

const NAME_SUFFIXES: [&str; 7] = [
    ", inc",
    ", llc",
    " inc.",
    " llc.",
    " ltd.",
    " corporation",
    " corp.",
];

const PUNCTUATION: [char; 10] = ['.', ',', '!', '?', ';', ':', '"', '\'', '(', ')'];

/// Dedupe thresholds and provider preference order.
#[derive(Debug, Clone)]
pub struct DedupeConfig {
    /// Minimum partial name similarity, in [0, 100].
    pub name_threshold: f64,
    /// Maximum distance between duplicates, in meters.
    pub geo_threshold_m: f64,
    /// Representative tie-break order; earlier providers win.
    pub provider_preference: Vec<String>,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            name_threshold: 82.0,
            geo_threshold_m: 120.0,
            provider_preference: vec!["google".to_string(), "yelp".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupeStats {
    pub input_count: usize,
    pub output_count: usize,
    pub clusters_found: usize,
    pub duplicates_removed: usize,
}

/// Normalize a place name for comparison: lowercase, strip common business
/// suffixes and punctuation, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    let mut name = name.to_lowercase();

    for suffix in NAME_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.to_string();
        }
    }

    let cleaned: String = name.chars().filter(|c| !PUNCTUATION.contains(c)).collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token-set fuzzy ratio in [0, 100]: tolerates token reordering and
/// substring containment.
pub fn partial_name_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if longer.contains(shorter) {
        return 100.0;
    }

    let direct = strsim::normalized_levenshtein(a, b);

    let sorted_form = |s: &str| {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.dedup();
        tokens.join(" ")
    };
    let token_set = strsim::normalized_levenshtein(&sorted_form(a), &sorted_form(b));

    direct.max(token_set) * 100.0
}

/// Duplicate test over normalized names and haversine distance.
pub fn are_duplicates(a: &ProviderPlace, b: &ProviderPlace, config: &DedupeConfig) -> bool {
    let name_sim = partial_name_similarity(&normalize_name(&a.name), &normalize_name(&b.name));
    if name_sim < config.name_threshold {
        return false;
    }

    let geo_dist_m = haversine_m(a.lat, a.lng, b.lat, b.lng);
    let duplicate = geo_dist_m <= config.geo_threshold_m;

    if duplicate {
        debug!(
            name_a = %a.name,
            name_b = %b.name,
            name_sim,
            geo_dist_m,
            "duplicate found"
        );
    }

    duplicate
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, i: usize, j: usize) {
        let root_i = self.find(i);
        let root_j = self.find(j);
        if root_i != root_j {
            self.parent[root_j] = root_i;
        }
    }
}

/// Cluster all records by the duplicate relation. Cluster order follows the
/// index of each cluster's first member, so the output is deterministic for
/// a given input order.
pub fn cluster_places(
    places: Vec<ProviderPlace>,
    config: &DedupeConfig,
) -> Vec<Vec<ProviderPlace>> {
    let n = places.len();
    let mut uf = UnionFind::new(n);

    for i in 0..n {
        for j in (i + 1)..n {
            if are_duplicates(&places[i], &places[j], config) {
                uf.union(i, j);
            }
        }
    }

    let mut cluster_index: Vec<Option<usize>> = vec![None; n];
    let mut clusters: Vec<Vec<ProviderPlace>> = Vec::new();

    for (i, place) in places.into_iter().enumerate() {
        let root = uf.find(i);
        let slot = match cluster_index[root] {
            Some(slot) => slot,
            None => {
                cluster_index[root] = Some(clusters.len());
                clusters.push(Vec::new());
                clusters.len() - 1
            }
        };
        clusters[slot].push(place);
    }

    clusters
}

fn provider_rank(provider: &str, preference: &[String]) -> usize {
    preference
        .iter()
        .position(|p| p == provider)
        .unwrap_or(preference.len())
}

/// Pick the member that stands for the cluster: most reviews, then highest
/// rating, then provider preference. Stable, so ties keep input order.
pub fn select_representative<'a>(
    cluster: &'a [ProviderPlace],
    preference: &[String],
) -> &'a ProviderPlace {
    cluster
        .iter()
        .min_by(|a, b| {
            let reviews_a = a.user_rating_count.unwrap_or(0);
            let reviews_b = b.user_rating_count.unwrap_or(0);
            reviews_b
                .cmp(&reviews_a)
                .then_with(|| {
                    let rating_a = a.rating.unwrap_or(0.0);
                    let rating_b = b.rating.unwrap_or(0.0);
                    rating_b.partial_cmp(&rating_a).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| {
                    provider_rank(&a.provider, preference)
                        .cmp(&provider_rank(&b.provider, preference))
                })
        })
        .expect("cluster is never empty")
}

/// Provenance for every cluster member relative to the representative.
pub fn build_provenance(
    cluster: &[ProviderPlace],
    representative: &ProviderPlace,
) -> Vec<ProvenanceEntry> {
    let rep_name = normalize_name(&representative.name);

    cluster
        .iter()
        .map(|member| {
            let name_sim =
                partial_name_similarity(&normalize_name(&member.name), &rep_name) / 100.0;
            let geo_offset_m =
                haversine_m(member.lat, member.lng, representative.lat, representative.lng);

            ProvenanceEntry {
                provider: member.provider.clone(),
                provider_id: member.provider_id.clone(),
                name: member.name.clone(),
                name_similarity: name_sim,
                geo_offset_m: (geo_offset_m * 100.0).round() / 100.0,
                rating: member.rating,
                user_rating_count: member.user_rating_count,
            }
        })
        .collect()
}

/// Full dedupe: cluster, pick representatives, record provenance.
pub fn fuse_places(
    places: Vec<ProviderPlace>,
    config: &DedupeConfig,
) -> (Vec<FusedPlace>, DedupeStats) {
    if places.is_empty() {
        return (Vec::new(), DedupeStats::default());
    }

    let input_count = places.len();
    let clusters = cluster_places(places, config);

    let fused: Vec<FusedPlace> = clusters
        .into_iter()
        .map(|members| {
            let representative = select_representative(&members, &config.provider_preference).clone();
            let provenance = build_provenance(&members, &representative);
            FusedPlace {
                id: Uuid::new_v4(),
                representative,
                members,
                provenance,
            }
        })
        .collect();

    let stats = DedupeStats {
        input_count,
        output_count: fused.len(),
        clusters_found: fused.len(),
        duplicates_removed: input_count - fused.len(),
    };

    info!(
        input = stats.input_count,
        output = stats.output_count,
        removed = stats.duplicates_removed,
        "deduplication complete"
    );

    (fused, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(
        provider: &str,
        id: &str,
        name: &str,
        lat: f64,
        lng: f64,
    ) -> ProviderPlace {
        ProviderPlace::new(provider, id, name, lat, lng)
    }

    fn rated(mut p: ProviderPlace, rating: f64, reviews: u64) -> ProviderPlace {
        p.rating = Some(rating);
        p.user_rating_count = Some(reviews);
        p
    }

    #[test]
    fn normalize_name_cases() {
        assert_eq!(normalize_name("Blue Bottle Coffee, Inc."), "blue bottle coffee");
        assert_eq!(normalize_name("Starbucks Coffee"), "starbucks coffee");
        assert_eq!(normalize_name("Joe's Cafe!!!"), "joes cafe");
        assert_eq!(normalize_name("  Multiple   Spaces  "), "multiple spaces");
    }

    #[test]
    fn similarity_handles_reordering_and_containment() {
        assert_eq!(partial_name_similarity("blue bottle coffee", "blue bottle coffee"), 100.0);
        assert_eq!(partial_name_similarity("coffee blue bottle", "blue bottle coffee"), 100.0);
        assert_eq!(partial_name_similarity("starbucks", "starbucks coffee"), 100.0);
        assert!(partial_name_similarity("blue bottle coffee", "philz coffee") < 82.0);
        assert_eq!(partial_name_similarity("", "anything"), 0.0);
    }

    #[test]
    fn same_place_across_providers_is_duplicate() {
        let config = DedupeConfig::default();
        let a = place("google", "1", "Blue Bottle Coffee", 37.7749, -122.4194);
        let b = place("yelp", "2", "Blue Bottle Coffee", 37.7750, -122.4195);

        assert!(are_duplicates(&a, &b, &config));
        assert!(are_duplicates(&b, &a, &config), "relation must be symmetric");
        assert!(are_duplicates(&a, &a, &config), "relation must be reflexive");
    }

    #[test]
    fn different_names_at_same_spot_are_not_duplicates() {
        let config = DedupeConfig::default();
        let a = place("google", "1", "Blue Bottle Coffee", 37.7749, -122.4194);
        let b = place("yelp", "2", "Philz Coffee", 37.7749, -122.4194);

        assert!(!are_duplicates(&a, &b, &config));
    }

    #[test]
    fn same_name_far_apart_is_not_duplicate() {
        let config = DedupeConfig::default();
        let a = place("google", "1", "Starbucks", 37.7749, -122.4194);
        let b = place("yelp", "2", "Starbucks", 37.8749, -122.4194);

        assert!(!are_duplicates(&a, &b, &config));
    }

    #[test]
    fn clusters_cross_provider_duplicates() {
        let config = DedupeConfig::default();
        let places = vec![
            place("google", "1", "Blue Bottle Coffee", 37.7749, -122.4194),
            place("yelp", "2", "Blue Bottle Coffee", 37.7750, -122.4195),
            place("google", "3", "Starbucks", 37.7800, -122.4200),
        ];

        let clusters = cluster_places(places, &config);

        assert_eq!(clusters.len(), 2);
        let mut sizes: Vec<usize> = clusters.iter().map(|c| c.len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
        // Cluster order follows the first member's input index.
        assert_eq!(clusters[0][0].provider_id, "1");
        assert_eq!(clusters[1][0].provider_id, "3");
    }

    #[test]
    fn representative_prefers_review_volume() {
        let preference = vec!["google".to_string(), "yelp".to_string()];
        let cluster = vec![
            rated(place("yelp", "1", "Coffee Shop", 37.7749, -122.4194), 4.3, 50),
            rated(place("google", "2", "Coffee Shop", 37.7749, -122.4194), 4.5, 100),
        ];

        let representative = select_representative(&cluster, &preference);
        assert_eq!(representative.provider, "google");
        assert_eq!(representative.user_rating_count, Some(100));
    }

    #[test]
    fn representative_falls_back_to_provider_preference() {
        let preference = vec!["google".to_string(), "yelp".to_string()];
        let cluster = vec![
            rated(place("yelp", "1", "Coffee Shop", 37.7749, -122.4194), 4.5, 100),
            rated(place("google", "2", "Coffee Shop", 37.7749, -122.4194), 4.5, 100),
        ];

        let representative = select_representative(&cluster, &preference);
        assert_eq!(representative.provider, "google");
    }

    #[test]
    fn fuse_partitions_every_input_record() {
        let config = DedupeConfig::default();
        let places = vec![
            rated(place("google", "1", "Blue Bottle Coffee", 37.7749, -122.4194), 4.5, 100),
            rated(place("yelp", "2", "Blue Bottle Coffee", 37.7750, -122.4195), 4.3, 80),
            rated(place("google", "3", "Philz Coffee", 37.7800, -122.4200), 4.6, 200),
        ];

        let (fused, stats) = fuse_places(places, &config);

        assert_eq!(stats.input_count, 3);
        assert_eq!(stats.output_count, 2);
        assert_eq!(stats.duplicates_removed, 1);

        let member_total: usize = fused.iter().map(|f| f.members.len()).sum();
        assert_eq!(member_total, 3, "every record lands in exactly one cluster");

        for cluster in &fused {
            assert!(
                cluster.members.iter().any(|m| m == &cluster.representative),
                "representative must be a member of its own cluster"
            );
            assert_eq!(cluster.provenance.len(), cluster.members.len());
        }

        let blue_bottle = fused
            .iter()
            .find(|f| f.representative.name.contains("Blue Bottle"))
            .unwrap();
        assert_eq!(blue_bottle.members.len(), 2);
        assert_eq!(blue_bottle.representative.provider, "google");
    }

    #[test]
    fn provenance_of_representative_is_exact() {
        let config = DedupeConfig::default();
        let places = vec![
            rated(place("google", "1", "Blue Bottle Coffee", 37.7749, -122.4194), 4.5, 100),
            rated(place("yelp", "2", "Blue Bottle Coffee", 37.7750, -122.4195), 4.3, 80),
        ];

        let (fused, _) = fuse_places(places, &config);
        let cluster = &fused[0];

        let rep_entry = cluster
            .provenance
            .iter()
            .find(|entry| entry.provider_id == cluster.representative.provider_id)
            .unwrap();
        assert_eq!(rep_entry.name_similarity, 1.0);
        assert_eq!(rep_entry.geo_offset_m, 0.0);

        let other = cluster
            .provenance
            .iter()
            .find(|entry| entry.provider_id != cluster.representative.provider_id)
            .unwrap();
        assert!(other.geo_offset_m > 0.0 && other.geo_offset_m <= 120.0);
        assert!(other.name_similarity >= 0.82);
    }

    #[test]
    fn identical_places_at_identical_coordinates() {
        let config = DedupeConfig::default();
        let places = vec![
            place("google", "1", "Twin Cafe", 37.0, -122.0),
            place("yelp", "2", "Twin Cafe", 37.0, -122.0),
        ];

        let (fused, stats) = fuse_places(places, &config);
        assert_eq!(fused.len(), 1);
        assert_eq!(stats.duplicates_removed, 1);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let (fused, stats) = fuse_places(Vec::new(), &DedupeConfig::default());
        assert!(fused.is_empty());
        assert_eq!(stats, DedupeStats::default());
    }
}
