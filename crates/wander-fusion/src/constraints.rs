//! Multi-entity constraint join
//!
//! The first entity of a multi-entity intent anchors the search; every
//! relation must find at least one partner place within its distance for
//! the anchor to survive. Relations whose left index is not the anchor are
//! ignored for backward compatibility with existing clients.

use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;
use wander_common::geo::haversine_m;
use wander_common::{EntitySpec, FusedPlace, MatchedPartner, Relation};

use crate::amenities::check_must_haves;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintStats {
    pub kept: usize,
    pub dropped: usize,
}

/// Filter fused places down to anchors whose partners satisfy every
/// relation. Returns the surviving anchors (fused-set order preserved),
/// the partners found for each surviving anchor, and kept/dropped counts.
pub fn apply_constraints(
    fused: Vec<FusedPlace>,
    entities: &[EntitySpec],
    relations: &[Relation],
    default_near_m: f64,
) -> (Vec<FusedPlace>, HashMap<Uuid, Vec<MatchedPartner>>, ConstraintStats) {
    if entities.len() <= 1 || relations.is_empty() {
        let kept = fused.len();
        return (fused, HashMap::new(), ConstraintStats { kept, dropped: 0 });
    }

    let anchor_entity = &entities[0];

    // Anchor candidates must carry the anchor's own must-haves.
    let anchors: Vec<&FusedPlace> = fused
        .iter()
        .filter(|candidate| {
            check_must_haves(&candidate.representative, &anchor_entity.must_haves).0
        })
        .collect();
    let anchor_count = anchors.len();

    let mut partners_by_anchor: HashMap<Uuid, Vec<MatchedPartner>> = HashMap::new();
    let mut kept_ids: Vec<Uuid> = Vec::new();

    for anchor in anchors {
        let mut partners: Vec<MatchedPartner> = Vec::new();
        let mut all_relations_satisfied = true;

        for relation in relations {
            // Anchor-centric join only; other relations are ignored.
            if relation.left != 0 {
                continue;
            }
            let Some(partner_entity) = entities.get(relation.right) else {
                all_relations_satisfied = false;
                break;
            };
            if relation.right == 0 {
                continue;
            }

            let max_distance_m = relation.distance_m.unwrap_or(default_near_m);
            let mut relation_satisfied = false;

            for candidate in &fused {
                if candidate.id == anchor.id {
                    continue;
                }

                let dist_m = haversine_m(
                    anchor.representative.lat,
                    anchor.representative.lng,
                    candidate.representative.lat,
                    candidate.representative.lng,
                );
                if dist_m > max_distance_m {
                    continue;
                }

                let (satisfied, matched) =
                    check_must_haves(&candidate.representative, &partner_entity.must_haves);
                if !satisfied {
                    continue;
                }

                relation_satisfied = true;
                partners.push(MatchedPartner {
                    kind: partner_entity.kind.clone(),
                    name: candidate.representative.name.clone(),
                    distance_m: (dist_m * 100.0).round() / 100.0,
                    matched_must_haves: matched,
                    lat: candidate.representative.lat,
                    lng: candidate.representative.lng,
                });
            }

            if !relation_satisfied {
                all_relations_satisfied = false;
                break;
            }
        }

        if all_relations_satisfied {
            debug!(
                anchor = %anchor.representative.name,
                partners = partners.len(),
                "anchor satisfied all relations"
            );
            partners_by_anchor.insert(anchor.id, partners);
            kept_ids.push(anchor.id);
        }
    }

    let kept_places: Vec<FusedPlace> = fused
        .into_iter()
        .filter(|place| kept_ids.contains(&place.id))
        .collect();

    let stats = ConstraintStats {
        kept: kept_places.len(),
        dropped: anchor_count - kept_places.len(),
    };

    info!(kept = stats.kept, dropped = stats.dropped, "constraint join complete");

    (kept_places, partners_by_anchor, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wander_common::{ProviderPlace, RelationPredicate};

    fn fused(name: &str, lat: f64, lng: f64, summary: &str) -> FusedPlace {
        let mut representative = ProviderPlace::new("google", name, name, lat, lng);
        if !summary.is_empty() {
            representative.amenities.editorial_summary = Some(summary.to_string());
        }
        FusedPlace {
            id: Uuid::new_v4(),
            members: vec![representative.clone()],
            provenance: Vec::new(),
            representative,
        }
    }

    fn entities() -> Vec<EntitySpec> {
        vec![
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
        ]
    }

    fn near_relation(distance_m: Option<f64>) -> Relation {
        Relation {
            left: 0,
            right: 1,
            predicate: RelationPredicate::Near,
            distance_m,
        }
    }

    #[test]
    fn anchor_with_nearby_partner_is_kept() {
        // ~220 m apart at this latitude.
        let places = vec![
            fused("Family Diner", 37.7749, -122.4194, "family friendly spot"),
            fused("Dolores Park", 37.7769, -122.4194, "park with a playground"),
        ];

        let (kept, partners, stats) =
            apply_constraints(places, &entities(), &[near_relation(None)], 500.0);

        assert_eq!(stats, ConstraintStats { kept: 1, dropped: 0 });
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].representative.name, "Family Diner");

        let found = &partners[&kept[0].id];
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, "park");
        assert_eq!(found[0].name, "Dolores Park");
        assert!(found[0].distance_m > 0.0 && found[0].distance_m <= 500.0);
        assert_eq!(found[0].matched_must_haves, vec!["playground"]);
    }

    #[test]
    fn anchor_without_partner_in_range_is_dropped() {
        // ~1.1 km apart, beyond the default 500 m.
        let places = vec![
            fused("Family Diner", 37.7749, -122.4194, "family friendly spot"),
            fused("Dolores Park", 37.7849, -122.4194, "park with a playground"),
        ];

        let (kept, partners, stats) =
            apply_constraints(places, &entities(), &[near_relation(None)], 500.0);

        assert!(kept.is_empty());
        assert!(partners.is_empty());
        assert_eq!(stats, ConstraintStats { kept: 0, dropped: 1 });
    }

    #[test]
    fn within_distance_uses_relation_distance() {
        let places = vec![
            fused("Family Diner", 37.7749, -122.4194, "family friendly spot"),
            fused("Dolores Park", 37.7849, -122.4194, "park with a playground"),
        ];

        let relation = Relation {
            left: 0,
            right: 1,
            predicate: RelationPredicate::WithinDistance,
            distance_m: Some(2000.0),
        };
        let (kept, _, _) = apply_constraints(places, &entities(), &[relation], 500.0);

        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn partner_must_haves_filter_candidates() {
        // The nearby park lacks a playground.
        let places = vec![
            fused("Family Diner", 37.7749, -122.4194, "family friendly spot"),
            fused("Quiet Green", 37.7752, -122.4194, "a calm lawn"),
        ];

        let (kept, _, stats) =
            apply_constraints(places, &entities(), &[near_relation(None)], 500.0);

        assert!(kept.is_empty());
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn every_relation_must_be_satisfied() {
        let mut three_entities = entities();
        three_entities.push(EntitySpec {
            kind: "cafe".into(),
            must_haves: vec!["wifi".into()],
            filters: None,
        });

        // A park nearby, but no wifi cafe anywhere.
        let places = vec![
            fused("Family Diner", 37.7749, -122.4194, "family friendly spot"),
            fused("Dolores Park", 37.7752, -122.4194, "park with a playground"),
        ];

        let relations = vec![
            near_relation(None),
            Relation {
                left: 0,
                right: 2,
                predicate: RelationPredicate::Near,
                distance_m: None,
            },
        ];

        let (kept, _, _) = apply_constraints(places, &three_entities, &relations, 500.0);
        assert!(kept.is_empty());
    }

    #[test]
    fn non_anchor_relations_are_ignored() {
        let places = vec![
            fused("Family Diner", 37.7749, -122.4194, "family friendly spot"),
            fused("Dolores Park", 37.7752, -122.4194, "park with a playground"),
        ];

        let relations = vec![
            near_relation(None),
            Relation {
                left: 1,
                right: 0,
                predicate: RelationPredicate::Near,
                distance_m: None,
            },
        ];

        let (kept, _, _) = apply_constraints(places, &entities(), &relations, 500.0);
        assert_eq!(kept.len(), 1, "the left != 0 relation must not drop the anchor");
    }

    #[test]
    fn all_qualifying_partners_are_recorded_in_order() {
        let places = vec![
            fused("Family Diner", 37.7749, -122.4194, "family friendly spot"),
            fused("North Playground Park", 37.7752, -122.4194, "playground and lawns"),
            fused("South Playground Park", 37.7746, -122.4194, "small playground"),
        ];

        let (kept, partners, _) =
            apply_constraints(places, &entities(), &[near_relation(None)], 500.0);

        let found = &partners[&kept[0].id];
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "North Playground Park");
        assert_eq!(found[1].name, "South Playground Park");
    }

    #[test]
    fn single_entity_passes_through() {
        let places = vec![fused("Solo Cafe", 37.0, -122.0, "")];
        let single = vec![EntitySpec {
            kind: "cafe".into(),
            must_haves: vec![],
            filters: None,
        }];

        let (kept, partners, stats) = apply_constraints(places, &single, &[], 500.0);
        assert_eq!(kept.len(), 1);
        assert!(partners.is_empty());
        assert_eq!(stats, ConstraintStats { kept: 1, dropped: 0 });
    }
}
