//! Weighted preset ranking
//!
//! Base signals (rating, review volume, distance) draw from a 100-point
//! budget split by preset; a fitting price level adds 5 points and every
//! matched requirement adds 10 x confidence. The final sort is total and
//! deterministic.

use std::collections::BTreeMap;

use tracing::info;
use wander_common::{FusedPlace, Requirement, ScoredPlace, SearchFilters};
use wander_llm::Embedder;

use crate::matcher::{match_requirement, REQUIREMENT_BONUS_POINTS};

const PRICE_FIT_BONUS: f64 = 5.0;
const MAX_DISTANCE_KM: f64 = 10.0;

/// Base point split over (rating, reviews, distance); always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingPreset {
    pub name: &'static str,
    pub rating: f64,
    pub reviews: f64,
    pub distance: f64,
}

pub const BALANCED: RankingPreset = RankingPreset {
    name: "balanced",
    rating: 55.0,
    reviews: 30.0,
    distance: 15.0,
};

pub const NEARBY: RankingPreset = RankingPreset {
    name: "nearby",
    rating: 35.0,
    reviews: 20.0,
    distance: 45.0,
};

pub const REVIEW_HEAVY: RankingPreset = RankingPreset {
    name: "review-heavy",
    rating: 45.0,
    reviews: 50.0,
    distance: 5.0,
};

impl RankingPreset {
    /// Resolve a preset by name; unknown names get the balanced split.
    pub fn from_name(name: &str) -> Self {
        match name {
            "nearby" => NEARBY,
            "review-heavy" => REVIEW_HEAVY,
            _ => BALANCED,
        }
    }
}

/// Score every fused place, match requirements, and sort.
///
/// Requirement matching uses the embedder when present and degrades to the
/// synchronous methods otherwise.
pub async fn rank_places(
    fused: Vec<FusedPlace>,
    preset: RankingPreset,
    filters: Option<&SearchFilters>,
    requirements: &[Requirement],
    embedder: Option<&dyn Embedder>,
    semantic_threshold: f64,
) -> Vec<ScoredPlace> {
    let max_possible_score =
        100.0 + REQUIREMENT_BONUS_POINTS * requirements.len() as f64;

    let mut scored: Vec<ScoredPlace> = Vec::with_capacity(fused.len());

    for place in fused {
        let representative = &place.representative;
        let mut evidence: BTreeMap<String, f64> = BTreeMap::new();

        let rating_pts = representative
            .rating
            .map(|rating| (rating / 5.0) * preset.rating)
            .unwrap_or(0.0);
        evidence.insert("rating".to_string(), round4(rating_pts));

        let review_pts = representative
            .user_rating_count
            .filter(|count| *count > 0)
            .map(|count| ((1.0 + count as f64).ln() / 8.0).min(1.0) * preset.reviews)
            .unwrap_or(0.0);
        evidence.insert("reviews".to_string(), round4(review_pts));

        let distance_km = representative.distance_km.unwrap_or(0.0);
        let distance_pts =
            (1.0 - distance_km.min(MAX_DISTANCE_KM) / MAX_DISTANCE_KM).max(0.0) * preset.distance;
        evidence.insert("distance".to_string(), round4(distance_pts));

        let mut score = rating_pts + review_pts + distance_pts;

        if let Some((min_price, max_price)) = filters.and_then(|f| f.price) {
            if let Some(level) = representative.price_level {
                if min_price <= level && level <= max_price {
                    score += PRICE_FIT_BONUS;
                    evidence.insert("price_fit".to_string(), PRICE_FIT_BONUS);
                }
            }
        }

        let mut requirement_matches = Vec::with_capacity(requirements.len());
        let mut requirement_bonus = 0.0;
        for requirement in requirements {
            let verdict =
                match_requirement(requirement, representative, embedder, semantic_threshold).await;
            requirement_bonus += verdict.bonus_points;
            requirement_matches.push(verdict);
        }
        if !requirements.is_empty() {
            evidence.insert("requirement_bonus".to_string(), round4(requirement_bonus));
        }
        score += requirement_bonus;

        let matched = requirement_matches.iter().filter(|m| m.matched).count();
        let match_percentage = if requirements.is_empty() {
            100.0
        } else {
            (matched as f64 / requirements.len() as f64) * 100.0
        };

        scored.push(ScoredPlace {
            fused: place,
            score: score.min(max_possible_score),
            evidence,
            requirement_matches,
            max_possible_score,
            match_percentage,
        });
    }

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let rating_a = a.fused.representative.rating.unwrap_or(0.0);
                let rating_b = b.fused.representative.rating.unwrap_or(0.0);
                rating_b
                    .partial_cmp(&rating_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| {
                let reviews_a = a.fused.representative.user_rating_count.unwrap_or(0);
                let reviews_b = b.fused.representative.user_rating_count.unwrap_or(0);
                reviews_b.cmp(&reviews_a)
            })
            .then_with(|| {
                let dist_a = a.fused.representative.distance_km.unwrap_or(f64::MAX);
                let dist_b = b.fused.representative.distance_km.unwrap_or(f64::MAX);
                dist_a
                    .partial_cmp(&dist_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    info!(
        preset = preset.name,
        count = scored.len(),
        top_score = scored.first().map(|s| s.score).unwrap_or(0.0),
        "ranking complete"
    );

    scored
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
