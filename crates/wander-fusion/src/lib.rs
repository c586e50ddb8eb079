//! wander-fusion - Fusion core of the discovery pipeline
//!
//! Pure, deterministic algorithms between the provider fan-out and the
//! response formatter:
//! - `dedupe`: cross-provider clustering with union-find and fuzzy names
//! - `amenities`: amenity alias vocabulary and must-have checking
//! - `constraints`: multi-entity spatial joins
//! - `matcher`: 4-method requirement matching with graceful degradation
//! - `ranking`: weighted preset scoring with requirement bonuses

pub mod amenities;
pub mod constraints;
pub mod dedupe;
pub mod matcher;
pub mod ranking;

pub use constraints::{apply_constraints, ConstraintStats};
pub use dedupe::{fuse_places, DedupeConfig, DedupeStats};
pub use matcher::match_requirement;
pub use ranking::{rank_places, RankingPreset};
