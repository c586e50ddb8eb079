//! wander-common - Shared types for the Wander discovery pipeline
//!
//! Defines the canonical data model exchanged between pipeline stages:
//! - `ProviderPlace`: normalized record emitted by provider adapters
//! - `FusedPlace` / `ScoredPlace`: dedupe and ranking outputs
//! - `Intent` / `Requirement`: structured query understanding
//! - Request/response schema shared by the pipeline and the HTTP layer
//! - `WanderError`: error taxonomy with stable RFC 7807 type tags

pub mod error;
pub mod geo;
pub mod types;

pub use error::*;
pub use types::*;
