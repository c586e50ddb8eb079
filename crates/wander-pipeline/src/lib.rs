//! wander-pipeline - The staged discovery pipeline
//!
//! Request flow: parse intent, plan provider calls, fan out, fuse and
//! dedupe, apply multi-entity constraints, match requirements and rank,
//! validate, format. Follow-ups bypass the providers entirely and refine a
//! stored result set.

pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod refiner;
pub mod service;
pub mod testing;

pub use executor::{FanOutExecutor, FanOutResult};
pub use pipeline::DiscoveryPipeline;
pub use planner::{Planner, ProviderParams, SearchPlan};
pub use refiner::apply_followup_filters;
pub use service::{RequestKind, SearchService};
