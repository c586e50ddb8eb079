//! wander-llm - LLM collaborators for the discovery pipeline
//!
//! The pipeline treats language models as optional collaborators behind two
//! narrow traits: `TextCompletion` (chat-style JSON extraction) and
//! `Embedder` (vector embeddings for semantic matching). Every consumer has
//! a deterministic fallback, so the pipeline keeps working when neither is
//! configured.

pub mod completion;
pub mod embedding;
pub mod followup;
pub mod intent;
pub mod mock;
pub mod prompts;

pub use completion::OpenAiCompletionClient;
pub use embedding::{cosine_similarity, CachedEmbedder, OpenAiEmbedder};
pub use followup::{FollowupIntent, FollowupParser, SortBy};
pub use intent::IntentExtractor;
pub use mock::{MockCompletion, MockEmbedder};

use async_trait::async_trait;

/// Canonical result alias for collaborator calls.
pub type Result<T> = anyhow::Result<T>;

/// Chat-style completion collaborator, prompted for strict JSON output.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Text embedding collaborator.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>>;
}
