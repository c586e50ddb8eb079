//! Mock collaborators for tests
//!
//! Return synthetic responses without calling real APIs.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Embedder, Result, TextCompletion};

/// Completion mock returning a canned response for every call.
pub struct MockCompletion {
    response: String,
    fail: bool,
}

impl MockCompletion {
    pub fn new(response: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: response.into(),
            fail: false,
        })
    }

    /// A mock whose calls always error, for exercising fallback paths.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            response: String::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl TextCompletion for MockCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        if self.fail {
            anyhow::bail!("mock completion configured to fail");
        }
        Ok(self.response.clone())
    }
}

/// Embedding mock. Known texts return registered vectors; unknown texts get
/// a deterministic basis vector derived from their hash, so equal texts
/// agree and unrelated texts rarely collide.
pub struct MockEmbedder {
    vectors: HashMap<String, Vec<f64>>,
    fail: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            vectors: HashMap::new(),
            fail: true,
        }
    }

    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f64>) -> Self {
        self.vectors.insert(text.into().to_lowercase(), vector);
        self
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        if self.fail {
            anyhow::bail!("mock embedder configured to fail");
        }

        let key = text.trim().to_lowercase();
        if let Some(vector) = self.vectors.get(&key) {
            return Ok(vector.clone());
        }

        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % 16) as usize;

        let mut basis = vec![0.0; 16];
        basis[index] = 1.0;
        Ok(basis)
    }
}
