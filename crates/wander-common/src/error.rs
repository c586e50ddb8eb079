//! Error taxonomy shared across the pipeline
//!
//! Every variant carries a stable string tag surfaced in RFC 7807 problem
//! responses. Only `Validation` and `NotFound` are surfaced before pipeline
//! work; provider and extractor failures are absorbed inside the pipeline
//! and reduce quality, not availability.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WanderError {
    /// Upstream provider call failed after retries.
    #[error("{provider} provider error: {message}")]
    Provider { provider: String, message: String },

    /// Request schema or range violation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced result set or place is absent from the live cache.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// LLM or embedding collaborator unavailable; recovered internally.
    #[error("extractor unavailable: {0}")]
    Extractor(String),

    #[error("{0}")]
    Internal(String),
}

impl WanderError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Stable machine-readable tag for the `type` member of a problem detail.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Provider { .. } => "provider-error",
            Self::Validation(_) => "validation-error",
            Self::NotFound { .. } => "not-found",
            Self::Extractor(_) => "extractor-error",
            Self::Internal(_) => "internal-error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Provider { .. } => 502,
            Self::Validation(_) => 422,
            Self::NotFound { .. } => 404,
            Self::Extractor(_) => 503,
            Self::Internal(_) => 500,
        }
    }
}

/// RFC 7807 problem detail payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl ProblemDetail {
    pub fn from_error(error: &WanderError, trace_id: impl Into<String>) -> Self {
        let title = match error {
            WanderError::Provider { .. } => "Provider Error",
            WanderError::Validation(_) => "Validation Error",
            WanderError::NotFound { .. } => "Not Found",
            WanderError::Extractor(_) => "Extractor Error",
            WanderError::Internal(_) => "Internal Error",
        };

        let mut extensions = BTreeMap::new();
        if let WanderError::Provider { provider, .. } = error {
            extensions.insert(
                "provider".to_string(),
                serde_json::Value::String(provider.clone()),
            );
        }
        if let WanderError::NotFound { resource, id } = error {
            extensions.insert(
                "resource".to_string(),
                serde_json::Value::String(resource.clone()),
            );
            extensions.insert("identifier".to_string(), serde_json::Value::String(id.clone()));
        }

        Self {
            error_type: error.error_type().to_string(),
            title: title.to_string(),
            status: error.status_code(),
            detail: error.to_string(),
            trace_id: Some(trace_id.into()),
            extensions,
        }
    }
}
