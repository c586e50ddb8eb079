//! OpenAI-compatible chat completion client

use async_trait::async_trait;
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Result, TextCompletion};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// HTTP client for the OpenAI chat completions endpoint (or any compatible
/// server). Requests JSON-object output and a low temperature; callers parse
/// the returned string strictly and fall back on failure.
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl TextCompletion for OpenAiCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.1,
            "max_tokens": 800,
            "response_format": { "type": "json_object" },
        });

        debug!(model = %self.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to send completion request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("completion endpoint returned {status}: {error_text}");
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("failed to decode completion response")?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .context("completion response had no choices")?;

        Ok(choice.message.content)
    }
}
