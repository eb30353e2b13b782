//! Completion client - integration with an Ollama-compatible LLM server
//!
//! The rest of the pipeline only sees the [`TextCompletion`] trait, so tests
//! can swap in deterministic stubs and the decision engine stays independent
//! of the wire format.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on a single completion call. The source system blocked
/// indefinitely; a timeout here is treated like an unparseable response.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Text-completion port: accepts a system instruction and a user message,
/// returns generated text.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Ollama API client
pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout: Duration,
    client: Client,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    system: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    /// Create a new client. `None` arguments fall back to a local Ollama
    /// instance and its default model.
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: model.unwrap_or_else(|| "llama3.2".to_string()),
            timeout: DEFAULT_COMPLETION_TIMEOUT,
            client: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TextCompletion for OllamaClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: user.to_string(),
            system: system.to_string(),
            stream: false,
            options: OllamaOptions {
                num_predict: 2048,
                // Low temperature for consistent decisions
                temperature: 0.1,
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to completion endpoint")?;

        let body: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        Ok(body.response)
    }
}

/// Extract a JSON object from a completion response, tolerating markdown
/// code fences and surrounding prose.
pub fn extract_json_block(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(end) = rest.find("```") {
            return rest[..end].trim().to_string();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(newline) = rest.find('\n') {
            if let Some(end) = rest[newline + 1..].find("```") {
                return rest[newline + 1..newline + 1 + end].trim().to_string();
            }
        }
    }

    // Fall back to the outermost brace pair
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}
