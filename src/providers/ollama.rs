use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatRequest, Provider, http_client, status_error, transport_error};
use crate::errors::ProviderError;

/// Ollama client for interacting with a local Ollama server
pub struct Ollama {
    /// Configured provider name
    name: String,
    /// Base URL of the Ollama API
    base_url: String,
    /// Model name
    model: String,
    /// HTTP client for making requests
    client: Client,
}

impl std::fmt::Debug for Ollama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ollama")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
}

impl GenerationRequest {
    /// Build a non-streaming request for one chat turn
    pub fn from_chat(model: &str, request: &ChatRequest) -> Self {
        Self {
            model: model.to_string(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options: request
                .temperature
                .map(|t| GenerationOptions { temperature: Some(t) }),
            stream: false,
        }
    }
}

impl Ollama {
    /// Create a new Ollama client
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            model: model.into(),
            client: http_client(timeout),
        }
    }

    /// Concatenate the `response` pieces of a JSONL (streamed) body
    fn parse_jsonl(response_text: &str) -> Option<String> {
        let mut full_response = String::new();
        let mut parsed_any = false;
        for line in response_text.lines().filter(|l| !l.trim().is_empty()) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
                if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
                    full_response.push_str(part);
                    parsed_any = true;
                }
            }
        }
        parsed_any.then_some(full_response)
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = GenerationRequest::from_chat(&self.model, request);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            error!("Ollama API error ({}): {}", status, response_text);
            return Err(status_error(status, response_text));
        }

        // Some server versions stream even when asked not to
        let text = match serde_json::from_str::<GenerationResponse>(&response_text) {
            Ok(generated) => generated.response,
            Err(e) => Self::parse_jsonl(&response_text).ok_or_else(|| {
                ProviderError::ParseError(format!("{}: {}", e, truncate(&response_text, 500)))
            })?,
        };

        Ok(text)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
