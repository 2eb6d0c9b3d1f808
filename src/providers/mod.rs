/*!
 * Provider implementations for different translation backends.
 *
 * This module contains client implementations for the supported backends:
 * - OpenAI: OpenAI-compatible chat completions
 * - Anthropic: Anthropic messages API
 * - Ollama: Local LLM server
 * - Relay: aggregator speaking the OpenAI wire format at a custom endpoint
 *
 * Every backend exposes the same single operation, [`Provider::send`]. The
 * concrete variant is chosen once from configuration into a
 * [`ProviderClient`].
 */

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt::Debug;
use std::time::Duration;

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::{ConfigError, ProviderError};

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use anthropic::Anthropic;
pub use mock::MockProvider;
pub use ollama::Ollama;
pub use openai::OpenAI;

/// One chat turn sent to a backend.
///
/// Built fresh for every call; providers keep no conversation history.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Optional system prompt
    pub system: Option<String>,
    /// User prompt (instruction + source text)
    pub prompt: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Create a request carrying only a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
        }
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        let system = system.into();
        self.system = if system.trim().is_empty() { None } else { Some(system) };
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Common trait for all translation backends
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Configured provider name, used in logs and attempt records
    fn name(&self) -> &str;

    /// Send one request and return the response text
    async fn send(&self, request: &ChatRequest) -> Result<String, ProviderError>;
}

/// Concrete backend selected from configuration
#[derive(Debug)]
pub enum ProviderClient {
    OpenAI(OpenAI),
    Anthropic(Anthropic),
    Ollama(Ollama),
    /// OpenAI wire format at a mandatory custom endpoint
    Relay(OpenAI),
}

impl ProviderClient {
    /// Resolve a provider entry into a client; fails fast on bad configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let endpoint = config.resolved_endpoint()?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = match config.kind()? {
            ProviderKind::OpenAI => ProviderClient::OpenAI(OpenAI::new(
                &config.name,
                &config.api_key,
                &config.model,
                endpoint,
                timeout,
            )),
            ProviderKind::Relay => ProviderClient::Relay(OpenAI::new(
                &config.name,
                &config.api_key,
                &config.model,
                endpoint,
                timeout,
            )),
            ProviderKind::Anthropic => ProviderClient::Anthropic(Anthropic::new(
                &config.name,
                &config.api_key,
                &config.model,
                endpoint,
                timeout,
            )),
            ProviderKind::Ollama => ProviderClient::Ollama(Ollama::new(
                &config.name,
                &config.model,
                endpoint,
                timeout,
            )),
        };

        Ok(client)
    }
}

#[async_trait]
impl Provider for ProviderClient {
    fn name(&self) -> &str {
        match self {
            ProviderClient::OpenAI(p) | ProviderClient::Relay(p) => p.name(),
            ProviderClient::Anthropic(p) => p.name(),
            ProviderClient::Ollama(p) => p.name(),
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        match self {
            ProviderClient::OpenAI(p) | ProviderClient::Relay(p) => p.send(request).await,
            ProviderClient::Anthropic(p) => p.send(request).await,
            ProviderClient::Ollama(p) => p.send(request).await,
        }
    }
}

/// Build an HTTP client with the configured timeout
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Map a non-success HTTP status to a provider error
pub(crate) fn status_error(status: StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        429 => ProviderError::RateLimitExceeded(body),
        401 | 403 => ProviderError::AuthenticationError(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Map a reqwest transport error to a provider error
pub(crate) fn transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}
