/*!
 * Error types for the litrans application.
 *
 * The pipeline distinguishes between failures it recovers from locally
 * (transport and validation failures inside the retry loop) and failures that
 * must stop the run (configuration errors). Both are defined here with
 * the thiserror crate.
 */

use thiserror::Error;

use crate::validation::ValidationIssue;

/// Errors that can occur when talking to a provider backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting or exhausted quota
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend answered without any text content
    #[error("Provider returned no text content")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether this failure signals a rate or quota condition.
    ///
    /// Quota failures do not count against a provider's attempt budget.
    pub fn is_quota(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, message } => {
                *status_code == 429 || message.to_lowercase().contains("quota")
            }
            Self::RequestFailed(message) => message.to_lowercase().contains("quota"),
            _ => false,
        }
    }
}

/// Reason a single translation attempt was rejected.
///
/// Consumed by the retry loop of the provider chain; never returned to callers.
#[derive(Error, Debug)]
pub enum AttemptFailure {
    /// The provider call itself failed
    #[error("transport failure: {0}")]
    Transport(#[from] ProviderError),

    /// The provider answered but the candidate failed the quality heuristics
    #[error("validation failure ({issue}): {candidate}")]
    Validation {
        /// Rejected candidate text
        candidate: String,
        /// Heuristic that rejected it
        issue: ValidationIssue,
    },
}

/// Fatal configuration problems. These are never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Provider kind not known to this build
    #[error("Unknown provider '{0}' (expected openai, anthropic, ollama or relay)")]
    UnknownProvider(String),

    /// Access type that has no implementation
    #[error("Provider '{name}' uses unsupported access type '{access}'")]
    UnsupportedAccess {
        /// Configured provider name
        name: String,
        /// Access type found in the configuration
        access: String,
    },

    /// A hosted provider was configured without credentials
    #[error("Provider '{0}' requires an API key")]
    MissingApiKey(String),

    /// A relay provider was configured without an endpoint
    #[error("Provider '{0}' requires an endpoint")]
    MissingEndpoint(String),

    /// No provider configured at all
    #[error("At least one translation provider must be configured")]
    NoProviders,

    /// A numeric or textual setting is out of range
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Name of the offending setting
        field: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the fragment cache store
    #[error("Cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
