use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::ConfigError;

/// Application configuration module
/// This module handles loading, defaulting and validating the settings that
/// drive one document translation run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Name of the document; selects `<output_root>/<document_title>/`
    #[serde(default = "default_document_title")]
    pub document_title: String,

    /// Root directory holding one working directory per document
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// How a provider is reached
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    #[default]
    Api,
    Web,
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Web => write!(f, "web"),
        }
    }
}

/// Backend family of a configured provider, resolved once at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions API
    OpenAI,
    /// Anthropic messages API
    Anthropic,
    /// Local Ollama server
    Ollama,
    /// Aggregator speaking the OpenAI wire format at a custom endpoint
    Relay,
}

impl ProviderKind {
    /// Capitalized provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
            Self::Relay => "Relay",
        }
    }

    /// Whether requests must carry an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic | Self::Relay)
    }

    /// Endpoint used when none is configured
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Anthropic => Some("https://api.anthropic.com"),
            Self::Ollama => Some("http://localhost:11434"),
            Self::Relay => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
            Self::Relay => "relay",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "relay" => Ok(Self::Relay),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// One entry of the ordered provider fallback list
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Display name used in logs
    pub name: String,

    /// Access type; only `api` is implemented
    #[serde(rename = "type", default)]
    pub access: AccessType,

    /// Backend family (openai, anthropic, ollama, relay)
    pub provider: String,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model identifier
    #[serde(default)]
    pub model: String,

    /// Attempts allowed before falling through to the next provider
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Service URL, overrides the backend default
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature for this provider, overrides the common one
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl ProviderConfig {
    /// Provider entry with defaults for the given backend family
    pub fn new(name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            name: name.into(),
            access: AccessType::Api,
            provider: kind.to_string(),
            api_key: String::new(),
            model: default_model(kind).to_string(),
            retry_count: default_retry_count(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }

    /// Resolve the backend family, failing fast on unknown names
    pub fn kind(&self) -> Result<ProviderKind, ConfigError> {
        self.provider.parse()
    }

    /// Configured endpoint, or the backend default
    pub fn resolved_endpoint(&self) -> Result<String, ConfigError> {
        if let Some(endpoint) = self.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }
        self.kind()?
            .default_endpoint()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingEndpoint(self.name.clone()))
    }

    /// Check this entry can be turned into a client
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access != AccessType::Api {
            return Err(ConfigError::UnsupportedAccess {
                name: self.name.clone(),
                access: self.access.to_string(),
            });
        }
        let kind = self.kind()?;
        if kind.requires_api_key() && self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(self.name.clone()));
        }
        let endpoint = self.resolved_endpoint()?;
        if let Err(e) = url::Url::parse(&endpoint) {
            return Err(ConfigError::InvalidValue {
                field: format!("providers.{}.endpoint", self.name),
                reason: e.to_string(),
            });
        }
        if self.retry_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("providers.{}.retry_count", self.name),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Quality heuristics applied to every candidate translation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QualityConfig {
    /// Lowest accepted `len(source) / len(candidate)`
    #[serde(default = "default_min_ratio")]
    pub min_ratio: f64,

    /// Highest accepted `len(source) / len(candidate)`
    #[serde(default = "default_max_ratio")]
    pub max_ratio: f64,

    /// Phrases meaning "no translation needed"
    #[serde(default = "default_no_translation_phrases")]
    pub no_translation_phrases: Vec<String>,

    /// Phrases meaning "already in the target language"
    #[serde(default = "default_already_target_phrases")]
    pub already_target_phrases: Vec<String>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_ratio: default_min_ratio(),
            max_ratio: default_max_ratio(),
            no_translation_phrases: default_no_translation_phrases(),
            already_target_phrases: default_already_target_phrases(),
        }
    }
}

/// Translation pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Providers in fallback order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Retry ceiling for batch alignment (attempts = ceiling + 1)
    #[serde(default = "default_title_retry_count")]
    pub title_retry_count: u32,

    /// Maximum serialized characters per batch chunk
    #[serde(default = "default_batch_max_chars")]
    pub batch_max_chars: usize,

    /// Custom instruction placed before the source text
    #[serde(default)]
    pub prompt: Option<String>,

    /// Disable all network calls and return placeholder text
    #[serde(default)]
    pub dry_run: bool,

    /// Billing mode: no backoff sleeps between retries
    #[serde(default)]
    pub billing: bool,

    /// First backoff delay in milliseconds, doubled per failure
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Quota failures per provider that refund the consumed attempt
    #[serde(default = "default_max_quota_retries")]
    pub max_quota_retries: u32,

    /// Minimum delay between consecutive provider calls
    #[serde(default)]
    pub min_request_interval_ms: Option<u64>,

    /// Source length (chars) above which the long-text suffix is appended
    #[serde(default = "default_long_text_threshold")]
    pub long_text_threshold: usize,

    /// Sentinel returned when every provider is exhausted without a candidate
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,

    /// Text returned for every fragment in dry-run mode
    #[serde(default = "default_dry_run_placeholder")]
    pub dry_run_placeholder: String,

    /// Maximum characters per prose group in the TXT adapter
    #[serde(default = "default_text_group_chars")]
    pub text_group_chars: usize,

    /// System prompt sent with every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Validator thresholds and phrase lists
    #[serde(default)]
    pub quality: QualityConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            title_retry_count: default_title_retry_count(),
            batch_max_chars: default_batch_max_chars(),
            prompt: None,
            dry_run: false,
            billing: false,
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            max_quota_retries: default_max_quota_retries(),
            min_request_interval_ms: None,
            long_text_threshold: default_long_text_threshold(),
            failure_marker: default_failure_marker(),
            dry_run_placeholder: default_dry_run_placeholder(),
            text_group_chars: default_text_group_chars(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            quality: QualityConfig::default(),
        }
    }
}

impl TranslationConfig {
    /// Validate pipeline settings and every provider entry
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() && !self.dry_run {
            return Err(ConfigError::NoProviders);
        }
        for provider in &self.providers {
            provider.validate()?;
        }
        if self.batch_max_chars == 0 {
            return Err(invalid("batch_max_chars", "must be greater than zero"));
        }
        let quality = &self.quality;
        if !(quality.min_ratio > 0.0 && quality.min_ratio <= quality.max_ratio) {
            return Err(invalid("quality.min_ratio", "must be positive and not above max_ratio"));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(invalid("backoff_initial_ms", "must not exceed backoff_max_ms"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<&LogLevel> for log::LevelFilter {
    fn from(level: &LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_document_title() -> String {
    "untitled".to_string()
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_retry_count() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_title_retry_count() -> u32 {
    3
}

fn default_batch_max_chars() -> usize {
    600
}

fn default_backoff_initial_ms() -> u64 {
    2_000
}

fn default_backoff_max_ms() -> u64 {
    64_000
}

fn default_max_quota_retries() -> u32 {
    8
}

fn default_long_text_threshold() -> usize {
    500
}

fn default_failure_marker() -> String {
    "翻译失败".to_string()
}

fn default_dry_run_placeholder() -> String {
    "待翻译……".to_string()
}

fn default_text_group_chars() -> usize {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_min_ratio() -> f64 {
    0.5
}

fn default_max_ratio() -> f64 {
    10.0
}

fn default_no_translation_phrases() -> Vec<String> {
    vec!["不需要翻译".to_string(), "无需翻译".to_string()]
}

fn default_already_target_phrases() -> Vec<String> {
    vec!["已经是中文".to_string()]
}

fn default_system_prompt() -> String {
    "你是一个翻译机器人，将外语翻译为中文。如果内容无需翻译，你会返回原文。你从不增加额外的分析，只返回翻译后的内容。你从来只回答中文。".to_string()
}

fn default_model(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAI => "gpt-4o-mini",
        ProviderKind::Anthropic => "claude-3-5-haiku-latest",
        ProviderKind::Ollama => "qwen2.5:7b",
        ProviderKind::Relay => "openrouter/auto",
    }
}

impl Config {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document_title.trim().is_empty() {
            return Err(invalid("document_title", "must not be empty"));
        }
        if isolang::Language::from_639_1(&self.target_language).is_none()
            && isolang::Language::from_639_3(&self.target_language).is_none()
        {
            return Err(invalid("target_language", "not an ISO 639 code"));
        }
        self.translation.validate()
    }

    /// Working directory of the configured document
    pub fn document_dir(&self) -> PathBuf {
        self.output_root.join(&self.document_title)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        let mut translation = TranslationConfig::default();
        translation
            .providers
            .push(ProviderConfig::new("local-ollama", ProviderKind::Ollama));

        Config {
            document_title: default_document_title(),
            output_root: default_output_root(),
            target_language: default_target_language(),
            translation,
            log_level: LogLevel::default(),
        }
    }
}
