/*!
 * Single-fragment translation service.
 *
 * `TranslationService` owns the provider chain and the prompt set. It
 * translates one fragment at a time (prose paragraphs, TXT groups) and
 * exposes the raw chain invocation used by the batch aligner.
 */

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};

use crate::app_config::Config;
use crate::errors::ConfigError;
use crate::providers::{ChatRequest, Provider, ProviderClient};
use crate::validation::{QualityValidator, markers};

use super::cache::FragmentCache;
use super::chain::{ChainLink, ChainReport, ChainSettings, ProviderChain};
use super::formatting;
use super::prompts::{PromptSet, TranslationMode};

/// Result of one translation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    /// Validated (or passthrough) rather than a fallback sentinel
    pub accepted: bool,
}

/// Translator for single fragments
#[derive(Debug)]
pub struct TranslationService {
    chain: ProviderChain,
    prompts: PromptSet,
    system_prompt: String,
    temperature: f32,
    failure_marker: String,
    dry_run_placeholder: String,
    dry_run: bool,
}

impl TranslationService {
    /// Build the service and one client per configured provider.
    ///
    /// Provider entries are resolved here once; a bad entry fails fast.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let links = config
            .translation
            .providers
            .iter()
            .map(|provider_config| {
                let client = ProviderClient::from_config(provider_config)?;
                let provider: Arc<dyn Provider> = Arc::new(client);
                Ok(ChainLink::new(provider, provider_config.retry_count)
                    .with_temperature(provider_config.temperature))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self::with_links(config, links))
    }

    /// Build the service around pre-made chain links (mock providers in tests)
    pub fn with_links(config: &Config, links: Vec<ChainLink>) -> Self {
        let translation = &config.translation;
        let prompts = PromptSet::new(
            &config.target_language,
            translation.prompt.as_deref(),
            translation.long_text_threshold,
        );
        let validator = QualityValidator::new(&translation.quality, prompts.leak_markers());
        let chain = ProviderChain::new(links, validator, ChainSettings::from(translation));

        Self {
            chain,
            prompts,
            system_prompt: translation.system_prompt.clone(),
            temperature: translation.temperature,
            failure_marker: translation.failure_marker.clone(),
            dry_run_placeholder: translation.dry_run_placeholder.clone(),
            dry_run: translation.dry_run,
        }
    }

    pub fn validator(&self) -> &QualityValidator {
        self.chain.validator()
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    pub fn failure_marker(&self) -> &str {
        &self.failure_marker
    }

    pub fn dry_run_placeholder(&self) -> &str {
        &self.dry_run_placeholder
    }

    /// Dry-run default taken from configuration
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Names of the configured providers in fallback order
    pub fn provider_names(&self) -> Vec<String> {
        self.chain
            .links()
            .iter()
            .map(|link| link.name().to_string())
            .collect()
    }

    /// Run the provider chain for `text` in `mode`, without short-circuits
    pub async fn run_chain(&self, text: &str, mode: TranslationMode) -> ChainReport {
        let prompt = self.prompts.build(mode, text);
        debug!("\n-------- Prompt --------\n\n{}\n------------------------\n", prompt);

        let request = ChatRequest::new(prompt)
            .with_system(self.system_prompt.clone())
            .with_temperature(self.temperature);

        self.chain.run(text, &request).await
    }

    /// Translate one fragment.
    ///
    /// Returns the input for trivial fragments and URLs, the placeholder in
    /// dry-run mode, and the failure sentinel when every provider is exhausted.
    pub async fn translate(&self, text: &str, mode: TranslationMode, dry_run: bool) -> String {
        self.translate_detailed(text, mode, dry_run).await.text
    }

    /// Like [`translate`](Self::translate), also reporting whether the result
    /// was accepted
    pub async fn translate_detailed(
        &self,
        text: &str,
        mode: TranslationMode,
        dry_run: bool,
    ) -> Translation {
        if is_passthrough_input(text) {
            return Translation {
                text: text.to_string(),
                accepted: true,
            };
        }
        if dry_run {
            return Translation {
                text: self.dry_run_placeholder.clone(),
                accepted: false,
            };
        }

        match mode {
            TranslationMode::RemoveAnnotation => {
                let first = self.translate_pass(text, TranslationMode::Translation).await;
                if !first.accepted {
                    return first;
                }
                let polished = self.translate_pass(&first.text, TranslationMode::Polish).await;
                if polished.accepted {
                    polished
                } else {
                    warn!("Polish pass failed, keeping the first translation");
                    first
                }
            }
            mode => self.translate_pass(text, mode).await,
        }
    }

    /// Translate body text through the fragment cache.
    ///
    /// A cached entry is re-checked against the current heuristics; entries
    /// that fail (or were written as fallbacks) are translated again and
    /// overwritten. Exhausted results are returned but never cached.
    pub async fn translate_cached(
        &self,
        text: &str,
        mode: TranslationMode,
        cache: &FragmentCache,
        dry_run: bool,
    ) -> Result<String> {
        if is_passthrough_input(text) {
            return Ok(text.to_string());
        }
        if dry_run {
            return Ok(self.dry_run_placeholder.clone());
        }

        if let Some(entry) = cache.get_entry(text)? {
            if !entry.unvalidated && self.validator().validate(text, &entry.value) {
                return Ok(entry.value);
            }
            info!("Cached translation no longer passes validation, translating again");
        }

        let translation = self.translate_detailed(text, mode, false).await;
        if translation.accepted {
            cache.set(text, &translation.text)?;
        }
        Ok(translation.text)
    }

    async fn translate_pass(&self, text: &str, mode: TranslationMode) -> Translation {
        if is_passthrough_input(text) {
            return Translation {
                text: text.to_string(),
                accepted: true,
            };
        }

        let report = self.run_chain(text, mode).await;
        let translation = Translation {
            text: report.text_or(&self.failure_marker),
            accepted: !report.is_exhausted(),
        };

        if translation.accepted {
            debug!("\n------ Translation ------\n\n{}\n-------------------------\n", translation.text);
        }
        translation
    }
}

/// Inputs returned unchanged without calling any provider
fn is_passthrough_input(text: &str) -> bool {
    formatting::is_trivial(text) || markers::starts_with_url(text)
}
