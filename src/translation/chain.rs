/*!
 * Provider fallback chain.
 *
 * Providers are tried in configuration order. Each one gets a bounded number
 * of attempts; every attempt is one `send`, one post-processing pass and one
 * validation. Failures back off exponentially (unless billing mode is on)
 * and retry the same provider until its budget is spent, then the next
 * provider takes over.
 *
 * Rate or quota failures refund the consumed attempt, up to
 * `max_quota_retries` refunds per provider, so a permanently throttled
 * backend still terminates.
 *
 * The chain never returns an error: exhaustion is reported as
 * [`ChainOutcome::Exhausted`] and the caller decides what to substitute.
 */

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use crate::app_config::TranslationConfig;
use crate::errors::AttemptFailure;
use crate::providers::{ChatRequest, Provider};
use crate::validation::{QualityValidator, ValidationIssue};

use super::formatting;
use super::rate_limit::RateLimiter;

/// A provider and its attempt budget
#[derive(Debug, Clone)]
pub struct ChainLink {
    pub provider: Arc<dyn Provider>,
    pub retry_count: u32,
    /// Overrides the request temperature for this provider
    pub temperature: Option<f32>,
}

impl ChainLink {
    pub fn new(provider: Arc<dyn Provider>, retry_count: u32) -> Self {
        Self {
            provider,
            retry_count,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_for(&self, request: &ChatRequest) -> ChatRequest {
        match self.temperature {
            Some(t) => request.clone().with_temperature(t),
            None => request.clone(),
        }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }
}

/// Exponential backoff: doubles after every failure up to a ceiling
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// Delay to wait now; advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }
}

/// Result of one provider invocation
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Candidate passed validation
    Accepted,
    /// Response said the source already is in the target language
    Passthrough,
    /// Candidate rejected by the validator
    ValidationFailed(ValidationIssue),
    /// The call itself failed
    TransportFailed {
        message: String,
        /// Rate/quota condition; the attempt was refunded
        quota: bool,
    },
}

/// Record of one provider invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationAttempt {
    /// Provider that was called
    pub provider: String,
    /// Attempts left for this provider after this one
    pub attempts_remaining: u32,
    /// Backoff scheduled after this attempt (zero on success or in billing mode)
    pub backoff: Duration,
    pub outcome: AttemptOutcome,
}

/// What the chain produced
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// A validated candidate
    Translated { text: String, provider: String },
    /// No translation necessary; the source is returned as is
    Passthrough { source: String },
    /// Every provider spent its budget
    Exhausted { best_candidate: Option<String> },
}

/// Outcome plus the attempt log
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub outcome: ChainOutcome,
    pub attempts: Vec<TranslationAttempt>,
}

impl ChainReport {
    /// Caller-visible text: the translation, the passthrough source, the best
    /// rejected candidate, or `failure_marker`
    pub fn text_or(&self, failure_marker: &str) -> String {
        match &self.outcome {
            ChainOutcome::Translated { text, .. } => text.clone(),
            ChainOutcome::Passthrough { source } => source.clone(),
            ChainOutcome::Exhausted { best_candidate } => best_candidate
                .clone()
                .unwrap_or_else(|| failure_marker.to_string()),
        }
    }

    /// Accepted text, if any
    pub fn accepted_text(&self) -> Option<&str> {
        match &self.outcome {
            ChainOutcome::Translated { text, .. } => Some(text),
            ChainOutcome::Passthrough { source } => Some(source),
            ChainOutcome::Exhausted { .. } => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.outcome, ChainOutcome::Exhausted { .. })
    }
}

/// Chain settings taken from the translation config
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    /// Skip backoff sleeps
    pub billing: bool,
    pub max_quota_retries: u32,
    pub min_request_interval_ms: Option<u64>,
}

impl From<&TranslationConfig> for ChainSettings {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            backoff_initial: Duration::from_millis(config.backoff_initial_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            billing: config.billing,
            max_quota_retries: config.max_quota_retries,
            min_request_interval_ms: config.min_request_interval_ms,
        }
    }
}

/// Ordered providers with retry, backoff and validation
#[derive(Debug)]
pub struct ProviderChain {
    links: Vec<ChainLink>,
    validator: QualityValidator,
    settings: ChainSettings,
    rate_limiter: Mutex<RateLimiter>,
}

impl ProviderChain {
    pub fn new(links: Vec<ChainLink>, validator: QualityValidator, settings: ChainSettings) -> Self {
        let rate_limiter = Mutex::new(RateLimiter::new(settings.min_request_interval_ms));
        Self {
            links,
            validator,
            settings,
            rate_limiter,
        }
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn validator(&self) -> &QualityValidator {
        &self.validator
    }

    /// Obtain a validated candidate for `source`, sending `request` to each
    /// provider in turn
    pub async fn run(&self, source: &str, request: &ChatRequest) -> ChainReport {
        let mut attempts = Vec::new();
        let mut best_candidate: Option<String> = None;

        for link in &self.links {
            info!("Translating using {} ...", link.name());

            let mut remaining = link.retry_count;
            let mut quota_refunds = 0;
            let mut backoff = Backoff::new(self.settings.backoff_initial, self.settings.backoff_max);
            let request = link.request_for(request);

            while remaining > 0 {
                self.rate_limiter.lock().await.wait().await;

                let failure = match link.provider.send(&request).await {
                    Ok(raw) => {
                        let raw = raw.trim();

                        if self.validator.is_already_target(raw) {
                            debug!("{} reports the source needs no translation", link.name());
                            attempts.push(TranslationAttempt {
                                provider: link.name().to_string(),
                                attempts_remaining: remaining - 1,
                                backoff: Duration::ZERO,
                                outcome: AttemptOutcome::Passthrough,
                            });
                            return ChainReport {
                                outcome: ChainOutcome::Passthrough {
                                    source: source.to_string(),
                                },
                                attempts,
                            };
                        }

                        // Headers are only stripped once the full reply passed validation
                        match self.validator.check(source, raw) {
                            Ok(()) => {
                                attempts.push(TranslationAttempt {
                                    provider: link.name().to_string(),
                                    attempts_remaining: remaining - 1,
                                    backoff: Duration::ZERO,
                                    outcome: AttemptOutcome::Accepted,
                                });
                                return ChainReport {
                                    outcome: ChainOutcome::Translated {
                                        text: formatting::postprocess(raw),
                                        provider: link.name().to_string(),
                                    },
                                    attempts,
                                };
                            }
                            Err(issue) => AttemptFailure::Validation {
                                candidate: formatting::postprocess(raw),
                                issue,
                            },
                        }
                    }
                    Err(e) => AttemptFailure::Transport(e),
                };

                error!("{} translation attempt failed: {}", link.name(), failure);

                let outcome = match failure {
                    AttemptFailure::Validation { candidate, issue } => {
                        warn!("Validation failed ({}), keeping candidate as fallback", issue);
                        best_candidate = Some(candidate);
                        AttemptOutcome::ValidationFailed(issue)
                    }
                    AttemptFailure::Transport(e) => {
                        let quota = e.is_quota() && quota_refunds < self.settings.max_quota_retries;
                        if quota {
                            quota_refunds += 1;
                            remaining = remaining.saturating_add(1);
                        }
                        AttemptOutcome::TransportFailed {
                            message: e.to_string(),
                            quota,
                        }
                    }
                };

                remaining -= 1;
                let delay = if self.settings.billing || remaining == 0 {
                    Duration::ZERO
                } else {
                    backoff.next_delay()
                };

                attempts.push(TranslationAttempt {
                    provider: link.name().to_string(),
                    attempts_remaining: remaining,
                    backoff: delay,
                    outcome,
                });

                if !delay.is_zero() {
                    debug!("Retrying in {} ms ...", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }

            warn!("{} exhausted its {} attempts", link.name(), link.retry_count);
        }

        error!(
            "All providers exhausted after {} attempts; falling back to {}",
            attempts.len(),
            if best_candidate.is_some() { "the last rejected candidate" } else { "the failure marker" }
        );

        ChainReport {
            outcome: ChainOutcome::Exhausted { best_candidate },
            attempts,
        }
    }
}
