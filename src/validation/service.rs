/*!
 * Quality validator.
 *
 * Pure predicate `(source, candidate) -> accepted?` applied to every candidate
 * before it may be cached. Checks run in a fixed order so the reported issue
 * is deterministic:
 *
 * 1. "No translation needed" phrases
 * 2. Source fragment starting with a URL scheme
 * 3. Echo of the active prompt instruction
 * 4. Length ratio (skipped for an empty candidate)
 */

use std::fmt;

use crate::app_config::QualityConfig;

use super::length::{LengthIssue, LengthValidator};
use super::markers::{self, MarkerDetector};

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// Response says the text needs no translation
    NoTranslationNeeded,
    /// Source fragment is a URL; hand it through untouched
    UrlSource,
    /// Response repeats the instruction text
    PromptLeak,
    /// Length ratio outside the accepted bounds
    Length(LengthIssue),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoTranslationNeeded => write!(f, "response claims no translation is needed"),
            ValidationIssue::UrlSource => write!(f, "source is a URL"),
            ValidationIssue::PromptLeak => write!(f, "response echoes the prompt"),
            ValidationIssue::Length(issue) => write!(f, "{}", issue),
        }
    }
}

/// Heuristic quality gate for candidate translations
#[derive(Debug, Clone)]
pub struct QualityValidator {
    length: LengthValidator,
    markers: MarkerDetector,
}

impl Default for QualityValidator {
    fn default() -> Self {
        Self::new(&QualityConfig::default(), Vec::new())
    }
}

impl QualityValidator {
    /// Build a validator from thresholds and the instruction lines to watch for
    pub fn new(config: &QualityConfig, prompt_markers: Vec<String>) -> Self {
        Self {
            length: LengthValidator::new(config.min_ratio, config.max_ratio),
            markers: MarkerDetector::new(
                prompt_markers,
                config.no_translation_phrases.clone(),
                config.already_target_phrases.clone(),
            ),
        }
    }

    /// Accept or reject a candidate
    pub fn validate(&self, source: &str, candidate: &str) -> bool {
        self.check(source, candidate).is_ok()
    }

    /// Like [`validate`](Self::validate) but reports the first failing heuristic
    pub fn check(&self, source: &str, candidate: &str) -> Result<(), ValidationIssue> {
        if self.markers.says_no_translation(candidate) {
            return Err(ValidationIssue::NoTranslationNeeded);
        }
        if markers::starts_with_url(source) {
            return Err(ValidationIssue::UrlSource);
        }
        if self.markers.leaks_prompt(candidate) {
            return Err(ValidationIssue::PromptLeak);
        }
        self.length
            .check(source, candidate)
            .map(|_| ())
            .map_err(ValidationIssue::Length)
    }

    /// Response says the source already is in the target language
    pub fn is_already_target(&self, candidate: &str) -> bool {
        self.markers.says_already_target(candidate)
    }
}
