/*!
 * Length validation for candidate translations.
 *
 * The ratio is `len(source) / len(candidate)` measured in characters on
 * trimmed text. A low ratio means the candidate is much longer than the source
 * (commentary, hallucination); a high ratio means it is much shorter
 * (truncation).
 */

use log::debug;

/// Types of length issues
#[derive(Debug, Clone, PartialEq)]
pub enum LengthIssue {
    /// Candidate is too long relative to the source
    CandidateTooLong {
        ratio: f64,
        min_ratio: f64,
        source_len: usize,
        candidate_len: usize,
    },
    /// Candidate is too short relative to the source
    CandidateTooShort {
        ratio: f64,
        max_ratio: f64,
        source_len: usize,
        candidate_len: usize,
    },
}

impl std::fmt::Display for LengthIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthIssue::CandidateTooLong {
                ratio,
                min_ratio,
                source_len,
                candidate_len,
            } => write!(
                f,
                "candidate too long: ratio {:.2} < {:.2} ({} -> {} chars)",
                ratio, min_ratio, source_len, candidate_len
            ),
            LengthIssue::CandidateTooShort {
                ratio,
                max_ratio,
                source_len,
                candidate_len,
            } => write!(
                f,
                "candidate too short: ratio {:.2} > {:.2} ({} -> {} chars)",
                ratio, max_ratio, source_len, candidate_len
            ),
        }
    }
}

/// Length ratio validator; bounds are inclusive
#[derive(Debug, Clone)]
pub struct LengthValidator {
    min_ratio: f64,
    max_ratio: f64,
}

impl Default for LengthValidator {
    fn default() -> Self {
        Self::new(0.5, 10.0)
    }
}

impl LengthValidator {
    /// Create a validator accepting ratios in `[min_ratio, max_ratio]`
    pub fn new(min_ratio: f64, max_ratio: f64) -> Self {
        Self { min_ratio, max_ratio }
    }

    /// Check the ratio, returning it when accepted.
    ///
    /// An empty candidate is always accepted (ratio reported as 0).
    pub fn check(&self, source: &str, candidate: &str) -> Result<f64, LengthIssue> {
        let source_len = source.trim().chars().count();
        let candidate_len = candidate.trim().chars().count();

        if candidate_len == 0 {
            return Ok(0.0);
        }

        let ratio = source_len as f64 / candidate_len as f64;
        debug!("Length ratio {:.2} ({} -> {} chars)", ratio, source_len, candidate_len);

        if ratio < self.min_ratio {
            Err(LengthIssue::CandidateTooLong {
                ratio,
                min_ratio: self.min_ratio,
                source_len,
                candidate_len,
            })
        } else if ratio > self.max_ratio {
            Err(LengthIssue::CandidateTooShort {
                ratio,
                max_ratio: self.max_ratio,
                source_len,
                candidate_len,
            })
        } else {
            Ok(ratio)
        }
    }
}
