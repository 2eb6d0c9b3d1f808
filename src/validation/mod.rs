/*!
 * Quality validation for candidate translations.
 *
 * Every candidate a provider returns passes through these heuristics before
 * it may be cached:
 * - Length ratio between source and candidate (truncation / hallucination)
 * - Marker detection (prompt echoes, "no translation needed" replies, URLs)
 *
 * # Architecture
 *
 * - `length`: Validates `len(source) / len(candidate)` bounds
 * - `markers`: Detects prompt leaks and signal phrases in responses
 * - `service`: The pure `QualityValidator` combining both
 */

pub mod length;
pub mod markers;
pub mod service;

// Re-export main types
pub use length::{LengthIssue, LengthValidator};
pub use markers::MarkerDetector;
pub use service::{QualityValidator, ValidationIssue};
