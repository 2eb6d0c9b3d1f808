/*!
 * Prompt construction for the translation pipeline.
 *
 * This module provides:
 * - Instruction templates per translation mode
 * - The long-text suffix appended to large sources
 * - The instruction lines the validator treats as prompt leaks
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptSet, PromptTemplate, TranslationMode};
