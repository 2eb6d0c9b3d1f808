/*!
 * # litrans - batch-aligned LLM translation
 *
 * A Rust library for translating novels, subtitles and chapter titles with
 * large language models, resumable through a durable fragment cache.
 *
 * ## Features
 *
 * - Ordered provider fallback chain with retries and exponential backoff:
 *   - OpenAI-compatible chat completions (and relays speaking that format)
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Quality validation of every candidate (length ratio, prompt leaks,
 *   refusal phrases)
 * - Batch alignment of short fragments with numbered lines and gap repair
 * - SQLite fragment cache: interrupted runs resume where they stopped
 * - SRT subtitle, plain-text and chapter-title adapters
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `errors`: Error taxonomy
 * - `providers`: Provider interface and clients
 * - `validation`: Quality heuristics for candidate translations
 * - `database`: SQLite store behind the fragment cache
 * - `translation`: The pipeline:
 *   - `translation::cache`: Fragment cache
 *   - `translation::chain`: Provider fallback chain
 *   - `translation::core`: Single-fragment translator
 *   - `translation::batch`: Batch aligner
 *   - `translation::formatting`: Numbered lines, chunking, response cleanup
 *   - `translation::prompts`: Instruction templates
 * - `subtitle_processor`, `text_processor`: Document adapters
 * - `file_utils`: File system operations
 * - `app_controller`: Per-document orchestration
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod text_processor;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, AttemptFailure, ConfigError, ProviderError};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use text_processor::TextDocument;
pub use translation::{BatchAligner, FragmentCache, ProviderChain, TranslationService};
pub use validation::QualityValidator;
