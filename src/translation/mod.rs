/*!
 * Batch-aligned translation pipeline.
 *
 * This module contains the core of the application. It is split into
 * several submodules:
 *
 * - `cache`: Durable fragment -> translation memoization
 * - `formatting`: Numbered-line serialization, chunking and response cleanup
 * - `prompts`: Instruction templates per translation mode
 * - `rate_limit`: Minimum spacing between provider calls
 * - `chain`: Provider fallback chain with retries and backoff
 * - `core`: Single-fragment translation service
 * - `batch`: Batch aligner for titles and subtitle lines
 */

// Re-export main types for easier usage
pub use self::batch::{AlignmentReport, BatchAligner, ChunkStatus};
pub use self::cache::{CacheEntry, CacheStats, FragmentCache};
pub use self::chain::{ChainLink, ChainOutcome, ChainReport, ProviderChain, TranslationAttempt};
pub use self::core::{Translation, TranslationService};
pub use self::prompts::{PromptSet, TranslationMode};
pub use self::rate_limit::RateLimiter;

// Submodules
pub mod batch;
pub mod cache;
pub mod chain;
pub mod core;
pub mod formatting;
pub mod prompts;
pub mod rate_limit;
