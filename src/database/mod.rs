/*!
 * Database module for the durable fragment store.
 *
 * This module provides SQLite-based persistence for:
 * - The fragment cache (source fragment -> accepted translation)
 * - Unvalidated markers for fallback entries written after exhausted retries
 */

pub mod schema;
pub mod connection;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
