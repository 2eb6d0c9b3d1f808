/*!
 * Fragment cache.
 *
 * Durable memoization of `source fragment -> accepted translation`, backed by
 * the per-document SQLite store. Every `set` is committed before it returns,
 * so a re-run after a crash only repeats work that never finished.
 *
 * Keys are the exact source text. Callers normalize before calling if they
 * need to.
 */

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};
use parking_lot::RwLock;
use rusqlite::{OptionalExtension, params};

use crate::database::DatabaseConnection;
use crate::validation::QualityValidator;

/// Stored cache row
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Exact source fragment
    pub key: String,
    /// Stored translation
    pub value: String,
    /// Written as a batch fallback without passing validation
    pub unvalidated: bool,
}

/// Lookup counters and store totals
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
    pub unvalidated: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} entries ({} unvalidated), {} hits / {} misses ({:.1}%)",
            self.entries,
            self.unvalidated,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )
    }
}

/// Durable fragment -> translation store for one document
#[derive(Debug, Clone)]
pub struct FragmentCache {
    db: DatabaseConnection,

    /// Cache hit counter
    hits: Arc<RwLock<usize>>,

    /// Cache miss counter
    misses: Arc<RwLock<usize>>,
}

impl FragmentCache {
    /// Wrap an open store
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
        }
    }

    /// Open the store of a document working directory, creating it if needed
    pub fn open<P: AsRef<std::path::Path>>(document_dir: P) -> Result<Self> {
        Ok(Self::new(DatabaseConnection::for_document_dir(document_dir)?))
    }

    /// Volatile cache for tests and dry runs
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Look up a translation
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_entry(key)?.map(|entry| entry.value))
    }

    /// Look up the full row, counting the lookup as hit or miss
    pub fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entry = self.fetch(key)?;

        match &entry {
            Some(_) => {
                *self.hits.write() += 1;
                debug!("Cache hit for '{}'", truncate_text(key, 30));
            }
            None => {
                *self.misses.write() += 1;
                debug!("Cache miss for '{}'", truncate_text(key, 30));
            }
        }

        Ok(entry)
    }

    /// Store a validated translation, replacing any previous value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value, false)
    }

    /// Store a translation that did not pass validation
    pub fn set_unvalidated(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value, true)
    }

    /// Whether any entry exists for `key`
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.fetch(key)?.is_some())
    }

    /// Whether a validated entry exists; fallback entries do not count
    pub fn contains_validated(&self, key: &str) -> Result<bool> {
        Ok(matches!(self.fetch(key)?, Some(entry) if !entry.unvalidated))
    }

    /// Remove an entry; returns whether it existed
    pub fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.db.execute(|conn| {
            Ok(conn.execute("DELETE FROM fragments WHERE key = ?1", params![key])?)
        })?;
        Ok(removed > 0)
    }

    /// Every `(key, value)` pair in insertion order
    pub fn all_entries(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .rows("SELECT key, value, unvalidated FROM fragments ORDER BY rowid")?
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect())
    }

    /// Entries written as alignment fallbacks
    pub fn unvalidated_entries(&self) -> Result<Vec<CacheEntry>> {
        self.rows("SELECT key, value, unvalidated FROM fragments WHERE unvalidated = 1 ORDER BY rowid")
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.db.stats()?.entry_count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Lookup counters plus store totals
    pub fn stats(&self) -> Result<CacheStats> {
        let db_stats = self.db.stats()?;
        Ok(CacheStats {
            hits: *self.hits.read(),
            misses: *self.misses.read(),
            entries: db_stats.entry_count as usize,
            unvalidated: db_stats.unvalidated_count as usize,
        })
    }

    /// Drop validated entries that the current heuristics reject.
    ///
    /// Returns the number of removed entries. Fallback entries are left alone.
    pub fn revalidate(&self, validator: &QualityValidator) -> Result<usize> {
        let stale: Vec<String> = self
            .rows("SELECT key, value, unvalidated FROM fragments WHERE unvalidated = 0")?
            .into_iter()
            .filter(|entry| !validator.validate(&entry.key, &entry.value))
            .map(|entry| entry.key)
            .collect();

        let removed = self.db.transaction(|tx| {
            let mut removed = 0;
            for key in &stale {
                removed += tx.execute("DELETE FROM fragments WHERE key = ?1", params![key])?;
            }
            Ok(removed)
        })?;

        if removed > 0 {
            info!("Revalidation dropped {} cached translations", removed);
        }
        Ok(removed)
    }

    /// Remove every fallback entry so the next run retries them
    pub fn purge_unvalidated(&self) -> Result<usize> {
        let removed = self.db.execute(|conn| {
            Ok(conn.execute("DELETE FROM fragments WHERE unvalidated = 1", [])?)
        })?;
        info!("Purged {} unvalidated cache entries", removed);
        Ok(removed)
    }

    fn fetch(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.db.execute(|conn| {
            Ok(conn
                .query_row(
                    "SELECT key, value, unvalidated FROM fragments WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok(CacheEntry {
                            key: row.get(0)?,
                            value: row.get(1)?,
                            unvalidated: row.get::<_, i64>(2)? != 0,
                        })
                    },
                )
                .optional()?)
        })
    }

    fn write(&self, key: &str, value: &str, unvalidated: bool) -> Result<()> {
        self.db.execute(|conn| {
            conn.execute(
                "INSERT INTO fragments (key, value, unvalidated, created_at, updated_at)
                 VALUES (?1, ?2, ?3, datetime('now'), datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    unvalidated = excluded.unvalidated,
                    updated_at = excluded.updated_at",
                params![key, value, unvalidated as i64],
            )?;
            Ok(())
        })?;

        debug!(
            "Cached {}translation for '{}'",
            if unvalidated { "unvalidated " } else { "" },
            truncate_text(key, 30)
        );
        Ok(())
    }

    fn rows(&self, sql: &str) -> Result<Vec<CacheEntry>> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CacheEntry {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        unvalidated: row.get::<_, i64>(2)? != 0,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

/// Truncate text for log output
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
