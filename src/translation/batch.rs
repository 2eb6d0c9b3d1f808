/*!
 * Batch alignment of related fragments.
 *
 * Short related fragments (chapter titles, subtitle lines) are translated
 * together so the model sees their context, while every output line must map
 * back to exactly one input fragment:
 *
 * 1. Fragments are normalized and deduplicated, then numbered from 0.
 * 2. Numbered lines are split into chunks of at most `batch_max_chars`.
 * 3. A chunk whose fragments are all cached (and validated) is skipped.
 * 4. Otherwise the chunk goes through the provider chain in batch mode and
 *    the numbered response lines are reconciled with the chunk: exact
 *    matches are taken as is, index gaps are repaired from neighbours, and a
 *    response whose first/last indices do not bracket the chunk is retried.
 * 5. When retries run out the chunk falls back to the untranslated source,
 *    cached with the unvalidated flag.
 */

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use log::{debug, error, info, warn};

use crate::app_config::TranslationConfig;

use super::cache::FragmentCache;
use super::core::TranslationService;
use super::formatting::{self, Chunk, IndexedLine};
use super::prompts::TranslationMode;

/// How a chunk's translations were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Every fragment was already cached
    Cached,
    /// Response matched the chunk line for line
    Exact,
    /// Response bracketed the chunk but had gaps that were filled
    Repaired,
    /// Retries ran out; source text kept
    Fallback,
}

/// Reconciled translations for one chunk, in chunk order
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub lines: Vec<String>,
    /// Indices filled from a neighbour or the source line
    pub filled: Vec<usize>,
}

impl Alignment {
    pub fn is_repaired(&self) -> bool {
        !self.filled.is_empty()
    }
}

/// Reconcile a numbered response with the chunk it answers.
///
/// Returns `None` when the response's first and last indices do not match
/// the chunk's `start_idx`/`end_idx`.
pub fn reconcile(chunk: &Chunk, response: &str) -> Option<Alignment> {
    let parsed = formatting::parse_indexed_lines(response);
    let (first, last) = (parsed.first()?, parsed.last()?);

    if first.index != chunk.start_idx() || last.index != chunk.end_idx() {
        return None;
    }

    if parsed.len() == chunk.len() {
        return Some(Alignment {
            lines: parsed.into_iter().map(|line| line.text).collect(),
            filled: Vec::new(),
        });
    }

    let source: HashMap<usize, &str> = chunk
        .lines
        .iter()
        .map(|line| (line.index, line.text.as_str()))
        .collect();
    let mut translated: HashMap<usize, String> = parsed
        .into_iter()
        .map(|line| (line.index, line.text))
        .collect();

    let mut filled = Vec::new();
    for index in chunk.start_idx()..=chunk.end_idx() {
        if translated.contains_key(&index) {
            continue;
        }
        let replacement = translated
            .get(&(index + 1))
            .or_else(|| index.checked_sub(1).and_then(|prev| translated.get(&prev)))
            .cloned()
            .or_else(|| source.get(&index).map(|text| text.to_string()))
            .unwrap_or_default();
        translated.insert(index, replacement);
        filled.push(index);
    }

    let lines = (chunk.start_idx()..=chunk.end_idx())
        .map(|index| translated.remove(&index).unwrap_or_default())
        .collect();

    Some(Alignment { lines, filled })
}

/// Outcome of aligning a fragment list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentReport {
    /// One translation per input fragment, in input order
    pub translations: Vec<String>,
    pub chunks: usize,
    pub cached: usize,
    pub exact: usize,
    pub repaired: usize,
    pub fallbacks: usize,
}

impl AlignmentReport {
    fn record(&mut self, status: ChunkStatus) {
        match status {
            ChunkStatus::Cached => self.cached += 1,
            ChunkStatus::Exact => self.exact += 1,
            ChunkStatus::Repaired => self.repaired += 1,
            ChunkStatus::Fallback => self.fallbacks += 1,
        }
    }

    /// `(source, translation)` pairs for the given input list
    pub fn pairs<'a>(&'a self, fragments: &'a [String]) -> impl Iterator<Item = (&'a str, &'a str)> {
        fragments
            .iter()
            .map(String::as_str)
            .zip(self.translations.iter().map(String::as_str))
    }
}

/// Deduplicated, numbered fragments plus the way back to the originals
#[derive(Debug, Default)]
struct NumberedFragments {
    lines: Vec<IndexedLine>,
    /// Normalized text -> every distinct original that normalizes to it
    originals: HashMap<String, Vec<String>>,
}

impl NumberedFragments {
    fn build(fragments: &[String]) -> Self {
        let mut numbered = NumberedFragments::default();
        let mut seen = HashSet::new();

        for fragment in fragments {
            if formatting::is_identity_fragment(fragment) {
                continue;
            }
            let normalized = formatting::normalize_fragment(fragment);

            let originals = numbered.originals.entry(normalized.clone()).or_default();
            if !originals.contains(fragment) {
                originals.push(fragment.clone());
            }

            if seen.insert(normalized.clone()) {
                let index = numbered.lines.len();
                numbered.lines.push(IndexedLine::new(index, normalized));
            }
        }

        numbered
    }

    fn originals_of(&self, line: &IndexedLine) -> &[String] {
        self.originals
            .get(&line.text)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Translates ordered fragment lists chunk by chunk
pub struct BatchAligner<'a> {
    service: &'a TranslationService,
    cache: &'a FragmentCache,
    max_chars: usize,
    retry_ceiling: u32,
}

impl<'a> BatchAligner<'a> {
    pub fn new(service: &'a TranslationService, cache: &'a FragmentCache, config: &TranslationConfig) -> Self {
        Self {
            service,
            cache,
            max_chars: config.batch_max_chars,
            retry_ceiling: config.title_retry_count,
        }
    }

    /// Translate `fragments`, returning one translation per input
    pub async fn align(&self, fragments: &[String], dry_run: bool) -> Result<AlignmentReport> {
        self.align_with_progress(fragments, dry_run, |_, _| {}).await
    }

    /// Like [`align`](Self::align), calling `progress(done, total)` after
    /// every chunk
    pub async fn align_with_progress(
        &self,
        fragments: &[String],
        dry_run: bool,
        progress: impl Fn(usize, usize),
    ) -> Result<AlignmentReport> {
        let mut report = AlignmentReport::default();

        if dry_run {
            report.translations = fragments
                .iter()
                .map(|fragment| {
                    if formatting::is_identity_fragment(fragment) {
                        fragment.clone()
                    } else {
                        self.service.dry_run_placeholder().to_string()
                    }
                })
                .collect();
            return Ok(report);
        }

        let numbered = NumberedFragments::build(fragments);
        let chunks = formatting::chunk_lines(&numbered.lines, self.max_chars);
        report.chunks = chunks.len();
        info!(
            "Aligning {} fragments ({} unique) in {} chunks",
            fragments.len(),
            numbered.lines.len(),
            chunks.len()
        );

        // Normalized text -> translation
        let mut resolved: HashMap<String, String> = HashMap::new();

        for (done, chunk) in chunks.iter().enumerate() {
            let (lines, status) = match self.cached_chunk(chunk, &numbered)? {
                Some(lines) => (lines, ChunkStatus::Cached),
                None => {
                    let (lines, status) = self.translate_chunk(chunk).await?;
                    self.store_chunk(chunk, &numbered, &lines, status)?;
                    (lines, status)
                }
            };
            debug!("Chunk {}-{}: {:?}", chunk.start_idx(), chunk.end_idx(), status);
            report.record(status);

            // Fallback lines are normalized; leave them unresolved so the original is reported
            if status == ChunkStatus::Fallback {
                progress(done + 1, chunks.len());
                continue;
            }
            for (line, translation) in chunk.lines.iter().zip(lines) {
                resolved.insert(line.text.clone(), translation);
            }
            progress(done + 1, chunks.len());
        }

        report.translations = fragments
            .iter()
            .map(|fragment| {
                if formatting::is_identity_fragment(fragment) {
                    return fragment.clone();
                }
                resolved
                    .get(&formatting::normalize_fragment(fragment))
                    .cloned()
                    .unwrap_or_else(|| fragment.clone())
            })
            .collect();

        Ok(report)
    }

    /// Translations of a chunk whose fragments are all validated cache hits
    fn cached_chunk(&self, chunk: &Chunk, numbered: &NumberedFragments) -> Result<Option<Vec<String>>> {
        let mut lines = Vec::with_capacity(chunk.len());
        for line in &chunk.lines {
            let originals = numbered.originals_of(line);
            for original in originals {
                if !self.cache.contains_validated(original)? {
                    return Ok(None);
                }
            }
            match originals.first() {
                Some(original) => match self.cache.get(original)? {
                    Some(value) => lines.push(value),
                    None => return Ok(None),
                },
                None => return Ok(None),
            }
        }
        Ok(Some(lines))
    }

    /// Submit a chunk until its response reconciles or retries run out
    async fn translate_chunk(&self, chunk: &Chunk) -> Result<(Vec<String>, ChunkStatus)> {
        let chunk_text = chunk.text();
        let attempts = self.retry_ceiling.saturating_add(1);

        // A previous run may have stored the whole chunk response
        let mut memo = match self.cache.get_entry(&chunk_text)? {
            Some(entry) if !entry.unvalidated => Some(entry.value),
            _ => None,
        };

        for attempt in 1..=attempts {
            let response = match memo.take() {
                Some(memoized) => memoized,
                None => {
                    let report = self
                        .service
                        .run_chain(&chunk_text, TranslationMode::BatchTranslation)
                        .await;
                    match report.accepted_text() {
                        Some(text) => text.to_string(),
                        None => {
                            warn!("No provider produced a batch response ({}/{})", attempt, attempts);
                            continue;
                        }
                    }
                }
            };

            match reconcile(chunk, &response) {
                Some(alignment) => {
                    let status = if alignment.is_repaired() {
                        warn!(
                            "Repaired indices {:?} in chunk {}-{}",
                            alignment.filled,
                            chunk.start_idx(),
                            chunk.end_idx()
                        );
                        ChunkStatus::Repaired
                    } else {
                        ChunkStatus::Exact
                    };
                    self.cache.set(&chunk_text, &response)?;
                    return Ok((alignment.lines, status));
                }
                None => warn!(
                    "Batch response does not bracket indices {}-{} ({}/{})",
                    chunk.start_idx(),
                    chunk.end_idx(),
                    attempt,
                    attempts
                ),
            }
        }

        error!(
            "Failed to translate chunk {}-{} after {} attempts, falling back to no translation:\n{}",
            chunk.start_idx(),
            chunk.end_idx(),
            attempts,
            chunk_text
        );
        let lines = chunk.lines.iter().map(|line| line.text.clone()).collect();
        Ok((lines, ChunkStatus::Fallback))
    }

    /// Write every original fragment of the chunk to the cache
    fn store_chunk(
        &self,
        chunk: &Chunk,
        numbered: &NumberedFragments,
        translations: &[String],
        status: ChunkStatus,
    ) -> Result<()> {
        for (line, translation) in chunk.lines.iter().zip(translations) {
            for original in numbered.originals_of(line) {
                if status == ChunkStatus::Fallback {
                    self.cache.set_unvalidated(original, original)?;
                } else {
                    self.cache.set(original, translation)?;
                }
            }
        }
        Ok(())
    }
}
