/*!
 * Plain-text (TXT) document adapter.
 *
 * Prose is split on sentence terminators and regrouped into passages of
 * roughly `text_group_chars` characters. Each passage is one fragment for
 * the single-fragment translator, so it goes through the cache with
 * re-validation instead of the batch aligner.
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::translation::{FragmentCache, TranslationMode, TranslationService};

/// Characters that end a sentence in the input
const SENTENCE_TERMINATORS: [char; 2] = ['。', '.'];

/// Terminator appended to every sentence when regrouping
const GROUP_TERMINATOR: char = '。';

/// Split `content` into sentences and pack them into groups.
///
/// A group is closed as soon as it grows past `max_chars`, so a single long
/// sentence still forms its own group. Blank sentences are dropped.
pub fn group_sentences(content: &str, max_chars: usize) -> Vec<String> {
    let mut groups = Vec::new();
    let mut group = String::new();
    let mut group_chars = 0;

    for sentence in content.split(SENTENCE_TERMINATORS) {
        if sentence.trim().is_empty() {
            continue;
        }
        group.push_str(sentence);
        group.push(GROUP_TERMINATOR);
        group_chars += sentence.chars().count() + 1;

        if group_chars > max_chars {
            groups.push(std::mem::take(&mut group));
            group_chars = 0;
        }
    }

    if !group.is_empty() {
        groups.push(group);
    }
    groups
}

/// A TXT document split into translation groups
#[derive(Debug, Clone)]
pub struct TextDocument {
    pub source_file: PathBuf,
    pub groups: Vec<String>,
}

impl TextDocument {
    pub fn parse(source_file: PathBuf, content: &str, max_chars: usize) -> Self {
        Self {
            source_file,
            groups: group_sentences(content, max_chars),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, max_chars: usize) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display()))?;
        let document = Self::parse(path.to_path_buf(), &content, max_chars);
        debug!("Split {} into {} groups", path.display(), document.groups.len());
        Ok(document)
    }

    /// Translate every group through the cache, in order
    pub async fn translate(
        &self,
        service: &TranslationService,
        cache: &FragmentCache,
        dry_run: bool,
        progress: impl Fn(usize, usize),
    ) -> Result<Vec<String>> {
        let total = self.groups.len();
        let mut translated = Vec::with_capacity(total);

        for (done, group) in self.groups.iter().enumerate() {
            let text = service
                .translate_cached(group, TranslationMode::Translation, cache, dry_run)
                .await?;
            translated.push(text);
            progress(done + 1, total);
        }

        info!("Translated {} text groups", total);
        Ok(translated)
    }

    /// Write translated groups one per line
    pub fn write_output<P: AsRef<Path>>(path: P, translated: &[String]) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, translated.join("\n"))
            .with_context(|| format!("Failed to write text output: {}", path.display()))
    }
}
