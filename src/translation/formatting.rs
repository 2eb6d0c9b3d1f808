/*!
 * Line formatting helpers for batch translation.
 *
 * Batches are serialized as `"<index> <text>"` lines. The helpers here build
 * those lines, split them into length-bounded chunks, read indices back out
 * of model responses, and clean up common response artifacts.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validation::markers;

/// Leading index of a response line
static LEADING_INDEX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)").expect("Invalid leading index regex")
});

/// Index prefix including an optional dot and the separating whitespace
static INDEX_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+\.?\s*").expect("Invalid index prefix regex")
});

/// Longest run of one repeated character kept by [`collapse_repeats`]
const MAX_REPEAT: usize = 5;

/// One fragment tagged with its batch index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedLine {
    pub index: usize,
    pub text: String,
}

impl IndexedLine {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Serialized `"<index> <text>"` form
    pub fn serialize(&self) -> String {
        format!("{} {}", self.index, self.text)
    }
}

/// Contiguous run of indexed lines submitted as one request
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub lines: Vec<IndexedLine>,
}

impl Chunk {
    /// First index in the chunk
    pub fn start_idx(&self) -> usize {
        self.lines.first().map(|l| l.index).unwrap_or(0)
    }

    /// Last index in the chunk
    pub fn end_idx(&self) -> usize {
        self.lines.last().map(|l| l.index).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Newline-joined serialized lines
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(IndexedLine::serialize)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fold embedded line breaks so a fragment fits on one serialized line
pub fn normalize_fragment(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split indexed lines into chunks whose serialized text stays within
/// `max_chars` characters. Splits only between lines; a single line longer
/// than the bound becomes a chunk of its own.
pub fn chunk_lines(lines: &[IndexedLine], max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<IndexedLine> = Vec::new();
    let mut current_chars = 0;

    for line in lines {
        let line_chars = line.serialize().chars().count();
        // Joining adds one newline per additional line
        let added = if current.is_empty() { line_chars } else { line_chars + 1 };

        if !current.is_empty() && current_chars + added > max_chars {
            chunks.push(Chunk {
                lines: std::mem::take(&mut current),
            });
            current_chars = 0;
            current.push(line.clone());
            current_chars += line_chars;
        } else {
            current.push(line.clone());
            current_chars += added;
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk { lines: current });
    }

    chunks
}

/// Integer prefix of a response line, if any
pub fn leading_index(line: &str) -> Option<usize> {
    LEADING_INDEX_REGEX
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Line content after its index prefix
pub fn strip_leading_index(line: &str) -> &str {
    match INDEX_PREFIX_REGEX.find(line) {
        Some(m) => line[m.end()..].trim_end(),
        None => line.trim(),
    }
}

/// Response lines that carry an index, in response order
pub fn parse_indexed_lines(response: &str) -> Vec<IndexedLine> {
    response
        .lines()
        .filter_map(|line| {
            leading_index(line).map(|index| IndexedLine::new(index, strip_leading_index(line)))
        })
        .collect()
}

/// Fragments that are never translated: blank, digits only, or a URL
pub fn is_identity_fragment(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty()
        || trimmed.chars().all(|c| c.is_ascii_digit())
        || markers::starts_with_url(trimmed)
}

/// Fewer than two characters that are not digits
pub fn is_trivial(text: &str) -> bool {
    text.trim().chars().filter(|c| !c.is_ascii_digit()).count() < 2
}

/// Clean a raw model response before it is validated or parsed
pub fn postprocess(response: &str) -> String {
    collapse_repeats(&remove_header(response.trim()))
        .trim()
        .to_string()
}

/// Drop a leading `翻译...：` header line some models prepend.
/// A header with no content after it is kept as-is.
pub fn remove_header(text: &str) -> String {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.contains("翻译") && first.contains('：') => {
            let rest = lines.collect::<Vec<_>>().join("\n");
            if rest.trim().is_empty() {
                text.to_string()
            } else {
                rest
            }
        }
        _ => text.to_string(),
    }
}

/// Cap runs of one repeated character at five
pub fn collapse_repeats(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    let mut run = 0;

    for c in text.chars() {
        if Some(c) == previous {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run <= MAX_REPEAT {
            result.push(c);
        }
    }

    result
}
