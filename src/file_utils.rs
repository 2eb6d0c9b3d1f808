use anyhow::{Context, Result, anyhow};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

/// Run log kept next to the cache in every document directory
pub const LOG_FILENAME: &str = "info.log";

/// Kind of document accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// SRT subtitles
    Subtitles,
    /// Plain prose
    Text,
    /// One chapter title per line
    Titles,
}

impl DocumentKind {
    /// Default input file name inside the document directory
    pub fn default_input(&self) -> &'static str {
        match self {
            Self::Subtitles => "input.srt",
            Self::Text => "input.txt",
            Self::Titles => "titles.txt",
        }
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Input path given on the command line, or the kind's default inside
    /// the document directory
    pub fn resolve_input<P: AsRef<Path>>(
        explicit: Option<PathBuf>,
        document_dir: P,
        kind: DocumentKind,
    ) -> Result<PathBuf> {
        let path = explicit.unwrap_or_else(|| document_dir.as_ref().join(kind.default_input()));
        if !Self::file_exists(&path) {
            return Err(anyhow!("Input file does not exist: {:?}", path));
        }
        Ok(path)
    }

    // @generates: `<title>_<lang>.srt` or `<title>_<lang>_bilingual.srt`
    pub fn subtitle_output_path<P: AsRef<Path>>(
        document_dir: P,
        title: &str,
        target_language: &str,
        bilingual: bool,
    ) -> PathBuf {
        let suffix = if bilingual { "_bilingual" } else { "" };
        document_dir
            .as_ref()
            .join(format!("{}_{}{}.srt", title, target_language, suffix))
    }

    pub fn text_output_path<P: AsRef<Path>>(document_dir: P) -> PathBuf {
        document_dir.as_ref().join("output.txt")
    }

    // @generates: `<input stem>_<lang>.tsv`
    pub fn titles_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        document_dir: P2,
        target_language: &str,
    ) -> PathBuf {
        let stem = input_file
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "titles".to_string());
        document_dir
            .as_ref()
            .join(format!("{}_{}.tsv", stem, target_language))
    }

    pub fn log_path<P: AsRef<Path>>(document_dir: P) -> PathBuf {
        document_dir.as_ref().join(LOG_FILENAME)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
