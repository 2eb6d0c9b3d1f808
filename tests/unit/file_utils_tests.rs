/*!
 * Tests for path helpers and file writes
 */

use std::fs;
use std::path::Path;

use anyhow::Result;
use litrans::file_utils::{DocumentKind, FileManager, LOG_FILENAME};

use crate::common;

#[test]
fn test_defaultInput_shouldDependOnKind() {
    assert_eq!(DocumentKind::Subtitles.default_input(), "input.srt");
    assert_eq!(DocumentKind::Text.default_input(), "input.txt");
    assert_eq!(DocumentKind::Titles.default_input(), "titles.txt");
}

#[test]
fn test_titlesOutputPath_shouldUseInputStem() {
    let path = FileManager::titles_output_path("books/chapters.txt", Path::new("output/Novel"), "zh");
    assert_eq!(path, Path::new("output/Novel").join("chapters_zh.tsv"));
}

#[test]
fn test_textOutputAndLogPaths_shouldLiveInDocumentDir() {
    let dir = Path::new("output/Novel");
    assert_eq!(FileManager::text_output_path(dir), dir.join("output.txt"));
    assert_eq!(FileManager::log_path(dir), dir.join(LOG_FILENAME));
}

#[test]
fn test_resolveInput_withExplicitPath_shouldPreferIt() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let explicit = common::create_test_file(dir.path(), "other.srt", "x")?;
    common::create_test_file(dir.path(), "input.srt", "y")?;

    let resolved = FileManager::resolve_input(Some(explicit.clone()), dir.path(), DocumentKind::Subtitles)?;

    assert_eq!(resolved, explicit);
    Ok(())
}

#[test]
fn test_writeToFile_shouldCreateParents() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("a").join("b").join("out.txt");

    FileManager::write_to_file(&path, "你好")?;

    assert_eq!(FileManager::read_to_string(&path)?, "你好");
    Ok(())
}

#[test]
fn test_appendToLogFile_shouldAppendTimestampedLines() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = FileManager::log_path(dir.path());

    FileManager::append_to_log_file(&path, "first")?;
    FileManager::append_to_log_file(&path, "second")?;

    let content = fs::read_to_string(&path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("] first"));
    assert!(lines[1].ends_with("] second"));
    Ok(())
}
