/*!
 * Tests for the batch aligner
 */

use std::sync::Arc;

use anyhow::Result;
use litrans::providers::MockProvider;
use litrans::providers::mock::MockReply;
use litrans::translation::batch::reconcile;
use litrans::translation::formatting::{Chunk, IndexedLine};
use litrans::translation::{BatchAligner, ChunkStatus};

use crate::common::{self, fragments, numbered};

fn chunk(texts: &[&str]) -> Chunk {
    Chunk {
        lines: texts
            .iter()
            .enumerate()
            .map(|(i, text)| IndexedLine::new(i, *text))
            .collect(),
    }
}

#[test]
fn test_reconcile_withMissingIndexThree_shouldTakeIndexFour() {
    let chunk = chunk(&["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"]);
    let response = numbered(&[(0, "甲"), (1, "乙"), (2, "丙"), (4, "戊"), (5, "己")]);

    let alignment = reconcile(&chunk, &response).unwrap();

    assert_eq!(alignment.lines[3], "戊");
    assert_eq!(alignment.filled, vec![3]);
    assert_eq!(alignment.lines.len(), 6);
}

#[test]
fn test_reconcile_withMergedLines_shouldPreferHigherNeighbour() {
    let chunk = chunk(&["Alpha"]);
    assert_eq!(reconcile(&chunk, "0 甲").unwrap().lines, vec!["甲"]);

    let chunk = Chunk {
        lines: vec![
            IndexedLine::new(0, "Alpha"),
            IndexedLine::new(1, "Bravo"),
            IndexedLine::new(2, "Charlie"),
        ],
    };
    let alignment = reconcile(&chunk, "0 甲\n2 丙").unwrap();
    assert_eq!(alignment.lines, vec!["甲", "丙", "丙"]);
}

#[test]
fn test_reconcile_withExtraLines_shouldStillRequireBrackets() {
    let chunk = chunk(&["Alpha", "Bravo"]);
    assert!(reconcile(&chunk, "0 甲\n1 乙\n2 丙").is_none());
    assert!(reconcile(&chunk, "1 乙\n1 乙").is_none());
}

#[test]
fn test_reconcile_withSplitLine_shouldKeepOneLinePerIndex() {
    let chunk = chunk(&["Alpha", "Bravo", "Charlie"]);
    let alignment = reconcile(&chunk, "0 甲\n1 乙\n1 乙乙\n2 丙").unwrap();

    assert_eq!(alignment.lines.len(), 3);
    assert_eq!(alignment.lines[0], "甲");
    assert_eq!(alignment.lines[2], "丙");
}

#[tokio::test]
async fn test_align_withDuplicates_shouldSendOneLine() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::fixed("0 第一章"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let input = fragments(&["Chapter One", "Chapter\nOne"]);
    let report = aligner.align(&input, false).await?;

    assert_eq!(report.translations, vec!["第一章", "第一章"]);
    assert_eq!(provider.call_count(), 1);
    let prompt = &provider.requests()[0].prompt;
    assert!(prompt.ends_with("\n0 Chapter One"));
    assert_eq!(cache.get("Chapter One")?, Some("第一章".to_string()));
    assert_eq!(cache.get("Chapter\nOne")?, Some("第一章".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_align_withIdentityFragments_shouldNeitherSendNorCache() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::fixed("0 第一章"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let input = fragments(&["42", "Chapter One", "", "https://example.com"]);
    let report = aligner.align(&input, false).await?;

    assert_eq!(report.translations, vec!["42", "第一章", "", "https://example.com"]);
    assert!(!cache.contains("42")?);
    assert!(!cache.contains("https://example.com")?);
    Ok(())
}

#[tokio::test]
async fn test_align_withUnbracketedReplies_shouldFallBackAfterCeiling() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mut config = common::test_config(dir.path());
    config.translation.title_retry_count = 1;
    let provider = Arc::new(MockProvider::fixed("7 乱码"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let report = aligner.align(&fragments(&["Chapter One"]), false).await?;

    // Ceiling 1 means two submissions
    assert_eq!(provider.call_count(), 2);
    assert_eq!(report.fallbacks, 1);
    assert_eq!(report.translations, vec!["Chapter One"]);
    let entry = cache.get_entry("Chapter One")?.unwrap();
    assert!(entry.unvalidated);
    assert_eq!(entry.value, "Chapter One");
    Ok(())
}

#[tokio::test]
async fn test_align_withMultiLineFragmentFallback_shouldReportOriginalText() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mut config = common::test_config(dir.path());
    config.translation.title_retry_count = 1;
    let provider = Arc::new(MockProvider::fixed("9 乱码"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let report = aligner.align(&fragments(&["Line one\nLine two"]), false).await?;

    assert_eq!(report.fallbacks, 1);
    assert_eq!(report.translations, vec!["Line one\nLine two"]);
    let entry = cache.get_entry("Line one\nLine two")?.unwrap();
    assert!(entry.unvalidated);
    assert_eq!(entry.value, "Line one\nLine two");
    Ok(())
}

#[tokio::test]
async fn test_align_withMaxRetryCeiling_shouldNotOverflow() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mut config = common::test_config(dir.path());
    config.translation.title_retry_count = u32::MAX;
    let provider = Arc::new(MockProvider::fixed("0 第一章"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let report = aligner.align(&fragments(&["Chapter One"]), false).await?;

    assert_eq!(report.translations, vec!["第一章"]);
    assert_eq!(provider.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_align_withFallbackEntry_shouldRetryOnNextRun() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let cache = common::memory_cache();
    cache.set_unvalidated("Chapter One", "Chapter One")?;

    let provider = Arc::new(MockProvider::fixed("0 第一章"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let report = aligner.align(&fragments(&["Chapter One"]), false).await?;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(report.exact, 1);
    assert!(cache.contains_validated("Chapter One")?);
    Ok(())
}

#[tokio::test]
async fn test_align_withCachedChunk_shouldSkipProvider() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let cache = common::memory_cache();
    cache.set("Chapter One", "第一章")?;
    cache.set("Chapter Two", "第二章")?;

    let provider = Arc::new(MockProvider::failing());
    let service = common::service_with(&config, &[provider.clone()], 3);
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let report = aligner
        .align(&fragments(&["Chapter One", "Chapter Two"]), false)
        .await?;

    assert_eq!(provider.call_count(), 0);
    assert_eq!(report.cached, 1);
    assert_eq!(report.translations, vec!["第一章", "第二章"]);
    Ok(())
}

#[tokio::test]
async fn test_align_withMemoizedChunk_shouldReuseStoredResponse() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let cache = common::memory_cache();
    let first = Arc::new(MockProvider::fixed("0 第一章\n1 第二章"));
    let service = common::service_with(&config, &[first.clone()], 3);
    let input = fragments(&["Chapter One", "Chapter Two"]);

    BatchAligner::new(&service, &cache, &config.translation)
        .align(&input, false)
        .await?;
    cache.delete("Chapter Two")?;

    let second = Arc::new(MockProvider::failing());
    let service = common::service_with(&config, &[second.clone()], 3);
    let report = BatchAligner::new(&service, &cache, &config.translation)
        .align(&input, false)
        .await?;

    assert_eq!(second.call_count(), 0);
    assert_eq!(report.translations, vec!["第一章", "第二章"]);
    assert!(cache.contains_validated("Chapter Two")?);
    Ok(())
}

#[tokio::test]
async fn test_align_withManyChunks_shouldReturnOneTranslationPerFragment() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mut config = common::test_config(dir.path());
    config.translation.batch_max_chars = 40;
    let cache = common::memory_cache();
    // Echo hands every numbered line back unchanged
    let provider = Arc::new(MockProvider::echo());
    let service = common::service_with(&config, &[provider], 3);
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let input: Vec<String> = (1..=20).map(|i| format!("Chapter {}", i)).collect();
    let report = aligner.align(&input, false).await?;

    assert!(report.chunks > 1);
    assert_eq!(report.translations, input);
    assert_eq!(report.fallbacks, 0);
    for fragment in &input {
        assert!(cache.contains_validated(fragment)?);
    }
    Ok(())
}

#[tokio::test]
async fn test_align_withGarbledThenGoodReply_shouldRetryChunk() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let cache = common::memory_cache();
    let provider = Arc::new(MockProvider::scripted(vec![
        MockReply::text("抱歉"),
        MockReply::text("0 第一章"),
    ]));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let aligner = BatchAligner::new(&service, &cache, &config.translation);

    let report = aligner.align(&fragments(&["Chapter One"]), false).await?;

    assert_eq!(report.translations, vec!["第一章"]);
    assert_eq!(provider.call_count(), 2);
    assert_eq!(report.fallbacks, 0);
    Ok(())
}

#[test]
fn test_chunkStatus_shouldCompareByVariant() {
    assert_ne!(ChunkStatus::Exact, ChunkStatus::Repaired);
}
