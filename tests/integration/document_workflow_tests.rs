/*!
 * Whole-document runs through the controller
 */

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use litrans::app_config::Config;
use litrans::app_controller::Controller;
use litrans::providers::MockProvider;
use litrans::translation::FragmentCache;

use crate::common;

fn controller(config: Config, provider: &Arc<MockProvider>) -> Result<Controller> {
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = FragmentCache::open(config.document_dir())?;
    Ok(Controller::from_parts(config, service, cache))
}

#[tokio::test]
async fn test_runSubtitles_shouldWriteTranslatedAndBilingualFiles() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let input = common::create_test_subtitle(dir.path(), "input.srt")?;
    let provider = Arc::new(MockProvider::fixed(
        "0 这是一个测试字幕。\n1 它包含多个条目。\n2 用于测试。",
    ));
    let controller = controller(config, &provider)?;

    let outputs = controller.run_subtitles(&input).await?;

    assert_eq!(outputs.translated, dir.path().join("Test").join("Test_zh.srt"));
    assert_eq!(outputs.bilingual, dir.path().join("Test").join("Test_zh_bilingual.srt"));

    let translated = fs::read_to_string(&outputs.translated)?;
    assert!(translated.starts_with("1\n00:00:01,000 --> 00:00:04,000\n这是一个测试字幕。\n\n"));
    assert!(translated.contains("3\n00:00:10,000 --> 00:00:14,000\n用于测试。\n"));

    let bilingual = fs::read_to_string(&outputs.bilingual)?;
    assert!(bilingual.contains("It contains multiple entries. | 它包含多个条目。"));

    assert_eq!(outputs.report.exact, 1);
    assert_eq!(provider.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_runSubtitles_withDryRun_shouldWritePlaceholders() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mut config = common::test_config(dir.path());
    config.translation.dry_run = true;
    let input = common::create_test_subtitle(dir.path(), "input.srt")?;
    let provider = Arc::new(MockProvider::fixed("不应调用"));
    let controller = controller(config, &provider)?;

    let outputs = controller.run_subtitles(&input).await?;

    let translated = fs::read_to_string(&outputs.translated)?;
    assert_eq!(translated.matches("待翻译……").count(), 3);
    assert_eq!(provider.call_count(), 0);
    assert!(controller.cache().is_empty()?);
    Ok(())
}

#[tokio::test]
async fn test_runSubtitles_withReopenedCache_shouldNotCallProviderAgain() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let input = common::create_test_subtitle(dir.path(), "input.srt")?;
    let reply = "0 这是一个测试字幕。\n1 它包含多个条目。\n2 用于测试。";

    let first = Arc::new(MockProvider::fixed(reply));
    controller(config.clone(), &first)?.run_subtitles(&input).await?;

    let second = Arc::new(MockProvider::failing());
    let outputs = controller(config, &second)?.run_subtitles(&input).await?;

    assert_eq!(second.call_count(), 0);
    assert_eq!(outputs.report.cached, 1);
    assert_eq!(outputs.report.translations[2], "用于测试。");
    Ok(())
}

#[tokio::test]
async fn test_runText_shouldWriteOutputAndReuseCache() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let input = common::create_test_file(dir.path(), "input.txt", "Hello world. Good night.")?;
    let provider = Arc::new(MockProvider::fixed("你好世界。晚安。"));
    let controller = controller(config, &provider)?;

    let output = controller.run_text(&input).await?;
    controller.run_text(&input).await?;

    assert_eq!(output, dir.path().join("Test").join("output.txt"));
    assert_eq!(fs::read_to_string(&output)?, "你好世界。晚安。");
    assert_eq!(provider.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_runTitles_shouldWriteTabSeparatedPairs() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let input = common::create_test_file(
        dir.path(),
        "titles.txt",
        "Chapter One\n\nChapter Two\nChapter One\n",
    )?;
    let provider = Arc::new(MockProvider::fixed("0 第一章\n1 第二章"));
    let controller = controller(config, &provider)?;

    let output = controller.run_titles(&input).await?;

    assert_eq!(output, dir.path().join("Test").join("titles_zh.tsv"));
    assert_eq!(
        fs::read_to_string(&output)?,
        "Chapter One\t第一章\nChapter Two\t第二章\nChapter One\t第一章\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_cacheMaintenance_shouldDropStaleAndFallbackEntries() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::failing());
    let controller = controller(config, &provider)?;
    let cache = controller.cache();
    cache.set("Hello there, my dear friend", "嗨")?;
    cache.set("Good morning", "早上好")?;
    cache.set_unvalidated("Chapter One", "Chapter One")?;

    assert_eq!(controller.revalidate_cache()?, 1);
    assert_eq!(controller.purge_unvalidated()?, 1);

    let (stats, db_stats) = controller.cache_stats()?;
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.unvalidated, 0);
    assert_eq!(db_stats.entry_count, 1);
    assert!(cache.contains_validated("Good morning")?);
    Ok(())
}
