/*!
 * Tests for the single-fragment translator
 */

use std::sync::Arc;

use anyhow::Result;
use litrans::providers::mock::MockReply;
use litrans::providers::MockProvider;
use litrans::translation::prompts::PromptTemplate;
use litrans::translation::{TranslationMode, TranslationService};

use crate::common;

#[tokio::test]
async fn test_translate_withDryRun_shouldReturnPlaceholderWithoutCalls() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::fixed("早上好"));
    let service = common::service_with(&config, &[provider.clone()], 3);

    let result = service
        .translate("Good morning", TranslationMode::Translation, true)
        .await;

    assert_eq!(result, "待翻译……");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withShortInput_shouldReturnUnchanged() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::fixed("早上好"));
    let service = common::service_with(&config, &[provider.clone()], 3);

    assert_eq!(service.translate("1a", TranslationMode::Translation, false).await, "1a");
    assert_eq!(
        service.translate("http://example.com/x", TranslationMode::Translation, false).await,
        "http://example.com/x"
    );
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withExhaustedChain_shouldReturnFailureMarker() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::failing());
    let service = common::service_with(&config, &[provider.clone()], 2);

    let translation = service
        .translate_detailed("Good morning", TranslationMode::Translation, false)
        .await;

    assert_eq!(translation.text, "翻译失败");
    assert!(!translation.accepted);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_translate_withLongSource_shouldAppendSuffix() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(dir.path());
    config.translation.long_text_threshold = 10;
    let provider = Arc::new(MockProvider::fixed("这是一段比较长的文字。"));
    let service = common::service_with(&config, &[provider.clone()], 1);

    service
        .translate("This is a rather long sentence.", TranslationMode::Translation, false)
        .await;

    let prompt = &provider.requests()[0].prompt;
    assert!(prompt.starts_with("将下面的外文文本翻译为中文：\nThis is a rather long sentence."));
    assert!(prompt.ends_with(PromptTemplate::LONG_TEXT_ZH));
}

#[tokio::test]
async fn test_translate_shouldSendSystemPromptAndTemperature() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::fixed("早上好"));
    let service = common::service_with(&config, &[provider.clone()], 1);

    service
        .translate("Good morning", TranslationMode::Translation, false)
        .await;

    let request = &provider.requests()[0];
    assert_eq!(request.system.as_deref(), Some(config.translation.system_prompt.as_str()));
    assert_eq!(request.temperature, Some(config.translation.temperature));
}

#[tokio::test]
async fn test_translateCached_shouldBeIdempotent() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::fixed("早上好"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();

    let first = service
        .translate_cached("Good morning", TranslationMode::Translation, &cache, false)
        .await?;
    let second = service
        .translate_cached("Good morning", TranslationMode::Translation, &cache, false)
        .await?;

    assert_eq!(first, "早上好");
    assert_eq!(first, second);
    assert_eq!(provider.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translateCached_withStaleEntry_shouldTranslateAgain() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::fixed("你好，我亲爱的朋友"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();
    cache.set("Hello there, my dear friend", "嗨")?;

    let result = service
        .translate_cached("Hello there, my dear friend", TranslationMode::Translation, &cache, false)
        .await?;

    assert_eq!(result, "你好，我亲爱的朋友");
    assert_eq!(provider.call_count(), 1);
    assert_eq!(cache.get("Hello there, my dear friend")?, Some(result));
    Ok(())
}

#[tokio::test]
async fn test_translateCached_withExhaustedChain_shouldNotCache() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::failing());
    let service = common::service_with(&config, &[provider], 1);
    let cache = common::memory_cache();

    let result = service
        .translate_cached("Good morning", TranslationMode::Translation, &cache, false)
        .await?;

    assert_eq!(result, "翻译失败");
    assert!(cache.is_empty()?);
    Ok(())
}

#[tokio::test]
async fn test_translateCached_withLeakedInstruction_shouldCacheRetriedTranslation() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::scripted(vec![
        MockReply::text("将下面的外文文本翻译为中文：你好，我的朋友"),
        MockReply::text("你好，我的朋友"),
    ]));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();

    let result = service
        .translate_cached("Hello there my friend", TranslationMode::Translation, &cache, false)
        .await?;

    assert_eq!(result, "你好，我的朋友");
    assert_eq!(provider.call_count(), 2);
    assert_eq!(cache.get("Hello there my friend")?, Some(result));
    Ok(())
}

#[tokio::test]
async fn test_translateCached_withDryRun_shouldNotWrite() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let config = common::test_config(dir.path());
    let provider = Arc::new(MockProvider::fixed("早上好"));
    let service = common::service_with(&config, &[provider.clone()], 3);
    let cache = common::memory_cache();

    let result = service
        .translate_cached("Good morning", TranslationMode::Translation, &cache, true)
        .await?;

    assert_eq!(result, "待翻译……");
    assert_eq!(provider.call_count(), 0);
    assert!(cache.is_empty()?);
    Ok(())
}

#[test]
fn test_new_withValidConfig_shouldListProvidersInOrder() {
    let mut config = litrans::Config::default();
    let mut backup = config.translation.providers[0].clone();
    backup.name = "backup".to_string();
    config.translation.providers.push(backup);

    let service = TranslationService::new(&config).unwrap();

    assert_eq!(service.provider_names(), vec!["local-ollama", "backup"]);
}
