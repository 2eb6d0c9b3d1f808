/*!
 * Tests for the provider fallback chain
 */

use std::sync::Arc;
use std::time::Duration;

use litrans::providers::mock::MockReply;
use litrans::providers::{ChatRequest, MockProvider};
use litrans::translation::chain::{AttemptOutcome, ChainSettings};
use litrans::translation::{ChainLink, ChainOutcome, ProviderChain};
use litrans::app_config::QualityConfig;
use litrans::validation::{QualityValidator, ValidationIssue};

fn settings() -> ChainSettings {
    ChainSettings {
        backoff_initial: Duration::from_millis(2_000),
        backoff_max: Duration::from_millis(64_000),
        billing: true,
        max_quota_retries: 8,
        min_request_interval_ms: None,
    }
}

fn chain(links: Vec<ChainLink>) -> ProviderChain {
    ProviderChain::new(links, QualityValidator::default(), settings())
}

fn request(source: &str) -> ChatRequest {
    ChatRequest::new(format!("将下面的外文文本翻译为中文：\n{}", source))
}

#[tokio::test]
async fn test_run_withValidFirstReply_shouldStopAtFirstProvider() {
    let first = Arc::new(MockProvider::fixed("早上好").named("first"));
    let second = Arc::new(MockProvider::fixed("不该用到").named("second"));
    let chain = chain(vec![
        ChainLink::new(first.clone(), 3),
        ChainLink::new(second.clone(), 3),
    ]);

    let report = chain.run("Good morning", &request("Good morning")).await;

    assert_eq!(
        report.outcome,
        ChainOutcome::Translated {
            text: "早上好".to_string(),
            provider: "first".to_string()
        }
    );
    assert_eq!(first.call_count(), 1);
    assert_eq!(second.call_count(), 0);
}

#[tokio::test]
async fn test_run_withAlwaysRejectedProvider_shouldUseExactlyRetryCount() {
    let source = "Hello there, my dear friend";
    let bad = Arc::new(MockProvider::fixed("嗨").named("bad"));
    let worse = Arc::new(MockProvider::fixed("嗯").named("worse"));
    let chain = chain(vec![ChainLink::new(bad.clone(), 3), ChainLink::new(worse.clone(), 2)]);

    let report = chain.run(source, &request(source)).await;

    assert_eq!(bad.call_count(), 3);
    assert_eq!(worse.call_count(), 2);
    assert_eq!(report.attempts.len(), 5);
    assert!(report.is_exhausted());
    // Best-known-bad candidate instead of the marker
    assert_eq!(report.text_or("翻译失败"), "嗯");
}

#[tokio::test]
async fn test_run_withOnlyTransportFailures_shouldReturnFailureMarker() {
    let provider = Arc::new(MockProvider::failing());
    let chain = chain(vec![ChainLink::new(provider.clone(), 2)]);

    let report = chain.run("Good morning", &request("Good morning")).await;

    assert_eq!(provider.call_count(), 2);
    assert_eq!(
        report.outcome,
        ChainOutcome::Exhausted {
            best_candidate: None
        }
    );
    assert_eq!(report.text_or("翻译失败"), "翻译失败");
}

#[tokio::test]
async fn test_run_withFailingPrimary_shouldFallBackToNextProvider() {
    let primary = Arc::new(MockProvider::failing().named("primary"));
    let backup = Arc::new(MockProvider::fixed("早上好").named("backup"));
    let chain = chain(vec![
        ChainLink::new(primary.clone(), 2),
        ChainLink::new(backup.clone(), 2),
    ]);

    let report = chain.run("Good morning", &request("Good morning")).await;

    assert_eq!(report.accepted_text(), Some("早上好"));
    assert_eq!(primary.call_count(), 2);
    assert_eq!(report.attempts.last().map(|a| a.provider.as_str()), Some("backup"));
}

#[tokio::test]
async fn test_run_withQuotaFailure_shouldRefundAttempt() {
    let provider = Arc::new(MockProvider::scripted(vec![
        MockReply::Quota,
        MockReply::Quota,
        MockReply::text("早上好"),
    ]));
    let chain = chain(vec![ChainLink::new(provider.clone(), 1)]);

    let report = chain.run("Good morning", &request("Good morning")).await;

    assert_eq!(report.accepted_text(), Some("早上好"));
    assert_eq!(provider.call_count(), 3);
    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::TransportFailed { quota: true, .. }
    ));
}

#[tokio::test]
async fn test_run_withAlreadyTargetReply_shouldPassSourceThrough() {
    let provider = Arc::new(MockProvider::fixed("这段文字已经是中文。"));
    let chain = chain(vec![ChainLink::new(provider.clone(), 3)]);

    let report = chain.run("第一章", &request("第一章")).await;

    assert_eq!(
        report.outcome,
        ChainOutcome::Passthrough {
            source: "第一章".to_string()
        }
    );
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_run_withHeaderInReply_shouldStripHeaderFromAcceptedText() {
    let provider = Arc::new(MockProvider::fixed("翻译结果：\n早上好"));
    let chain = chain(vec![ChainLink::new(provider, 1)]);

    let report = chain.run("Good morning", &request("Good morning")).await;

    assert_eq!(report.accepted_text(), Some("早上好"));
}

#[tokio::test]
async fn test_run_withProviderTemperature_shouldOverrideRequest() {
    let provider = Arc::new(MockProvider::fixed("早上好"));
    let chain = chain(vec![ChainLink::new(provider.clone(), 1).with_temperature(Some(0.1))]);

    chain
        .run("Good morning", &request("Good morning").with_temperature(0.9))
        .await;

    assert_eq!(provider.requests()[0].temperature, Some(0.1));
}

#[tokio::test]
async fn test_run_withBilling_shouldNotScheduleBackoff() {
    let provider = Arc::new(MockProvider::failing());
    let chain = chain(vec![ChainLink::new(provider, 3)]);

    let report = chain.run("Good morning", &request("Good morning")).await;

    assert!(report.attempts.iter().all(|attempt| attempt.backoff.is_zero()));
}

#[tokio::test]
async fn test_run_withOneLineLeakedPrompt_shouldRejectAndRetry() {
    let provider = Arc::new(MockProvider::scripted(vec![
        MockReply::text("将下面的外文文本翻译为中文：你好，我的朋友"),
        MockReply::text("你好，我的朋友"),
    ]));
    let validator = QualityValidator::new(
        &QualityConfig::default(),
        vec!["将下面的外文文本翻译为中文：".to_string()],
    );
    let chain = ProviderChain::new(vec![ChainLink::new(provider.clone(), 2)], validator, settings());

    let report = chain
        .run("Hello there my friend", &request("Hello there my friend"))
        .await;

    assert_eq!(report.accepted_text(), Some("你好，我的朋友"));
    assert_eq!(provider.call_count(), 2);
    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::ValidationFailed(ValidationIssue::PromptLeak)
    ));
}

#[tokio::test]
async fn test_run_withQuotaAtMaxRetryCount_shouldNotOverflow() {
    let provider = Arc::new(MockProvider::scripted(vec![
        MockReply::Quota,
        MockReply::text("早上好"),
    ]));
    let chain = chain(vec![ChainLink::new(provider.clone(), u32::MAX)]);

    let report = chain.run("Good morning", &request("Good morning")).await;

    assert_eq!(report.accepted_text(), Some("早上好"));
    assert_eq!(provider.call_count(), 2);
}
