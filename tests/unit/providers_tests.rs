/*!
 * Tests for provider clients and request bodies
 */

use litrans::app_config::{ProviderConfig, ProviderKind};
use litrans::errors::ConfigError;
use litrans::providers::anthropic::AnthropicRequest;
use litrans::providers::mock::MockReply;
use litrans::providers::ollama::GenerationRequest;
use litrans::providers::openai::ChatCompletionRequest;
use litrans::providers::{ChatRequest, MockProvider, Provider, ProviderClient};
use serde_json::json;

fn chat() -> ChatRequest {
    ChatRequest::new("将下面的外文文本翻译为中文：\nHello")
        .with_system("你是一个翻译机器人")
        .with_temperature(0.5)
}

#[test]
fn test_withSystem_withBlankPrompt_shouldLeaveNone() {
    let request = ChatRequest::new("prompt").with_system("   ");
    assert_eq!(request.system, None);
    assert_eq!(request.temperature, None);
}

#[test]
fn test_fromConfig_withOpenAIKey_shouldBuildOpenAIClient() {
    let mut config = ProviderConfig::new("primary", ProviderKind::OpenAI);
    config.api_key = "sk-test".to_string();

    let client = ProviderClient::from_config(&config).unwrap();

    assert!(matches!(client, ProviderClient::OpenAI(_)));
    assert_eq!(client.name(), "primary");
}

#[test]
fn test_fromConfig_withoutKey_shouldFailFast() {
    let config = ProviderConfig::new("primary", ProviderKind::Anthropic);
    assert_eq!(
        ProviderClient::from_config(&config).unwrap_err(),
        ConfigError::MissingApiKey("primary".to_string())
    );
}

#[test]
fn test_fromConfig_withOllama_shouldNotNeedKey() {
    let config = ProviderConfig::new("local", ProviderKind::Ollama);
    let client = ProviderClient::from_config(&config).unwrap();
    assert!(matches!(client, ProviderClient::Ollama(_)));
}

#[test]
fn test_fromConfig_withRelay_shouldRequireEndpoint() {
    let mut config = ProviderConfig::new("relay", ProviderKind::Relay);
    config.api_key = "key".to_string();
    assert_eq!(
        ProviderClient::from_config(&config).unwrap_err(),
        ConfigError::MissingEndpoint("relay".to_string())
    );

    config.endpoint = Some("https://openrouter.ai/api/v1".to_string());
    let client = ProviderClient::from_config(&config).unwrap();
    assert!(matches!(client, ProviderClient::Relay(_)));
}

#[test]
fn test_fromConfig_withMalformedEndpoint_shouldReportField() {
    let mut config = ProviderConfig::new("local", ProviderKind::Ollama);
    config.endpoint = Some("not a url".to_string());

    match ProviderClient::from_config(&config).unwrap_err() {
        ConfigError::InvalidValue { field, .. } => assert_eq!(field, "providers.local.endpoint"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_fromConfig_withUnknownProvider_shouldFail() {
    let mut config = ProviderConfig::new("odd", ProviderKind::Ollama);
    config.provider = "gemini".to_string();
    assert_eq!(
        ProviderClient::from_config(&config).unwrap_err(),
        ConfigError::UnknownProvider("gemini".to_string())
    );
}

#[test]
fn test_openAIRequest_shouldSerializeSystemThenUser() {
    let body = serde_json::to_value(ChatCompletionRequest::from_chat("gpt-4o-mini", &chat())).unwrap();

    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "将下面的外文文本翻译为中文：\nHello");
    assert_eq!(body["temperature"], json!(0.5));
}

#[test]
fn test_openAIRequest_withoutTemperature_shouldOmitField() {
    let body =
        serde_json::to_value(ChatCompletionRequest::from_chat("m", &ChatRequest::new("p"))).unwrap();

    assert!(body.get("temperature").is_none());
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_anthropicRequest_shouldCarrySystemAtTopLevel() {
    let body = serde_json::to_value(AnthropicRequest::from_chat("claude", &chat())).unwrap();

    assert_eq!(body["system"], "你是一个翻译机器人");
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["messages"][0]["role"], "user");
    assert!(body["max_tokens"].as_u64().unwrap_or(0) > 0);
}

#[test]
fn test_ollamaRequest_shouldDisableStreaming() {
    let body = serde_json::to_value(GenerationRequest::from_chat("qwen2.5:7b", &chat())).unwrap();

    assert_eq!(body["stream"], json!(false));
    assert_eq!(body["options"]["temperature"], json!(0.5));
    assert_eq!(body["system"], "你是一个翻译机器人");
}

#[tokio::test]
async fn test_mockEcho_shouldReturnSourceAfterInstruction() {
    let provider = MockProvider::echo();
    let reply = provider.send(&ChatRequest::new("指令\n0 Alpha\n1 Bravo")).await.unwrap();

    assert_eq!(reply, "0 Alpha\n1 Bravo");
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_mockScripted_shouldReplayScriptInOrder() {
    let provider = MockProvider::scripted(vec![MockReply::Quota, MockReply::text("好")]);
    let request = ChatRequest::new("p");

    assert!(provider.send(&request).await.unwrap_err().is_quota());
    assert_eq!(provider.send(&request).await.unwrap(), "好");
    assert_eq!(provider.requests().len(), 2);
}
