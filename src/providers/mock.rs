/*!
 * Mock provider implementations for testing.
 *
 * This module provides a scripted provider that simulates backend behaviour
 * without network access:
 * - `MockProvider::echo()` - returns the source text of the prompt unchanged
 * - `MockProvider::fixed(text)` - always returns the same text
 * - `MockProvider::failing()` - always fails with a transport error
 * - `MockProvider::quota()` - always fails with a rate-limit error
 * - `MockProvider::scripted(replies)` - plays replies in order, then echoes
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{ChatRequest, Provider};

/// One scripted reply
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Successful response text
    Text(String),
    /// Prompt text after the instruction line
    Echo,
    /// Generic transport failure
    Failure,
    /// Rate/quota failure
    Quota,
    /// Successful call without text
    Empty,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }
}

/// Behaviour once the script is used up
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Return the prompt text after the instruction line
    Echo,
    /// Always return the same text
    Fixed(String),
    /// Always fail with a transport error
    Failing,
    /// Always fail with a rate-limit error
    Quota,
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    behavior: MockBehavior,
    script: Mutex<VecDeque<MockReply>>,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            script: Mutex::new(VecDeque::new()),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider that hands the source text back
    pub fn echo() -> Self {
        Self::new("mock-echo", MockBehavior::Echo)
    }

    /// Provider that always answers `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new("mock-fixed", MockBehavior::Fixed(text.into()))
    }

    /// Provider that always fails
    pub fn failing() -> Self {
        Self::new("mock-failing", MockBehavior::Failing)
    }

    /// Provider that is always rate limited
    pub fn quota() -> Self {
        Self::new("mock-quota", MockBehavior::Quota)
    }

    /// Provider that plays `replies` in order, then echoes
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self::new("mock-scripted", MockBehavior::Echo).with_script(replies)
    }

    /// Rename the provider
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Queue replies played before the fallback behaviour
    pub fn with_script(self, replies: Vec<MockReply>) -> Self {
        self.script.lock().extend(replies);
        self
    }

    /// Number of `send` calls so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copies of every request received
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    fn fallback_reply(&self) -> MockReply {
        match &self.behavior {
            MockBehavior::Echo => MockReply::Echo,
            MockBehavior::Fixed(text) => MockReply::Text(text.clone()),
            MockBehavior::Failing => MockReply::Failure,
            MockBehavior::Quota => MockReply::Quota,
        }
    }
}

/// Source part of a prompt: everything after the instruction line
fn prompt_source(prompt: &str) -> &str {
    prompt.split_once('\n').map(|(_, rest)| rest).unwrap_or(prompt)
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let scripted = self.script.lock().pop_front();
        let reply = scripted.unwrap_or_else(|| self.fallback_reply());

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Echo => Ok(prompt_source(&request.prompt).to_string()),
            MockReply::Failure => Err(ProviderError::ConnectionError(format!(
                "{} is unreachable",
                self.name
            ))),
            MockReply::Quota => Err(ProviderError::RateLimitExceeded(
                "quota exceeded".to_string(),
            )),
            MockReply::Empty => Err(ProviderError::EmptyResponse),
        }
    }
}
