//! Shared test helpers for tool caller and runner tests.

use async_trait::async_trait;
use quarry_core::error::{MessengerError, ProviderError};
use quarry_core::message::{Message, MessageToolCall};
use quarry_core::messenger::Messenger;
use quarry_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A mock provider that returns a sequence of scripted responses.
///
/// Once the script runs out, the last response repeats forever, which
/// models an agent that never finishes.
pub struct ScriptedProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        assert!(!responses.is_empty(), "script needs at least one response");
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let idx = n.min(self.responses.len() - 1);
        Ok(self.responses[idx].clone())
    }
}

/// A provider whose endpoint is down.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Create a simple text response (no tool calls).
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response selecting one tool.
pub fn tool_response(name: &str, args: serde_json::Value) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_tool_call("", tool_call(name, args)),
        usage: None,
        model: "mock-model".into(),
    }
}

pub fn tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A messenger that can block, answering every question with `reply`.
pub struct AnsweringMessenger {
    reply: String,
    sent: Mutex<Vec<String>>,
}

impl AnsweringMessenger {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for AnsweringMessenger {
    fn name(&self) -> &str {
        "answering"
    }

    async fn send(&self, text: &str) -> Result<(), MessengerError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn supports_blocking_ask(&self) -> bool {
        true
    }

    async fn ask(&self, _question: &str) -> Result<String, MessengerError> {
        Ok(self.reply.clone())
    }
}
