//! Task runner: one fresh task per query.
//!
//! The runner owns only shared, read-only handles (provider, tool registry,
//! event bus). Every call builds its own `TaskState` and, for service calls,
//! its own capture messenger, so concurrent requests never see each other's
//! ledgers.

use chrono::Local;
use quarry_channels::CaptureMessenger;
use quarry_config::AppConfig;
use quarry_core::error::TaskError;
use quarry_core::event::EventBus;
use quarry_core::messenger::Messenger;
use quarry_core::provider::Provider;
use quarry_core::task::TaskState;
use quarry_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::prompt;
use crate::tool_caller::ToolCaller;

pub const TIMEOUT_MESSAGE: &str = "Error: Task processing timed out";
pub const EMPTY_RESPONSE_MESSAGE: &str = "Error: Agent generated a null response";

pub struct TaskRunner {
    caller: ToolCaller,
    system_prompt_override: Option<String>,
    timeout: Duration,
}

impl TaskRunner {
    pub fn new(caller: ToolCaller) -> Self {
        Self {
            caller,
            system_prompt_override: None,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let mut caller = ToolCaller::new(
            provider,
            config.default_model.clone(),
            config.default_temperature,
            tools,
            event_bus,
        )
        .with_max_iterations(config.agent.max_iterations)
        .with_max_idle_turns(config.agent.max_idle_turns);
        if config.default_max_tokens > 0 {
            caller = caller.with_max_tokens(config.default_max_tokens);
        }

        Self {
            caller,
            system_prompt_override: config.agent.system_prompt_override.clone(),
            timeout: Duration::from_secs(config.agent.request_timeout_secs),
        }
    }

    /// Overall deadline for `handle`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt_override = Some(prompt.into());
        self
    }

    /// The system prompt for a task starting now.
    pub fn system_prompt(&self) -> String {
        let today = Local::now().date_naive();
        match &self.system_prompt_override {
            Some(custom) => prompt::with_date(custom, today),
            None => prompt::system_prompt(today),
        }
    }

    /// Run `query` as a new task, talking through `messenger`.
    pub async fn run_task(&self, query: &str, messenger: Arc<dyn Messenger>) -> Result<String, TaskError> {
        let mut state = TaskState::new(self.system_prompt(), query.trim());
        let outcome = self.caller.run(&mut state, messenger).await;
        debug!(done = state.is_done(), ledger_len = state.ledger.len(), "Task state released");
        outcome
    }

    /// Service entry point: run `query` non-interactively and always
    /// return a string. Failures start with `Error:`.
    pub async fn handle(&self, query: &str) -> String {
        let capture = Arc::new(CaptureMessenger::new());
        let outcome = tokio::time::timeout(self.timeout, self.run_task(query, capture.clone())).await;

        match outcome {
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Task timed out");
                TIMEOUT_MESSAGE.to_string()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Task failed");
                format!("Error: {e}")
            }
            Ok(Ok(summary)) => {
                let text = capture.final_text().unwrap_or(summary);
                if text.trim().is_empty() {
                    EMPTY_RESPONSE_MESSAGE.to_string()
                } else {
                    info!(chars = text.len(), "Task answered");
                    text
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use async_trait::async_trait;
    use quarry_core::error::ProviderError;
    use quarry_core::message::{Message, Role};
    use quarry_core::provider::{ProviderRequest, ProviderResponse};
    use quarry_tools::complete::CompleteTool;
    use quarry_tools::messaging::AskToUserTool;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CompleteTool));
        registry.register(Box::new(AskToUserTool));
        Arc::new(registry)
    }

    fn runner(provider: Arc<dyn Provider>) -> TaskRunner {
        TaskRunner::new(
            ToolCaller::new(provider, "m", 0.0, registry(), Arc::new(EventBus::default()))
                .with_max_iterations(4),
        )
    }

    #[tokio::test]
    async fn handle_returns_captured_summary() {
        let provider = Arc::new(ScriptedProvider::new(vec![tool_response(
            "complete",
            serde_json::json!({"message": "Rust 1.0 shipped in 2015."}),
        )]));
        let answer = runner(provider.clone()).handle("when did rust 1.0 ship?").await;
        assert_eq!(answer, "Rust 1.0 shipped in 2015.");

        let first = &provider.requests()[0];
        assert_eq!(first.messages[0].role, Role::System);
        assert!(first.messages[0].content.contains("Today is"));
        assert_eq!(first.messages[1].content, "when did rust 1.0 ship?");
    }

    #[tokio::test]
    async fn handle_reports_blocked_interaction() {
        let provider = Arc::new(ScriptedProvider::new(vec![tool_response(
            "ask_to_user",
            serde_json::json!({"message": "Which version?"}),
        )]));
        let answer = runner(provider).handle("rust").await;
        assert_eq!(answer, "Error: Task is blocked waiting for user input");
    }

    #[tokio::test]
    async fn handle_reports_budget_exhaustion() {
        let provider = Arc::new(ScriptedProvider::new(vec![tool_response(
            "nope",
            serde_json::json!({}),
        )]));
        let answer = runner(provider).handle("rust").await;
        assert!(answer.starts_with("Error: "));
        assert!(answer.contains("budget of 4"));
    }

    #[tokio::test]
    async fn handle_reports_model_failure() {
        let answer = runner(Arc::new(FailingProvider)).handle("rust").await;
        assert!(answer.starts_with("Error: Model endpoint failed"));
    }

    #[tokio::test]
    async fn empty_summary_is_null_response() {
        let provider = Arc::new(ScriptedProvider::new(vec![tool_response(
            "complete",
            serde_json::json!({"message": "  "}),
        )]));
        assert_eq!(runner(provider).handle("rust").await, EMPTY_RESPONSE_MESSAGE);
    }

    struct SlowProvider;

    #[async_trait]
    impl Provider for SlowProvider {
        fn name(&self) -> &str { "slow" }
        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Timeout("unreachable".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handle_times_out() {
        let runner = runner(Arc::new(SlowProvider)).with_timeout(Duration::from_secs(5));
        assert_eq!(runner.handle("rust").await, TIMEOUT_MESSAGE);
    }

    /// Echoes the ledger length so each request's isolation is observable.
    struct LedgerProbe;

    #[async_trait]
    impl Provider for LedgerProbe {
        fn name(&self) -> &str { "probe" }
        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let query = request.messages[1].content.clone();
            let summary = format!("{query}:{}", request.messages.len());
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(ProviderResponse {
                message: Message::assistant_tool_call(
                    "",
                    tool_call("complete", serde_json::json!({"message": summary})),
                ),
                usage: None,
                model: "probe".into(),
            })
        }
    }

    #[tokio::test]
    async fn concurrent_requests_are_isolated() {
        let runner = Arc::new(runner(Arc::new(LedgerProbe)));
        let a = tokio::spawn({
            let runner = runner.clone();
            async move { runner.handle("alpha").await }
        });
        let b = tokio::spawn({
            let runner = runner.clone();
            async move { runner.handle("beta").await }
        });
        assert_eq!(a.await.unwrap(), "alpha:2");
        assert_eq!(b.await.unwrap(), "beta:2");
    }

    #[test]
    fn override_prompt_is_dated() {
        let runner = runner(Arc::new(FailingProvider)).with_system_prompt("Be terse.");
        let prompt = runner.system_prompt();
        assert!(prompt.starts_with("Be terse.\nToday is "));
    }
}
