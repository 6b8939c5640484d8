//! The tool-calling loop.
//!
//! Each iteration consults the model once with the full ledger and the tool
//! catalog. A tool selection is validated, executed and its outcome appended
//! as a `tool` entry; a text answer counts as an idle turn. The loop ends
//! when `complete` runs, when the idle limit is reached, or with an error.

use chrono::Utc;
use quarry_core::error::{TaskError, ToolError};
use quarry_core::event::{DomainEvent, EventBus};
use quarry_core::message::{Message, Role};
use quarry_core::messenger::Messenger;
use quarry_core::provider::{Provider, ProviderRequest};
use quarry_core::task::{TaskState, TaskStatus};
use quarry_core::tool::{ToolCall, ToolContext, ToolRegistry, ToolSignal};
use quarry_tools::strip_reasoning;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use crate::prompt;

const IDLE_PLACEHOLDER: &str = "(did not use a tool)";
const IDLE_FALLBACK_SUMMARY: &str = "The task ended without a final answer.";

pub struct ToolCaller {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    max_iterations: u32,
    max_idle_turns: u32,
    event_bus: Arc<EventBus>,
}

impl ToolCaller {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            max_iterations: 30,
            max_idle_turns: 3,
            event_bus,
        }
    }

    /// Model consultations allowed before `BudgetExceeded`.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Consecutive text answers after which the task is closed.
    pub fn with_max_idle_turns(mut self, max: u32) -> Self {
        self.max_idle_turns = max.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Drive `state` to completion and return the final summary.
    pub async fn run(
        &self,
        state: &mut TaskState,
        messenger: Arc<dyn Messenger>,
    ) -> Result<String, TaskError> {
        let task_id = uuid::Uuid::new_v4().to_string();
        info!(task_id = %task_id, messenger = %messenger.name(), "Task started");
        self.event_bus.publish(DomainEvent::TaskStarted {
            task_id: task_id.clone(),
            query_preview: state.current_task.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        state.status = TaskStatus::Running;
        let outcome = self.drive(&task_id, state, messenger).await;

        let (label, iterations) = match &outcome {
            Ok((_, n)) => ("completed".to_string(), *n),
            Err((e, n)) => (e.to_string(), *n),
        };
        if outcome.is_err() {
            state.status = TaskStatus::Failed;
        }
        let tool_calls = state.ledger.count_role(Role::Tool);
        info!(task_id = %task_id, iterations, tool_calls, outcome = %label, "Task finished");
        self.event_bus.publish(DomainEvent::TaskFinished {
            task_id,
            iterations,
            outcome: label,
            timestamp: Utc::now(),
        });

        outcome.map(|(summary, _)| summary).map_err(|(e, _)| e)
    }

    async fn drive(
        &self,
        task_id: &str,
        state: &mut TaskState,
        messenger: Arc<dyn Messenger>,
    ) -> Result<(String, u32), (TaskError, u32)> {
        let definitions = self.tools.definitions();
        let mut idle_turns = 0u32;

        for iteration in 1..=self.max_iterations {
            debug!(task_id = %task_id, iteration, "Tool caller iteration");

            let mut request = ProviderRequest::new(self.model.clone(), state.ledger.messages().to_vec());
            request.temperature = self.temperature;
            request.max_tokens = self.max_tokens;
            request.tools = definitions.clone();

            let response = self
                .provider
                .complete(request)
                .await
                .map_err(|e| (TaskError::Provider(e), iteration))?;
            let text = strip_reasoning(&response.message.content).to_string();

            let Some(selected) = response.first_tool_call().cloned() else {
                idle_turns += 1;
                debug!(task_id = %task_id, idle_turns, "Model answered without a tool");
                let recorded = if text.is_empty() { IDLE_PLACEHOLDER } else { text.as_str() };
                state.ledger.push(Message::assistant(recorded));

                if idle_turns >= self.max_idle_turns {
                    let summary = if text.is_empty() {
                        IDLE_FALLBACK_SUMMARY.to_string()
                    } else {
                        text
                    };
                    messenger
                        .send(&summary)
                        .await
                        .map_err(|e| (TaskError::Messenger(e), iteration))?;
                    state.status = TaskStatus::Done;
                    return Ok((summary, iteration));
                }
                state.ledger.push(Message::user(prompt::idle_nudge(&state.current_task)));
                continue;
            };
            idle_turns = 0;

            state.ledger.push(Message::assistant_tool_call(text, selected.clone()));
            let call = ToolCall::from(&selected);

            if call.name == "ask_to_user" && !messenger.supports_blocking_ask() {
                warn!(task_id = %task_id, messenger = %messenger.name(), "ask_to_user needs an interactive messenger");
                let err = TaskError::UnsupportedInteraction;
                state
                    .ledger
                    .push(Message::tool_result(&call.id, prompt::tool_failure(&call.name, &err.to_string())));
                return Err((err, iteration));
            }

            if call.name == "ask_to_user" {
                state.status = TaskStatus::AwaitingUser;
            }
            let ctx = ToolContext::new(messenger.clone(), state.current_task.clone());
            let started = Instant::now();
            let result = self.tools.execute(&call, &ctx).await;
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            state.status = TaskStatus::Running;

            self.event_bus.publish(DomainEvent::ToolExecuted {
                task_id: task_id.to_string(),
                tool_name: call.name.clone(),
                success: result.as_ref().map(|r| r.success).unwrap_or(false),
                duration_ms,
                timestamp: Utc::now(),
            });

            match result {
                Ok(result) => {
                    debug!(task_id = %task_id, tool = %call.name, success = result.success, duration_ms, "Tool executed");
                    if let ToolSignal::TaskRefined { task } = &result.signal {
                        info!(task_id = %task_id, "Current task replaced");
                        state.current_task = task.clone();
                    }

                    let entry = if result.success {
                        prompt::tool_output(&call.name, &result.output, &state.current_task)
                    } else {
                        prompt::tool_failure(&call.name, &result.output)
                    };
                    state.ledger.push(Message::tool_result(&call.id, entry));

                    if let ToolSignal::Complete { summary } = result.signal {
                        state.status = TaskStatus::Done;
                        return Ok((summary, iteration));
                    }
                }
                Err(ToolError::Messenger(e)) if call.name == "complete" => {
                    state
                        .ledger
                        .push(Message::tool_result(&call.id, prompt::tool_failure(&call.name, &e.to_string())));
                    return Err((TaskError::Messenger(e), iteration));
                }
                Err(e) => {
                    warn!(task_id = %task_id, tool = %call.name, error = %e, "Tool call failed");
                    state
                        .ledger
                        .push(Message::tool_result(&call.id, prompt::tool_failure(&call.name, &e.to_string())));
                }
            }
        }

        warn!(task_id = %task_id, max_iterations = self.max_iterations, "Iteration budget exhausted");
        Err((
            TaskError::BudgetExceeded {
                iterations: self.max_iterations,
            },
            self.max_iterations,
        ))
    }
}
