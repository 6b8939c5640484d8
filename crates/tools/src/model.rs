//! One-shot model consultations used by the extraction and refinement tools.

use quarry_core::error::ToolError;
use quarry_core::message::Message;
use quarry_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;

/// Drop everything up to and including the last `</think>` marker.
pub fn strip_reasoning(text: &str) -> &str {
    match text.rfind("</think>") {
        Some(pos) => text[pos + "</think>".len()..].trim(),
        None => text.trim(),
    }
}

/// A provider handle bound to a model name.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a system + user pair without tools and return the answer text.
    pub async fn ask(&self, tool_name: &str, system: &str, user: &str) -> Result<String, ToolError> {
        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::system(system), Message::user(user)],
        );
        request.temperature = self.temperature;

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(strip_reasoning(&response.message.content).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_reasoning_keeps_text_after_last_marker() {
        assert_eq!(strip_reasoning("<think>a</think>first</think> answer "), "answer");
    }

    #[test]
    fn strip_reasoning_without_marker() {
        assert_eq!(strip_reasoning("  plain  "), "plain");
    }
}
