//! `refine_task`: have the model rewrite the current task description.

use async_trait::async_trait;
use quarry_core::error::ToolError;
use quarry_core::tool::{SideEffect, Tool, ToolContext, ToolResult, ToolSignal, required_str};
use tracing::info;
use crate::model::ModelClient;

const REFINER_SYSTEM_PROMPT: &str = "You are a task refiner. Make the given task clearer and more detailed. Understand the background and requirements of the task deeply, and improve it by adding concrete details.";

pub struct RefineTaskTool {
    model: ModelClient,
}

impl RefineTaskTool {
    pub fn new(model: ModelClient) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Tool for RefineTaskTool {
    fn name(&self) -> &str {
        "refine_task"
    }

    fn description(&self) -> &str {
        "Rewrite the current task so it is clearer and more detailed, using what has been learned so far as context. The result replaces the current task."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "current_task": {
                    "type": "string",
                    "description": "The task as currently understood"
                },
                "context": {
                    "type": "string",
                    "description": "Background and findings that should shape the task"
                }
            },
            "required": ["current_task", "context"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Pure
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let current_task = required_str(&arguments, "current_task")?;
        let context = required_str(&arguments, "context")?;
        let prompt = format!(
            "Refine the following task.\n<current_task>\n{current_task}\n</current_task>\n<context>\n{context}\n</context>\nReturn an improved task whose content and background are clearer and more detailed."
        );

        let refined = self.model.ask(self.name(), REFINER_SYSTEM_PROMPT, &prompt).await?;
        if refined.is_empty() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: "model returned an empty task".into(),
            });
        }
        info!(chars = refined.len(), "Task refined");

        Ok(ToolResult::ok(refined.clone()).with_signal(ToolSignal::TaskRefined { task: refined }))
    }
}
