//! `complete`: deliver the final summary and end the task.

use async_trait::async_trait;
use quarry_core::error::ToolError;
use quarry_core::tool::{SideEffect, Tool, ToolContext, ToolResult, ToolSignal, required_str};

pub struct CompleteTool;

#[async_trait]
impl Tool for CompleteTool {
    fn name(&self) -> &str {
        "complete"
    }

    fn description(&self) -> &str {
        "Finish the task. The message is the final answer: summarize everything found without dropping context and include the source URLs as evidence."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The final answer for the user"
                }
            },
            "required": ["message"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::UserInteraction
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let summary = required_str(&arguments, "message")?;
        ctx.messenger.send(summary).await?;
        Ok(ToolResult::ok("Task completed").with_signal(ToolSignal::Complete {
            summary: summary.to_string(),
        }))
    }
}
