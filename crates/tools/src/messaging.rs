//! `ask_to_user` and `report_to_user`: talk to the requester through the
//! task's messenger.

use async_trait::async_trait;
use quarry_core::error::{MessengerError, ToolError};
use quarry_core::tool::{SideEffect, Tool, ToolContext, ToolResult, required_str};
use tracing::debug;

fn message_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "message": {
                "type": "string",
                "description": description
            }
        },
        "required": ["message"]
    })
}

pub struct AskToUserTool;

#[async_trait]
impl Tool for AskToUserTool {
    fn name(&self) -> &str {
        "ask_to_user"
    }

    fn description(&self) -> &str {
        "Ask the user a question and wait for the answer. Use it when the intent of the task is unclear or a decision needs confirmation."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        message_schema("The question to ask")
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::UserInteraction
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let question = required_str(&arguments, "message")?;
        if !ctx.messenger.supports_blocking_ask() {
            return Err(MessengerError::Unsupported(ctx.messenger.name().to_string()).into());
        }

        let reply = ctx.messenger.ask(question).await?;
        debug!(messenger = %ctx.messenger.name(), "User replied");
        Ok(ToolResult::ok(format!("The user replied:\n{reply}")))
    }
}

pub struct ReportToUserTool;

#[async_trait]
impl Tool for ReportToUserTool {
    fn name(&self) -> &str {
        "report_to_user"
    }

    fn description(&self) -> &str {
        "Send a progress report to the user without waiting for an answer, for example the plan you are about to follow."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        message_schema("The report to send")
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::UserInteraction
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let message = required_str(&arguments, "message")?;
        ctx.messenger.send(message).await?;
        Ok(ToolResult::ok(format!("Sent the following message\n\n{message}\n")))
    }
}
