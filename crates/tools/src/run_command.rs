//! `run_command`: execute a shell command in the workspace root.
//!
//! A nonzero exit status is reported as data, not as a tool error.

use async_trait::async_trait;
use quarry_core::error::ToolError;
use quarry_core::tool::{SideEffect, Tool, ToolContext, ToolResult, required_str};
use quarry_security::{CommandCheck, CommandPolicy, Workspace};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct RunCommandTool {
    workspace: Workspace,
    policy: CommandPolicy,
    timeout: Duration,
}

impl RunCommandTool {
    pub fn new(workspace: Workspace, policy: CommandPolicy, timeout: Duration) -> Self {
        Self {
            workspace,
            policy,
            timeout,
        }
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command in the workspace and return stdout, stderr and the exit status. Network downloaders such as curl and wget are not available; use infer_knowledge_by_url to read web pages."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Process
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let command = required_str(&arguments, "command")?.trim();
        if command.is_empty() {
            return Err(ToolError::InvalidArguments("No command given".into()));
        }

        if let CommandCheck::Denied { pattern } = self.policy.check(command) {
            warn!(command = %command, pattern = %pattern, "Forbidden command refused");
            return Err(ToolError::ForbiddenCommand {
                command: command.to_string(),
                pattern,
            });
        }

        debug!(command = %command, cwd = %self.workspace.root().display(), "Executing shell command");

        let child = Command::new("sh")
            .args(["-c", command])
            .current_dir(self.workspace.root())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: "run_command".into(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "run_command".into(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        if code != 0 {
            debug!(command = %command, exit_code = code, "Command exited nonzero");
        }

        let text = format!(
            "exit status: {code}\n<stdout>\n{}\n</stdout>\n<stderr>\n{}\n</stderr>",
            stdout.trim_end(),
            stderr.trim_end()
        );

        Ok(ToolResult::ok(text).with_data(serde_json::json!({
            "exit_code": code,
            "stdout": stdout,
            "stderr": stderr,
        })))
    }
}
