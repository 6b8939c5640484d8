//! `write_file`: create or overwrite a file inside the workspace.

use async_trait::async_trait;
use quarry_core::error::ToolError;
use quarry_core::tool::{SideEffect, Tool, ToolContext, ToolResult, required_str};
use quarry_security::Workspace;
use tracing::debug;
use crate::sandbox_error;

pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in the workspace. Creates the file and missing parent directories, overwrites if it exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write to"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Filesystem
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let content = required_str(&arguments, "content")?;
        let resolved = self.workspace.resolve(path).map_err(sandbox_error)?;

        let failed = |e: std::io::Error| ToolError::ExecutionFailed {
            tool_name: "write_file".into(),
            reason: e.to_string(),
        };

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }
        tokio::fs::write(&resolved, content).await.map_err(failed)?;
        debug!(path = %resolved.display(), bytes = content.len(), "Wrote file");

        Ok(ToolResult::ok(format!("File written successfully: {path} ({} bytes)", content.len())))
    }
}
