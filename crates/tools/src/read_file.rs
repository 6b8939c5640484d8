//! `read_file`: read a text file inside the workspace.

use async_trait::async_trait;
use quarry_core::error::ToolError;
use quarry_core::tool::{SideEffect, Tool, ToolContext, ToolResult, required_str};
use quarry_security::Workspace;
use tracing::debug;
use crate::sandbox_error;

pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Paths are relative to the workspace root."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Filesystem
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let resolved = self.workspace.resolve(path).map_err(sandbox_error)?;
        debug!(path = %resolved.display(), "Reading file");

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(ToolResult::ok(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ToolError::NotFound(path.to_string())),
            Err(e) => Err(ToolError::ExecutionFailed {
                tool_name: "read_file".into(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ctx;

    fn tool() -> (tempfile::TempDir, ReadFileTool) {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool::new(Workspace::new(dir.path()).unwrap());
        (dir, tool)
    }

    #[test]
    fn tool_definition() {
        let (_dir, tool) = tool();
        assert_eq!(tool.name(), "read_file");
        assert_eq!(tool.parameters_schema()["required"], serde_json::json!(["path"]));
        assert_eq!(tool.side_effect(), SideEffect::Filesystem);
    }

    #[tokio::test]
    async fn read_existing_file() {
        let (dir, tool) = tool();
        std::fs::write(dir.path().join("notes.txt"), "Hello, world!").unwrap();

        let result = tool
            .execute(serde_json::json!({"path": "notes.txt"}), &ctx())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Hello, world!");
    }

    #[tokio::test]
    async fn read_nonexistent_file() {
        let (_dir, tool) = tool();
        let err = tool
            .execute(serde_json::json!({"path": "missing.txt"}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn path_traversal_blocked() {
        let (_dir, tool) = tool();
        let err = tool
            .execute(serde_json::json!({"path": "../../etc/passwd"}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PathEscapesWorkspace { .. }));
    }
}
