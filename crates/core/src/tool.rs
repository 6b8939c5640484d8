//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! read/write files, run commands, search the web, talk to the user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use crate::error::ToolError;
use crate::message::MessageToolCall;
use crate::messenger::Messenger;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl From<&MessageToolCall> for ToolCall {
    /// Keeps unparseable argument text as a JSON string so validation can
    /// report it instead of failing here.
    fn from(call: &MessageToolCall) -> Self {
        let arguments = if call.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.arguments)
                .unwrap_or_else(|_| serde_json::Value::String(call.arguments.clone()))
        };
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        }
    }
}

/// What a tool is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    Pure,
    Filesystem,
    Process,
    Network,
    UserInteraction,
}

/// Control-flow instruction a tool hands back to the loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolSignal {
    #[default]
    Continue,
    /// The task is finished; `summary` has been delivered to the requester.
    Complete { summary: String },
    /// Replace the current task description.
    TaskRefined { task: String },
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default)]
    pub signal: ToolSignal,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
            data: None,
            signal: ToolSignal::Continue,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(output)
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_signal(mut self, signal: ToolSignal) -> Self {
        self.signal = signal;
        self
    }
}

/// Per-task handles a tool may need while executing.
#[derive(Clone)]
pub struct ToolContext {
    pub messenger: Arc<dyn Messenger>,
    pub current_task: String,
}

impl ToolContext {
    pub fn new(messenger: Arc<dyn Messenger>, current_task: impl Into<String>) -> Self {
        Self {
            messenger,
            current_task: current_task.into(),
        }
    }
}

/// The core Tool trait.
///
/// Each built-in tool implements this trait. Tools are registered in the
/// ToolRegistry and made available to the tool caller.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file", "search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    fn side_effect(&self) -> SideEffect;

    /// Execute the tool with already-validated arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> std::result::Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// A registry of available tools.
///
/// The tool caller uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Validate and execute the tool the LLM selected
///
/// Built once at startup and shared read-only afterwards.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM), sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Check a call against the catalog and the tool's schema.
    ///
    /// Returns the normalized argument object. A JSON string that itself
    /// encodes an object is accepted, since some models double-encode.
    pub fn validate(&self, call: &ToolCall) -> std::result::Result<serde_json::Value, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let arguments = match &call.arguments {
            serde_json::Value::Object(_) => call.arguments.clone(),
            serde_json::Value::String(raw) => serde_json::from_str::<serde_json::Value>(raw)
                .ok()
                .filter(|v| v.is_object())
                .ok_or_else(|| {
                    ToolError::InvalidArguments(format!("arguments for '{}' are not a JSON object", call.name))
                })?,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "arguments for '{}' must be an object, got {other}",
                    call.name
                )));
            }
        };

        let schema = tool.parameters_schema();
        let required = schema["required"].as_array().cloned().unwrap_or_default();
        for key in required.iter().filter_map(|k| k.as_str()) {
            match arguments.get(key) {
                Some(serde_json::Value::String(_)) => {}
                Some(_) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "'{key}' for '{}' must be a string",
                        call.name
                    )));
                }
                None => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required parameter '{key}' for '{}'",
                        call.name
                    )));
                }
            }
        }

        Ok(arguments)
    }

    /// Validate and execute a tool call.
    pub async fn execute(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError> {
        let arguments = self.validate(call)?;
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        let mut result = tool.execute(arguments, ctx).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
