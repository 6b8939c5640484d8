//! Error types for the Quarry domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `TaskError` is the only one
//! that ends a running task.

use thiserror::Error;

/// The top-level error type for all Quarry operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum MessengerError {
    /// The messenger cannot block waiting for a human reply.
    #[error("Messenger '{0}' cannot wait for user input")]
    Unsupported(String),

    #[error("Message delivery failed on {messenger}: {reason}")]
    DeliveryFailed { messenger: String, reason: String },

    #[error("Input stream closed")]
    Closed,
}

/// Failures of a single tool invocation.
///
/// These are recorded in the ledger as a `tool` entry and never end the task.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Command '{command}' contains forbidden pattern '{pattern}'")]
    ForbiddenCommand { command: String, pattern: String },

    #[error("Path '{path}' escapes the workspace")]
    PathEscapesWorkspace { path: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Search provider failed: {0}")]
    SearchProvider(String),

    #[error("Failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Messenger failed: {0}")]
    Messenger(#[from] MessengerError),
}

/// Errors that terminate a task.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Task is blocked waiting for user input")]
    UnsupportedInteraction,

    #[error("Iteration budget of {iterations} exhausted without completion")]
    BudgetExceeded { iterations: u32 },

    #[error("Model endpoint failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Could not deliver final message: {0}")]
    Messenger(#[from] MessengerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::ForbiddenCommand {
            command: "curl http://x".into(),
            pattern: "curl".into(),
        });
        assert!(err.to_string().contains("curl http://x"));
        assert!(err.to_string().contains("forbidden"));
    }

    #[test]
    fn messenger_error_converts_into_task_error() {
        let err: TaskError = MessengerError::Closed.into();
        assert!(matches!(err, TaskError::Messenger(MessengerError::Closed)));
    }

    #[test]
    fn budget_error_mentions_iterations() {
        let err = TaskError::BudgetExceeded { iterations: 7 };
        assert!(err.to_string().contains('7'));
    }
}
