//! # Quarry Core
//!
//! Domain types, traits, and error definitions for the Quarry tool-calling
//! agent. This crate has **no framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! Every external collaborator (model endpoint, messenger, search engine,
//! page fetcher, tool) is a trait here. Implementations live in their
//! respective crates, so tests can swap in scripted fakes.

pub mod error;
pub mod message;
pub mod provider;
pub mod messenger;
pub mod tool;
pub mod task;
pub mod web;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MessengerError, ProviderError, Result, TaskError, ToolError};
pub use message::{Ledger, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use messenger::Messenger;
pub use tool::{SideEffect, Tool, ToolCall, ToolContext, ToolRegistry, ToolResult, ToolSignal};
pub use task::{TaskState, TaskStatus};
pub use web::{PageFetcher, SearchHit, SearchProvider};
pub use event::{DomainEvent, EventBus};
