//! The tool-calling agent: the heart of Quarry.
//!
//! The agent follows a **Select → Act → Record** cycle:
//!
//! 1. **Seed** a task ledger with the system prompt and the user's query
//! 2. **Consult** the model with the ledger and the tool catalog
//! 3. **If a tool is selected**: validate, execute, record the outcome, loop
//! 4. **If text comes back**: nudge the model toward a tool, loop
//! 5. **On `complete`**: deliver the summary through the messenger
//!
//! The loop stops on completion, after too many idle turns, or when the
//! iteration budget runs out.

pub mod prompt;
pub mod runner;
pub mod runtime;
pub mod tool_caller;

#[cfg(test)]
mod test_helpers;

pub use runner::TaskRunner;
pub use runtime::Runtime;
pub use tool_caller::ToolCaller;
