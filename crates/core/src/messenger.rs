//! Messenger trait: how a task talks back to whoever asked for it.
//!
//! The same loop runs against an interactive console (which can block for
//! a reply) and against a request-scoped capture buffer (which cannot).

use async_trait::async_trait;
use crate::error::MessengerError;

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Human-readable messenger name (e.g., "console", "capture").
    fn name(&self) -> &str;

    /// Deliver user-directed text.
    async fn send(&self, text: &str) -> std::result::Result<(), MessengerError>;

    /// Whether `ask` can block until the user replies.
    fn supports_blocking_ask(&self) -> bool;

    /// Show `question` and wait for the user's reply.
    async fn ask(&self, question: &str) -> std::result::Result<String, MessengerError>;
}
