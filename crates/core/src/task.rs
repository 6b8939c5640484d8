//! Task state: everything one run of the tool caller owns.

use serde::Serialize;
use crate::message::{Ledger, Message};

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    /// Blocked on `ask_to_user`
    AwaitingUser,
    Done,
    Failed,
}

/// Ledger, task description and status for a single task.
///
/// Owned by exactly one runner; never shared between requests.
#[derive(Debug, Clone, Serialize)]
pub struct TaskState {
    pub ledger: Ledger,
    pub current_task: String,
    pub status: TaskStatus,
}

impl TaskState {
    /// Seed a task: system prompt first, then the query as the first user turn.
    pub fn new(system_prompt: impl Into<String>, query: impl Into<String>) -> Self {
        let query = query.into();
        let mut ledger = Ledger::new(system_prompt);
        ledger.push(Message::user(query.clone()));
        Self {
            ledger,
            current_task: query,
            status: TaskStatus::Running,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}
