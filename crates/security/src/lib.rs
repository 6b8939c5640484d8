//! Security policies for Quarry's local tools.
//!
//! Provides:
//! - **Path validation**: filesystem sandboxing to the workspace directory
//! - **Command policy**: denylist for shell execution

pub mod command;
pub mod path;

pub use command::{CommandCheck, CommandPolicy};
pub use path::{PathError, Workspace};
