//! Messenger implementations for Quarry.
//!
//! A messenger carries agent output to whoever started the task.
//!
//! Available messengers:
//! - **Console**: interactive terminal (stdin/stdout), can ask the user
//! - **Capture**: request-scoped buffer used by the service front end

pub mod capture;
pub mod console;

pub use capture::CaptureMessenger;
pub use console::ConsoleMessenger;
