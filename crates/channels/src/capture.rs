//! Capture messenger: request-scoped buffer for service calls.
//!
//! Collects every message sent during one request. It cannot block for
//! user input, so `ask` always fails with `Unsupported`.

use async_trait::async_trait;
use quarry_core::error::MessengerError;
use quarry_core::messenger::Messenger;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct CaptureMessenger {
    sent: Mutex<Vec<String>>,
}

impl CaptureMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The most recent message, which is the summary once a task completes.
    pub fn final_text(&self) -> Option<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }
}

#[async_trait]
impl Messenger for CaptureMessenger {
    fn name(&self) -> &str {
        "capture"
    }

    async fn send(&self, text: &str) -> Result<(), MessengerError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }

    fn supports_blocking_ask(&self) -> bool {
        false
    }

    async fn ask(&self, _question: &str) -> Result<String, MessengerError> {
        Err(MessengerError::Unsupported(self.name().to_string()))
    }
}
