//! Console messenger: interactive terminal I/O.
//!
//! Used by `quarry agent`. Reads task lines and answers from stdin and
//! writes agent output to stdout. `ask` blocks until the user replies.

use async_trait::async_trait;
use quarry_core::error::MessengerError;
use quarry_core::messenger::Messenger;
use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::debug;

pub struct ConsoleMessenger<R, W> {
    input: Mutex<Lines<BufReader<R>>>,
    output: Mutex<W>,
}

impl ConsoleMessenger<io::Stdin, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<R, W> ConsoleMessenger<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(BufReader::new(input).lines()),
            output: Mutex::new(output),
        }
    }

    async fn write(&self, text: &str) -> Result<(), MessengerError> {
        let mut out = self.output.lock().await;
        out.write_all(text.as_bytes()).await.map_err(delivery_failed)?;
        out.flush().await.map_err(delivery_failed)
    }

    /// Show `prompt` and read the next non-empty line. `None` on end of
    /// input or an exit command.
    pub async fn read_task(&self, prompt: &str) -> Result<Option<String>, MessengerError> {
        loop {
            self.write(prompt).await?;
            let line = self.input.lock().await.next_line().await.map_err(delivery_failed)?;
            let Some(line) = line else {
                debug!("Console input closed");
                return Ok(None);
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
                debug!(command = line, "Console exit requested");
                return Ok(None);
            }
            return Ok(Some(line.to_string()));
        }
    }
}

fn delivery_failed(e: std::io::Error) -> MessengerError {
    MessengerError::DeliveryFailed {
        messenger: "console".into(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl<R, W> Messenger for ConsoleMessenger<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, text: &str) -> Result<(), MessengerError> {
        self.write(&format!("{text}\n")).await
    }

    fn supports_blocking_ask(&self) -> bool {
        true
    }

    async fn ask(&self, question: &str) -> Result<String, MessengerError> {
        self.write(&format!("{question}\n> ")).await?;
        match self.input.lock().await.next_line().await.map_err(delivery_failed)? {
            Some(reply) => Ok(reply.trim().to_string()),
            None => Err(MessengerError::Closed),
        }
    }
}
