//! Outgoing command writer for a relay session

use evse_core::{KioskError, KioskResult};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Newline-terminating line writer over a channel's client socket
///
/// Carries the commands sent outward: `SCAN`, `DISCONNECT`, the 1-based
/// selection token, and mesh command lines.
#[derive(Debug)]
pub struct CommandWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> CommandWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Send one command line, appending the terminator
    pub async fn send_line(&mut self, line: &str) -> KioskResult<()> {
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(KioskError::Connection)?;
        self.writer
            .write_all(b"\n")
            .await
            .map_err(KioskError::Connection)?;
        self.writer.flush().await.map_err(KioskError::Connection)?;
        Ok(())
    }
}
