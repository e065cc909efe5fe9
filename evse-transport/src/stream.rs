//! Byte-stream traits for the transport layer

use async_trait::async_trait;
use evse_core::{KioskError, KioskResult};

/// Byte-stream interface over a physical device or socket
///
/// Content is never interpreted at this layer; framing and line handling
/// belong to the callers. Read timeouts are a property of the link's
/// settings, fixed when the link is created.
#[async_trait]
pub trait ByteStream: Send + Sync {
    /// Read available bytes into `buf`; 0 means EOF
    async fn read(&mut self, buf: &mut [u8]) -> KioskResult<usize>;

    /// Fill `buf` completely, failing if the stream ends first
    async fn read_exact(&mut self, buf: &mut [u8]) -> KioskResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(KioskError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("Stream ended {} bytes short", buf.len() - filled),
                )));
            }
            filled += n;
        }
        Ok(())
    }

    /// Write bytes from `buf`, returning how many were accepted
    async fn write(&mut self, buf: &[u8]) -> KioskResult<usize>;

    /// Write all of `buf`
    async fn write_all(&mut self, buf: &[u8]) -> KioskResult<()> {
        let mut rest = buf;
        while !rest.is_empty() {
            let n = self.write(rest).await?;
            if n == 0 {
                return Err(KioskError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Stream accepted no further bytes",
                )));
            }
            rest = &rest[n..];
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> KioskResult<()>;

    /// Whether the stream has been closed or reached EOF
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> KioskResult<()>;
}

/// A byte stream that owns its endpoint and can establish it
#[async_trait]
pub trait Link: ByteStream {
    /// Open the physical connection
    async fn open(&mut self) -> KioskResult<()>;
}
