//! TCP link implementation

use crate::stream::{ByteStream, Link};
use async_trait::async_trait;
use evse_core::{KioskError, KioskResult};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// TCP link settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub address: SocketAddr,
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create settings with the default 30 second timeout
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create settings with an explicit timeout
    pub fn with_timeout(address: SocketAddr, timeout: Duration) -> Self {
        Self {
            address,
            timeout: Some(timeout),
        }
    }
}

/// TCP link
pub struct TcpLink {
    stream: Option<TcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl fmt::Debug for TcpLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpLink")
            .field("settings", &self.settings)
            .field("closed", &self.closed)
            .finish()
    }
}

impl TcpLink {
    /// Create a new TCP link (not yet connected)
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create a TCP link from an address string such as "127.0.0.1:6010"
    pub fn from_address(address: &str) -> KioskResult<Self> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| KioskError::ProtocolDecode(format!("Invalid TCP address: {}", e)))?;
        Ok(Self::new(TcpSettings::new(addr)))
    }

    /// Wrap an already-accepted stream (server side)
    pub fn from_connected_stream(stream: TcpStream, timeout: Option<Duration>) -> Self {
        let address = stream
            .peer_addr()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)));
        Self {
            stream: Some(stream),
            settings: TcpSettings { address, timeout },
            closed: false,
        }
    }

    fn stream_mut(&mut self) -> KioskResult<&mut TcpStream> {
        self.stream.as_mut().ok_or_else(|| {
            KioskError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "TCP stream not connected",
            ))
        })
    }
}

#[async_trait]
impl Link for TcpLink {
    async fn open(&mut self) -> KioskResult<()> {
        if !self.closed {
            return Err(KioskError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let stream = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, TcpStream::connect(self.settings.address))
                .await
                .map_err(|_| {
                    KioskError::DeviceTimeout(format!("TCP connect to {}", self.settings.address))
                })?
                .map_err(KioskError::Connection)?
        } else {
            TcpStream::connect(self.settings.address)
                .await
                .map_err(KioskError::Connection)?
        };

        self.stream = Some(stream);
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl ByteStream for TcpLink {
    async fn read(&mut self, buf: &mut [u8]) -> KioskResult<usize> {
        let timeout = self.settings.timeout;
        let address = self.settings.address;
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| KioskError::DeviceTimeout(format!("TCP read from {}", address)))?
                .map_err(KioskError::Connection)
        } else {
            stream.read(buf).await.map_err(KioskError::Connection)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> KioskResult<usize> {
        let timeout = self.settings.timeout;
        let address = self.settings.address;
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| KioskError::DeviceTimeout(format!("TCP write to {}", address)))?
                .map_err(KioskError::Connection)
        } else {
            stream.write(buf).await.map_err(KioskError::Connection)
        }
    }

    async fn flush(&mut self) -> KioskResult<()> {
        let stream = self.stream_mut()?;
        stream.flush().await.map_err(KioskError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> KioskResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tcp_settings() {
        let addr: SocketAddr = "127.0.0.1:6010".parse().unwrap();
        let settings = TcpSettings::new(addr);
        assert_eq!(settings.address, addr);
        assert!(settings.timeout.is_some());
    }

    #[tokio::test]
    async fn test_from_connected_stream_is_open() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        drop(client);

        let link = TcpLink::from_connected_stream(server, None);
        assert!(!link.is_closed());
    }
}
