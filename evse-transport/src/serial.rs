//! Serial port link implementation

use crate::stream::{ByteStream, Link};
use async_trait::async_trait;
use evse_core::{KioskError, KioskResult};
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Serial link settings
///
/// The kiosk's devices all speak 8N1; only the device path, baud rate, and
/// read timeout vary per channel.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub device: String,
    pub baud_rate: u32,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create settings with the default 10 second read timeout
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Create settings with an explicit read timeout
    pub fn with_timeout(device: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            timeout: Some(timeout),
        }
    }
}

/// Open a raw serial stream with the kiosk's fixed 8N1 framing
///
/// Used directly by the relay, which splits the stream for bidirectional
/// forwarding; `SerialLink` wraps the same call behind the [`Link`] trait.
pub fn open_stream(settings: &SerialSettings) -> KioskResult<SerialStream> {
    let builder = tokio_serial::new(&settings.device, settings.baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .flow_control(tokio_serial::FlowControl::None);

    SerialStream::open(&builder).map_err(|e| {
        KioskError::ResourceUnavailable(format!(
            "Failed to open serial port {}: {}",
            settings.device, e
        ))
    })
}

/// Serial port link
pub struct SerialLink {
    stream: Option<SerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialLink")
            .field("settings", &self.settings)
            .field("closed", &self.closed)
            .finish()
    }
}

impl SerialLink {
    /// Create a new serial link (not yet opened)
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    fn stream_mut(&mut self) -> KioskResult<&mut SerialStream> {
        self.stream.as_mut().ok_or_else(|| {
            KioskError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Serial stream not connected",
            ))
        })
    }
}

#[async_trait]
impl Link for SerialLink {
    async fn open(&mut self) -> KioskResult<()> {
        if !self.closed {
            return Err(KioskError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let stream = open_stream(&self.settings)?;
        self.stream = Some(stream);
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl ByteStream for SerialLink {
    async fn read(&mut self, buf: &mut [u8]) -> KioskResult<usize> {
        let timeout = self.settings.timeout;
        let device = self.settings.device.clone();
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| KioskError::DeviceTimeout(format!("serial read on {}", device)))?
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
        let device = self.settings.device.clone();
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| KioskError::DeviceTimeout(format!("serial write on {}", device)))?
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
            let _ = stream.flush().await;
        }
        self.closed = true;
        Ok(())
    }
}
