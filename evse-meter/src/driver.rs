//! Power meter driver
//!
//! Each reading is one write of a 7-byte request followed by exactly 7
//! response bytes within the configured timeout. The driver is generic over
//! the byte stream so it runs identically against the real serial link and
//! an in-memory test stream.

use crate::frame::{DEFAULT_METER_ADDRESS, FRAME_LEN, MeterFrame, ReadOp};
use evse_core::{KioskError, KioskResult};
use evse_transport::ByteStream;
use std::time::Duration;

/// Meter driver configuration
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// 4-byte device address embedded in every request
    pub address: [u8; 4],
    /// Per-operation response timeout
    pub timeout: Duration,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_METER_ADDRESS,
            timeout: Duration::from_secs(10),
        }
    }
}

/// One full set of instantaneous readings
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub voltage: f64,
    pub current: f64,
    pub power: u16,
    pub energy: u32,
}

/// Driver for the kiosk's serial power meter
#[derive(Debug)]
pub struct PowerMeter<S: ByteStream> {
    stream: S,
    config: MeterConfig,
}

impl<S: ByteStream> PowerMeter<S> {
    /// Create a driver over an already-opened stream with default config
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, MeterConfig::default())
    }

    pub fn with_config(stream: S, config: MeterConfig) -> Self {
        Self { stream, config }
    }

    /// One request/response exchange
    async fn transact(&mut self, op: ReadOp) -> KioskResult<MeterFrame> {
        let request = MeterFrame::request(op, self.config.address);
        self.stream.write_all(request.as_bytes()).await?;
        self.stream.flush().await?;

        let mut response = [0u8; FRAME_LEN];
        match tokio::time::timeout(self.config.timeout, self.stream.read_exact(&mut response)).await
        {
            Ok(Ok(())) => MeterFrame::parse(&response),
            // A stream that ends or stalls mid-frame is a short read: the
            // meter did not answer this operation in time.
            Ok(Err(KioskError::Connection(e)))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                Err(KioskError::DeviceTimeout(op.label().to_string()))
            }
            Ok(Err(KioskError::DeviceTimeout(_))) | Err(_) => {
                Err(KioskError::DeviceTimeout(op.label().to_string()))
            }
            Ok(Err(e)) => Err(e),
        }
    }

    /// Confirm the meter is addressable
    ///
    /// Sends the address-set command and validates the echo. Required to
    /// succeed before any reading is trusted.
    pub async fn probe(&mut self) -> KioskResult<()> {
        self.transact(ReadOp::AddressCheck).await.map(|_| ())
    }

    /// Instantaneous voltage in volts
    pub async fn read_voltage(&mut self) -> KioskResult<f64> {
        Ok(self.transact(ReadOp::Voltage).await?.decode_voltage())
    }

    /// Instantaneous current in amperes
    pub async fn read_current(&mut self) -> KioskResult<f64> {
        Ok(self.transact(ReadOp::Current).await?.decode_current())
    }

    /// Instantaneous active power in meter counts
    pub async fn read_power(&mut self) -> KioskResult<u16> {
        Ok(self.transact(ReadOp::Power).await?.decode_power())
    }

    /// Accumulated registered energy in meter counts
    pub async fn read_energy(&mut self) -> KioskResult<u32> {
        Ok(self.transact(ReadOp::RegisteredEnergy).await?.decode_energy())
    }

    /// Probe, then take all four readings
    pub async fn read_all(&mut self) -> KioskResult<MeterReading> {
        self.probe().await?;
        let reading = MeterReading {
            voltage: self.read_voltage().await?,
            current: self.read_current().await?,
            power: self.read_power().await?,
            energy: self.read_energy().await?,
        };
        log::debug!("Meter readings: {:?}", reading);
        Ok(reading)
    }

    /// Release the underlying stream
    pub async fn close(&mut self) -> KioskResult<()> {
        self.stream.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Scripted stream: replays queued reply bytes, records writes
    struct ScriptedStream {
        inbox: VecDeque<u8>,
        written: Vec<u8>,
        /// Pend instead of returning EOF once the inbox is drained
        stall_when_drained: bool,
        closed: bool,
    }

    impl ScriptedStream {
        fn replying(reply: &[u8]) -> Self {
            Self {
                inbox: reply.iter().copied().collect(),
                written: Vec::new(),
                stall_when_drained: false,
                closed: false,
            }
        }

        fn silent() -> Self {
            let mut stream = Self::replying(&[]);
            stream.stall_when_drained = true;
            stream
        }
    }

    #[async_trait]
    impl ByteStream for ScriptedStream {
        async fn read(&mut self, buf: &mut [u8]) -> KioskResult<usize> {
            if self.inbox.is_empty() {
                if self.stall_when_drained {
                    std::future::pending::<()>().await;
                }
                return Ok(0);
            }
            let mut n = 0;
            while n < buf.len() {
                match self.inbox.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }

        async fn write(&mut self, buf: &[u8]) -> KioskResult<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> KioskResult<()> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed
        }

        async fn close(&mut self) -> KioskResult<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn framed(head: [u8; 6]) -> Vec<u8> {
        let sum = head.iter().fold(0u8, |s, b| s.wrapping_add(*b));
        let mut bytes = head.to_vec();
        bytes.push(sum);
        bytes
    }

    fn short_config() -> MeterConfig {
        MeterConfig {
            timeout: Duration::from_millis(50),
            ..MeterConfig::default()
        }
    }

    #[tokio::test]
    async fn test_read_power_sends_request_and_decodes_reply() {
        // Reply payload 0x01F4 = 500 counts
        let stream = ScriptedStream::replying(&framed([0xA2, 0x01, 0xF4, 0x00, 0x00, 0x00]));
        let mut meter = PowerMeter::new(stream);

        let power = meter.read_power().await.unwrap();
        assert_eq!(power, 500);
        assert_eq!(
            meter.stream.written,
            vec![0xB2, 0xC0, 0xA8, 0x01, 0x01, 0x00, 0x1C]
        );
    }

    #[tokio::test]
    async fn test_read_voltage_decodes_tenths() {
        let stream = ScriptedStream::replying(&framed([0xA0, 0x00, 0xE6, 0x02, 0x00, 0x00]));
        let mut meter = PowerMeter::new(stream);
        let voltage = meter.read_voltage().await.unwrap();
        assert!((voltage - 230.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_read_energy_decodes_be24() {
        let stream = ScriptedStream::replying(&framed([0xA3, 0x01, 0x02, 0x03, 0x00, 0x00]));
        let mut meter = PowerMeter::new(stream);
        assert_eq!(meter.read_energy().await.unwrap(), 0x010203);
    }

    #[tokio::test]
    async fn test_probe_validates_echo() {
        let stream = ScriptedStream::replying(&framed([0xB4, 0xC0, 0xA8, 0x01, 0x01, 0x00]));
        let mut meter = PowerMeter::new(stream);
        assert!(meter.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_short_reply_is_a_timeout_naming_the_operation() {
        let stream = ScriptedStream::replying(&[0xA0, 0x00, 0xE6]);
        let mut meter = PowerMeter::with_config(stream, short_config());
        let err = meter.read_voltage().await.unwrap_err();
        match err {
            KioskError::DeviceTimeout(op) => assert_eq!(op, "reading voltage"),
            other => panic!("expected DeviceTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_meter_times_out() {
        let mut meter = PowerMeter::with_config(ScriptedStream::silent(), short_config());
        let err = meter.read_current().await.unwrap_err();
        assert!(matches!(err, KioskError::DeviceTimeout(op) if op == "reading current"));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_a_framing_error() {
        let mut reply = framed([0xA2, 0x01, 0xF4, 0x00, 0x00, 0x00]);
        reply[6] = reply[6].wrapping_add(1);
        let mut meter = PowerMeter::new(ScriptedStream::replying(&reply));
        let err = meter.read_power().await.unwrap_err();
        assert!(matches!(err, KioskError::Framing(_)));
    }

    #[tokio::test]
    async fn test_close_releases_stream() {
        let mut meter = PowerMeter::new(ScriptedStream::replying(&[]));
        meter.close().await.unwrap();
        assert!(meter.stream.is_closed());
    }
}
