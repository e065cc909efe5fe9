//! Fixed 7-byte meter frames
//!
//! A request carries the command byte, the meter's 4-byte address, a zero
//! filler byte, and the checksum. A response echoes the command layout with
//! the reading in the payload bytes and the checksum last. In both
//! directions the last byte equals the sum of the preceding six, mod 256.

use evse_core::{KioskError, KioskResult};

/// Length of every meter frame, both directions
pub const FRAME_LEN: usize = 7;

/// Factory address of the kiosk's meter
pub const DEFAULT_METER_ADDRESS: [u8; 4] = [0xC0, 0xA8, 0x01, 0x01];

/// One meter read operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOp {
    /// Address-set command; must succeed before any reading is trusted
    AddressCheck,
    Voltage,
    Current,
    Power,
    RegisteredEnergy,
}

impl ReadOp {
    /// Command byte of the request frame
    pub fn command(&self) -> u8 {
        match self {
            ReadOp::AddressCheck => 0xB4,
            ReadOp::Voltage => 0xB0,
            ReadOp::Current => 0xB1,
            ReadOp::Power => 0xB2,
            ReadOp::RegisteredEnergy => 0xB3,
        }
    }

    /// Operation name used in timeout errors
    pub fn label(&self) -> &'static str {
        match self {
            ReadOp::AddressCheck => "setting meter address",
            ReadOp::Voltage => "reading voltage",
            ReadOp::Current => "reading current",
            ReadOp::Power => "reading power",
            ReadOp::RegisteredEnergy => "reading registered energy",
        }
    }
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// One validated 7-byte meter frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterFrame {
    bytes: [u8; FRAME_LEN],
}

impl MeterFrame {
    /// Build a request frame for `op` addressed to `address`
    pub fn request(op: ReadOp, address: [u8; 4]) -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = op.command();
        bytes[1..5].copy_from_slice(&address);
        bytes[5] = 0x00;
        bytes[6] = checksum(&bytes[..6]);
        Self { bytes }
    }

    /// Validate a received frame
    ///
    /// # Errors
    /// `Framing` if `data` is not exactly 7 bytes or the checksum does not
    /// match.
    pub fn parse(data: &[u8]) -> KioskResult<Self> {
        if data.len() != FRAME_LEN {
            return Err(KioskError::Framing(format!(
                "Meter frame has {} bytes, expected {}",
                data.len(),
                FRAME_LEN
            )));
        }
        let expected = checksum(&data[..FRAME_LEN - 1]);
        let got = data[FRAME_LEN - 1];
        if expected != got {
            return Err(KioskError::Framing(format!(
                "Wrong checksum: expected 0x{:02X}, got 0x{:02X}",
                expected, got
            )));
        }
        let mut bytes = [0u8; FRAME_LEN];
        bytes.copy_from_slice(data);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Voltage in volts: integer byte plus tenths byte
    pub fn decode_voltage(&self) -> f64 {
        self.bytes[2] as f64 + self.bytes[3] as f64 / 10.0
    }

    /// Current in amperes: integer byte plus hundredths byte
    pub fn decode_current(&self) -> f64 {
        self.bytes[2] as f64 + self.bytes[3] as f64 / 100.0
    }

    /// Active power as a big-endian 16-bit count
    pub fn decode_power(&self) -> u16 {
        u16::from_be_bytes([self.bytes[1], self.bytes[2]])
    }

    /// Registered energy as a big-endian 24-bit count
    pub fn decode_energy(&self) -> u32 {
        ((self.bytes[1] as u32) << 16) | ((self.bytes[2] as u32) << 8) | self.bytes[3] as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: append the valid checksum to six payload bytes
    fn framed(head: [u8; 6]) -> [u8; 7] {
        let mut bytes = [0u8; 7];
        bytes[..6].copy_from_slice(&head);
        bytes[6] = checksum(&head);
        bytes
    }

    #[test]
    fn test_request_frames_match_device_tables() {
        // Byte tables from the meter's datasheet
        let cases: [(ReadOp, [u8; 7]); 5] = [
            (ReadOp::AddressCheck, [0xB4, 0xC0, 0xA8, 0x01, 0x01, 0x00, 0x1E]),
            (ReadOp::Voltage, [0xB0, 0xC0, 0xA8, 0x01, 0x01, 0x00, 0x1A]),
            (ReadOp::Current, [0xB1, 0xC0, 0xA8, 0x01, 0x01, 0x00, 0x1B]),
            (ReadOp::Power, [0xB2, 0xC0, 0xA8, 0x01, 0x01, 0x00, 0x1C]),
            (ReadOp::RegisteredEnergy, [0xB3, 0xC0, 0xA8, 0x01, 0x01, 0x00, 0x1D]),
        ];
        for (op, expected) in cases {
            let frame = MeterFrame::request(op, DEFAULT_METER_ADDRESS);
            assert_eq!(frame.as_bytes(), &expected, "{:?}", op);
        }
    }

    #[test]
    fn test_parse_accepts_iff_checksum_matches() {
        let good = framed([0xA0, 0x00, 0xE6, 0x02, 0x00, 0x00]);
        assert!(MeterFrame::parse(&good).is_ok());

        for i in 0..7 {
            let mut bad = good;
            bad[i] = bad[i].wrapping_add(1);
            let err = MeterFrame::parse(&bad).unwrap_err();
            assert!(
                matches!(err, KioskError::Framing(_)),
                "byte {} corruption not caught",
                i
            );
        }
    }

    #[test]
    fn test_parse_rejects_short_frame() {
        let err = MeterFrame::parse(&[0xA0, 0x00, 0xE6]).unwrap_err();
        assert!(matches!(err, KioskError::Framing(_)));
    }

    #[test]
    fn test_checksum_wraps_mod_256() {
        let bytes = framed([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        // 6 * 0xFF = 0x5FA, mod 256 = 0xFA
        assert_eq!(bytes[6], 0xFA);
        assert!(MeterFrame::parse(&bytes).is_ok());
    }

    #[test]
    fn test_decode_formulas_at_boundary_values() {
        for value in [0u8, 1, 255] {
            let frame = MeterFrame::parse(&framed([0xA0, 0x00, value, value, 0x00, 0x00])).unwrap();
            assert_eq!(frame.decode_voltage(), value as f64 + value as f64 / 10.0);
            assert_eq!(frame.decode_current(), value as f64 + value as f64 / 100.0);

            let frame = MeterFrame::parse(&framed([0xA2, value, value, 0x00, 0x00, 0x00])).unwrap();
            assert_eq!(frame.decode_power(), (value as u16) << 8 | value as u16);

            let frame = MeterFrame::parse(&framed([0xA3, value, value, value, 0x00, 0x00])).unwrap();
            let v = value as u32;
            assert_eq!(frame.decode_energy(), v << 16 | v << 8 | v);
        }
    }
}
