//! Framed serial power-meter driver
//!
//! The kiosk's power meter speaks a fixed 7-byte request/response protocol
//! over a dedicated serial link. Every frame closes with a mod-256 checksum
//! of the preceding bytes; a frame that fails the checksum is rejected,
//! never silently accepted.

pub mod driver;
pub mod frame;

pub use driver::{MeterConfig, MeterReading, PowerMeter};
pub use frame::{DEFAULT_METER_ADDRESS, FRAME_LEN, MeterFrame, ReadOp};
