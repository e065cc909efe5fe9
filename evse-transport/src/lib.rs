//! Transport layer for the EVSE kiosk
//!
//! This crate provides the byte-stream abstraction shared by the relay,
//! meter driver, and protocol layers, with serial and TCP implementations.

pub mod serial;
pub mod stream;
pub mod tcp;

pub use serial::{SerialLink, SerialSettings, open_stream};
pub use stream::{ByteStream, Link};
pub use tcp::{TcpLink, TcpSettings};
