//! Serial-to-TCP byte-stream relay
//!
//! Each physical serial device (mesh-radio node, bike-scan microcontroller)
//! is exposed to the rest of the kiosk as a long-lived TCP channel. One
//! relay owns one serial channel for its lifetime and serves one session at
//! a time.

pub mod relay;

pub use relay::{
    PROBE_COMMAND, PROBE_REPLY, RelayConfig, SerialRelay, forward_lines, probe, probe_device,
};
