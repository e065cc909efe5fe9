//! evse - control core of an e-bike charging kiosk
//!
//! Glue between three serial-attached microcontrollers, a billing backend
//! reachable over a mesh radio, and one charging relay per outlet.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `evse-core`: Error type, outcome vocabulary, identity records
//! - `evse-transport`: Byte stream abstraction over serial and TCP links
//! - `evse-relay`: Serial-to-TCP line relays with liveness probing
//! - `evse-dispatch`: Line classification and FIFO dispatch queues
//! - `evse-meter`: Framed 7-byte power-meter driver
//! - `evse-protocol`: Discovery, validation, mesh bring-up, emergencies
//! - `evse-charge`: Charge control state machine and session orchestration
//!
//! # Usage
//!
//! A kiosk binary wires the pieces together roughly like this:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use evse::charge::{ChargeConfig, ChargeController, LogNotifier, SysfsPin};
//! use evse::charge::{SessionConfig, run_charge_session};
//! use evse::dispatch::{Classifier, CommandWriter, line_queue, spawn_reader};
//! use evse::transport::TcpLink;
//!
//! # async fn kiosk() -> anyhow::Result<()> {
//! // Mesh channel: one TCP connection to the mesh relay
//! let stream = tokio::net::TcpStream::connect("127.0.0.1:9002").await?;
//! let (reader, writer) = stream.into_split();
//!
//! let (mesh_tx, mut mesh_queue) = line_queue();
//! spawn_reader(reader, Classifier::mesh_channel(mesh_tx));
//! let mut mesh_commands = CommandWriter::new(writer);
//!
//! // Meter channel: a second connection; the open attempt goes to the
//! // controller as-is, so a failure surfaces as a meter fault
//! let meter = tokio::net::TcpStream::connect("127.0.0.1:9003")
//!     .await
//!     .map(|s| TcpLink::from_connected_stream(s, Some(Duration::from_secs(30))))
//!     .map_err(evse::KioskError::Connection);
//!
//! let pin = SysfsPin::open(18)?;
//! let mut controller = ChargeController::new(pin, ChargeConfig::default());
//! let config = SessionConfig::new("EV-L001-03");
//!
//! let session = run_charge_session(
//!     &mut mesh_commands,
//!     &mut mesh_queue,
//!     meter,
//!     &mut controller,
//!     &LogNotifier,
//!     "12345678",
//!     100,
//!     &config,
//! )
//! .await;
//! println!("{}", session.outcome);
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use evse_core::{
    ChargeOutcome, IdentityRecord, KioskError, KioskResult, ValidationOutcome,
};

// Re-export transport layer
pub mod transport {
    pub use evse_transport::*;
}

// Re-export relay servers
pub mod relay {
    pub use evse_relay::*;
}

// Re-export dispatch queues
pub mod dispatch {
    pub use evse_dispatch::*;
}

// Re-export meter driver
pub mod meter {
    pub use evse_meter::*;
}

// Re-export line protocols
pub mod protocol {
    pub use evse_protocol::*;
}

// Re-export charge control
pub mod charge {
    pub use evse_charge::*;
}
