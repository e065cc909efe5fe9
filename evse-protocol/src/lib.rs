//! Line protocols of the EVSE kiosk
//!
//! Short conversations layered on top of the dispatch queues: enumerating
//! nearby bikes over the scan channel, validating an RFID tag against the
//! billing backend over the mesh channel, bringing the mesh network up, and
//! forwarding emergency announcements.

pub mod discovery;
pub mod emergency;
pub mod mesh;
pub mod validation;

pub use discovery::{DiscoveryConfig, Peripheral, connect, disconnect, scan};
pub use emergency::{EmergencyConfig, forward_emergencies};
pub use mesh::{MeshConfig, join_network};
pub use validation::{ValidationConfig, classify_reply, validate};
