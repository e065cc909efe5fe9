//! Charge control for the EVSE kiosk
//!
//! Ties the power meter to the physical output relay: once a purchase is
//! authorized, the controller warms the meter up, asserts the relay, and
//! delivers energy until the purchased quota is reached. The relay pin and
//! the meter connection are released on every exit path, without exception.

pub mod controller;
pub mod notify;
pub mod pin;
pub mod session;

pub use controller::{ChargeConfig, ChargeController, ChargeState, Tariff};
pub use notify::{KioskNotifier, LogNotifier};
pub use pin::{ChargePin, SysfsPin};
pub use session::{ChargeSession, SessionConfig, run_charge_session, run_scan};
