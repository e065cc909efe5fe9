//! Core types and utilities for the EVSE kiosk
//!
//! This crate provides fundamental types, error handling, and the session
//! outcome vocabulary used throughout the kiosk implementation.

pub mod error;
pub mod identity;
pub mod outcome;

pub use error::{KioskError, KioskResult};
pub use identity::IdentityRecord;
pub use outcome::{ChargeOutcome, ValidationOutcome};
