//! Identity record sent to the billing backend
//!
//! One record is serialized per charge attempt and embedded in a single
//! mesh command line. The field names are the backend's wire vocabulary.

use crate::error::{KioskError, KioskResult};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity record for one charge authorization attempt
#[derive(Debug, Clone, Serialize)]
pub struct IdentityRecord {
    /// Purchase amount in currency units
    #[serde(rename = "Amount")]
    pub amount: u32,
    /// RFID tag identifier of the vehicle
    #[serde(rename = "VehicleidTag")]
    pub tag: String,
    /// Unix timestamp of the attempt, seconds
    #[serde(rename = "Time")]
    pub timestamp: u64,
    /// Station identifier of this kiosk
    #[serde(rename = "Chargerid")]
    pub charger_id: String,
}

impl IdentityRecord {
    /// Create a record stamped with the current time
    pub fn new(amount: u32, tag: impl Into<String>, charger_id: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            amount,
            tag: tag.into(),
            timestamp,
            charger_id: charger_id.into(),
        }
    }

    /// Serialize the record into the mesh write command
    ///
    /// The node CLI delimits the write argument with double quotes, so the
    /// payload must not contain any: quotes inside the serialized record
    /// are swapped for single quotes, which is the form the backend parses.
    pub fn command_line(&self) -> KioskResult<String> {
        let payload = serde_json::to_string(self)
            .map_err(|e| KioskError::ProtocolDecode(format!("identity record: {}", e)))?
            .replace('"', "'");
        Ok(format!("wisun socket_write 4 \"{}\"", payload))
    }
}
