//! Session orchestration
//!
//! Glues the protocol layers to the charge controller: scan for bikes,
//! validate the rider's tag, run the charge, report the result. The UI layer
//! only sees notifier callbacks and the final `ChargeSession` record.

use crate::controller::ChargeController;
use crate::notify::KioskNotifier;
use crate::pin::ChargePin;
use evse_core::{ChargeOutcome, IdentityRecord, KioskResult, ValidationOutcome};
use evse_dispatch::{CommandWriter, LineQueue};
use evse_protocol::discovery::{self, DiscoveryConfig};
use evse_protocol::validation::{self, ValidationConfig};
use evse_transport::ByteStream;
use tokio::io::AsyncWrite;
use tokio::time::Instant;

/// Per-station session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Station identifier sent with every validation request
    pub charger_id: String,
    pub discovery: DiscoveryConfig,
    pub validation: ValidationConfig,
}

impl SessionConfig {
    pub fn new(charger_id: impl Into<String>) -> Self {
        Self {
            charger_id: charger_id.into(),
            discovery: DiscoveryConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Record of one finished charge session
#[derive(Debug, Clone)]
pub struct ChargeSession {
    pub tag: String,
    pub amount: u32,
    /// Energy counts the amount bought
    pub quota: f64,
    /// Energy counts actually delivered
    pub delivered: f64,
    pub outcome: ChargeOutcome,
    pub elapsed: std::time::Duration,
}

/// Run one bike scan and report the result through the notifier
///
/// Returns the discovered names so the caller can offer a selection; `None`
/// means the scan failed and the notifier has already been told.
pub async fn run_scan<W: AsyncWrite + Unpin + Send, N: KioskNotifier>(
    commands: &mut CommandWriter<W>,
    bike_queue: &mut LineQueue,
    notifier: &N,
    config: &SessionConfig,
) -> Option<Vec<String>> {
    match discovery::scan(commands, bike_queue, &config.discovery).await {
        Ok(bikes) if bikes.is_empty() => {
            notifier.scan_failed("no bikes in range");
            None
        }
        Ok(bikes) => {
            notifier.bikes_discovered(&bikes);
            Some(bikes)
        }
        Err(e) => {
            log::warn!("Bike scan failed: {}", e);
            notifier.scan_failed(&e.to_string());
            None
        }
    }
}

/// Validate the tag, run the charge, notify, and return the session record
///
/// `meter_stream` is the caller's open attempt for the session's meter
/// channel; the controller maps an open failure to `MeterFault`. A
/// validation transport failure is treated as the backend being
/// unreachable; the controller turns that into the right outcome without
/// ever touching the relay.
pub async fn run_charge_session<W, S, P, N>(
    mesh_commands: &mut CommandWriter<W>,
    mesh_queue: &mut LineQueue,
    meter_stream: KioskResult<S>,
    controller: &mut ChargeController<P>,
    notifier: &N,
    tag: &str,
    amount: u32,
    config: &SessionConfig,
) -> ChargeSession
where
    W: AsyncWrite + Unpin + Send,
    S: ByteStream,
    P: ChargePin,
    N: KioskNotifier,
{
    let started = Instant::now();
    let record = IdentityRecord::new(amount, tag, &config.charger_id);

    let verdict =
        match validation::validate(mesh_commands, mesh_queue, &record, &config.validation).await {
            Ok(verdict) => verdict,
            Err(e) => {
                log::error!("Validation transport failed: {}", e);
                ValidationOutcome::BackendUnavailable
            }
        };

    let outcome = controller.charge(meter_stream, amount, verdict).await;
    notifier.charge_finished(&outcome);

    ChargeSession {
        tag: tag.to_string(),
        amount,
        quota: controller.config().tariff.quota(amount),
        delivered: controller.delivered(),
        outcome,
        elapsed: started.elapsed(),
    }
}
