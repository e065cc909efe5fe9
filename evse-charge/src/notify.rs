//! Kiosk UI notification hooks
//!
//! The control core never talks to a display directly; it reports final
//! results through this trait and the embedding UI decides how to render
//! them.

use evse_core::ChargeOutcome;

/// Callbacks surfaced to the kiosk's presentation layer
#[cfg_attr(test, mockall::automock)]
pub trait KioskNotifier: Send + Sync {
    /// A bike scan finished with at least one connectable bike
    fn bikes_discovered(&self, bikes: &[String]);

    /// A bike scan found nothing or timed out
    fn scan_failed(&self, reason: &str);

    /// A charge session reached a terminal state
    fn charge_finished(&self, outcome: &ChargeOutcome);
}

/// Notifier that only writes to the log, for headless deployments
#[derive(Debug, Default)]
pub struct LogNotifier;

impl KioskNotifier for LogNotifier {
    fn bikes_discovered(&self, bikes: &[String]) {
        log::info!("Bikes available to connect: {}", bikes.join(", "));
    }

    fn scan_failed(&self, reason: &str) {
        log::warn!("Bike scan failed: {}", reason);
    }

    fn charge_finished(&self, outcome: &ChargeOutcome) {
        if outcome.is_success() {
            log::info!("Charge finished: {}", outcome);
        } else {
            log::warn!("Charge finished: {}", outcome);
        }
    }
}
