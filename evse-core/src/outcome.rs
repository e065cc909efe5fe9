//! Session outcome vocabulary
//!
//! `ValidationOutcome` is produced by the RFID validation protocol and
//! consumed by the charge controller. `ChargeOutcome` is the terminal result
//! of one charge session, surfaced to the UI layer with a stable numeric
//! code and a human-readable cause.

/// Result of validating an RFID tag against the billing backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Backend accepted the tag and reserved the purchase amount
    Authorized,
    /// Tag is not registered with the backend
    Rejected,
    /// Tag is registered but the account balance does not cover the amount
    InsufficientBalance,
    /// Backend (or its gateway) is not responding
    BackendUnavailable,
    /// No qualifying reply arrived within the validation window
    Timeout,
    /// A reply carried the validation marker but none of the known sub-markers
    Unrecognized(String),
}

/// Terminal outcome of a charge session
///
/// Numeric codes are part of the external contract:
/// 1 = completed, 2 = meter fault, 3 = insufficient balance,
/// 4 = rejected (including authorization timeout), 5 = other error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Completed,
    MeterFault,
    InsufficientBalance,
    Rejected,
    AuthorizationTimeout,
    BackendUnavailable,
    InternalError,
}

impl ChargeOutcome {
    /// Numeric outcome code reported to the caller
    pub fn code(&self) -> u8 {
        match self {
            ChargeOutcome::Completed => 1,
            ChargeOutcome::MeterFault => 2,
            ChargeOutcome::InsufficientBalance => 3,
            ChargeOutcome::Rejected | ChargeOutcome::AuthorizationTimeout => 4,
            ChargeOutcome::BackendUnavailable | ChargeOutcome::InternalError => 5,
        }
    }

    /// Human-readable cause, distinct from the numeric code
    pub fn message(&self) -> &'static str {
        match self {
            ChargeOutcome::Completed => "Charging completed successfully",
            ChargeOutcome::MeterFault => "Power meter not responding",
            ChargeOutcome::InsufficientBalance => "Insufficient balance, kindly recharge",
            ChargeOutcome::Rejected => "Vehicle tag is not registered",
            ChargeOutcome::AuthorizationTimeout => "Backend validation timed out",
            ChargeOutcome::BackendUnavailable => "Billing backend is not responding",
            ChargeOutcome::InternalError => "Charging failed with an internal error",
        }
    }

    /// Whether this outcome ends the session in the Completed state
    pub fn is_success(&self) -> bool {
        matches!(self, ChargeOutcome::Completed)
    }
}

impl std::fmt::Display for ChargeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}
