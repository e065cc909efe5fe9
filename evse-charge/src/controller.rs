//! Charge control state machine
//!
//! One controller instance drives one output relay. A session moves through
//! AwaitingAuthorization, MeterWarmup and Delivering; whatever happens after
//! the meter stream is handed over, the relay ends up LOW and the stream is
//! closed before the outcome is returned.

use crate::pin::ChargePin;
use evse_core::{ChargeOutcome, KioskError, KioskResult, ValidationOutcome};
use evse_meter::{MeterConfig, PowerMeter};
use evse_transport::ByteStream;
use std::time::Duration;
use tokio::time::Instant;

/// Billing tariff: how much energy one currency unit buys
#[derive(Debug, Clone)]
pub struct Tariff {
    /// Currency units per purchase unit
    pub cost_per_unit: f64,
    /// Energy counts delivered per purchase unit
    pub energy_per_unit: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            cost_per_unit: 10.0,
            energy_per_unit: 360.0,
        }
    }
}

impl Tariff {
    /// Energy quota purchased by `amount` currency units
    pub fn quota(&self, amount: u32) -> f64 {
        f64::from(amount) / self.cost_per_unit * self.energy_per_unit
    }
}

/// Charge controller configuration
#[derive(Debug, Clone)]
pub struct ChargeConfig {
    pub tariff: Tariff,
    pub meter: MeterConfig,
    /// How long to wait for the meter to report nonzero power after the
    /// vehicle is told to draw
    pub warmup_deadline: Duration,
    /// Pause between power polls during warmup
    pub warmup_poll: Duration,
    /// Pause between power re-reads while delivering
    pub delivery_poll: Duration,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            tariff: Tariff::default(),
            meter: MeterConfig::default(),
            warmup_deadline: Duration::from_secs(30),
            warmup_poll: Duration::from_millis(500),
            delivery_poll: Duration::from_millis(500),
        }
    }
}

/// Observable phase of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Idle,
    AwaitingAuthorization,
    MeterWarmup,
    Delivering,
    Completed,
    Failed,
}

/// Drives one relay pin through a charge session
#[derive(Debug)]
pub struct ChargeController<P: ChargePin> {
    pin: P,
    config: ChargeConfig,
    state: ChargeState,
    delivered: f64,
}

impl<P: ChargePin> ChargeController<P> {
    pub fn new(pin: P, config: ChargeConfig) -> Self {
        Self {
            pin,
            config,
            state: ChargeState::Idle,
            delivered: 0.0,
        }
    }

    pub fn state(&self) -> ChargeState {
        self.state
    }

    pub fn config(&self) -> &ChargeConfig {
        &self.config
    }

    /// Energy counts delivered during the most recent session
    pub fn delivered(&self) -> f64 {
        self.delivered
    }

    /// Run one charge session over the session's meter channel
    ///
    /// `auth` is the backend's verdict for this purchase; anything other
    /// than `Authorized` fails the session before the relay is touched.
    /// The meter channel arrives as the result of the caller's open
    /// attempt; an open failure fails the session with `MeterFault`, like
    /// a meter that will not answer.
    pub async fn charge<S: ByteStream>(
        &mut self,
        meter_stream: KioskResult<S>,
        amount: u32,
        auth: ValidationOutcome,
    ) -> ChargeOutcome {
        self.state = ChargeState::AwaitingAuthorization;
        self.delivered = 0.0;
        match auth {
            ValidationOutcome::Authorized => {}
            ValidationOutcome::Rejected => return self.fail(ChargeOutcome::Rejected),
            ValidationOutcome::InsufficientBalance => {
                return self.fail(ChargeOutcome::InsufficientBalance);
            }
            ValidationOutcome::BackendUnavailable => {
                return self.fail(ChargeOutcome::BackendUnavailable);
            }
            ValidationOutcome::Timeout => return self.fail(ChargeOutcome::AuthorizationTimeout),
            ValidationOutcome::Unrecognized(line) => {
                log::error!("Backend verdict not understood: {}", line);
                return self.fail(ChargeOutcome::InternalError);
            }
        }

        let quota = self.config.tariff.quota(amount);
        log::info!("Authorized: amount {} buys {} energy counts", amount, quota);

        self.state = ChargeState::MeterWarmup;
        let meter_stream = match meter_stream {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("Meter channel could not be opened: {}", e);
                self.state = ChargeState::Failed;
                return ChargeOutcome::MeterFault;
            }
        };

        let mut meter = PowerMeter::with_config(meter_stream, self.config.meter.clone());
        let outcome = self.run_metered(&mut meter, quota).await;

        // Release happens here no matter how run_metered returned.
        if let Err(e) = self.pin.set_low() {
            log::error!("Failed to release output pin: {}", e);
        }
        if let Err(e) = meter.close().await {
            log::warn!("Failed to close meter stream: {}", e);
        }

        if outcome.is_success() {
            self.state = ChargeState::Completed;
        } else {
            self.state = ChargeState::Failed;
        }
        outcome
    }

    /// Warmup and delivery phases; never touches the stream after returning
    async fn run_metered<S: ByteStream>(
        &mut self,
        meter: &mut PowerMeter<S>,
        quota: f64,
    ) -> ChargeOutcome {
        if let Err(e) = meter.probe().await {
            log::error!("Meter probe failed: {}", e);
            return ChargeOutcome::MeterFault;
        }

        if let Err(e) = self.pin.set_high() {
            log::error!("Failed to assert output pin: {}", e);
            return ChargeOutcome::InternalError;
        }

        let power = match self.await_power(meter).await {
            Ok(power) => power,
            Err(outcome) => return outcome,
        };

        self.state = ChargeState::Delivering;
        log::info!("Delivering: initial power {} counts", power);
        self.deliver(meter, quota, power).await
    }

    /// Poll until the meter reports nonzero power, bounded by the warmup
    /// deadline
    async fn await_power<S: ByteStream>(
        &mut self,
        meter: &mut PowerMeter<S>,
    ) -> Result<u16, ChargeOutcome> {
        let deadline = Instant::now() + self.config.warmup_deadline;
        loop {
            match meter.read_power().await {
                Ok(power) if power > 0 => return Ok(power),
                Ok(_) => {}
                Err(e) => {
                    log::error!("Meter fault during warmup: {}", e);
                    return Err(ChargeOutcome::MeterFault);
                }
            }
            if Instant::now() >= deadline {
                log::error!(
                    "Vehicle drew no power within {:?}",
                    self.config.warmup_deadline
                );
                return Err(ChargeOutcome::MeterFault);
            }
            tokio::time::sleep(self.config.warmup_poll).await;
        }
    }

    /// Integrate power over time until the quota is reached
    ///
    /// Power is re-read from the meter on every iteration, so a vehicle that
    /// throttles its draw simply charges for longer.
    async fn deliver<S: ByteStream>(
        &mut self,
        meter: &mut PowerMeter<S>,
        quota: f64,
        initial_power: u16,
    ) -> ChargeOutcome {
        let started = Instant::now();
        let mut power = initial_power;
        let mut last_sample = started;

        loop {
            if self.delivered >= quota {
                log::info!(
                    "Quota reached: {:.1} of {:.1} counts in {:?}",
                    self.delivered,
                    quota,
                    started.elapsed()
                );
                return ChargeOutcome::Completed;
            }

            tokio::time::sleep(self.config.delivery_poll).await;

            let now = Instant::now();
            self.delivered += f64::from(power) * (now - last_sample).as_secs_f64();
            last_sample = now;

            power = match meter.read_power().await {
                Ok(power) => power,
                Err(e @ (KioskError::DeviceTimeout(_) | KioskError::Framing(_))) => {
                    log::error!("Meter fault while delivering: {}", e);
                    return ChargeOutcome::MeterFault;
                }
                Err(e) => {
                    log::error!("Delivery aborted: {}", e);
                    return ChargeOutcome::InternalError;
                }
            };
        }
    }

    fn fail(&mut self, outcome: ChargeOutcome) -> ChargeOutcome {
        log::warn!("Charge refused: {}", outcome);
        self.state = ChargeState::Failed;
        outcome
    }
}
