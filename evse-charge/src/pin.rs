//! Output relay pin

use evse_core::{KioskError, KioskResult};
use std::io::Write;
use std::path::PathBuf;

/// Digital output driving the charging contactor
///
/// The controller asserts the pin for the duration of energy delivery and
/// deasserts it on every exit path.
#[cfg_attr(test, mockall::automock)]
pub trait ChargePin: Send {
    fn set_high(&mut self) -> KioskResult<()>;
    fn set_low(&mut self) -> KioskResult<()>;
}

/// GPIO pin exposed through the sysfs interface
#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    value_path: PathBuf,
}

impl SysfsPin {
    /// Export the pin and configure it as a low output
    pub fn open(number: u32) -> KioskResult<Self> {
        let base = PathBuf::from("/sys/class/gpio");
        let pin_dir = base.join(format!("gpio{}", number));

        if !pin_dir.exists() {
            std::fs::write(base.join("export"), number.to_string())?;
        }
        std::fs::write(pin_dir.join("direction"), "out")?;

        let mut pin = Self {
            number,
            value_path: pin_dir.join("value"),
        };
        pin.set_low()?;
        Ok(pin)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    fn write_value(&mut self, value: &str) -> KioskResult<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.value_path)
            .map_err(|e| {
                KioskError::ResourceUnavailable(format!("gpio{}: {}", self.number, e))
            })?;
        file.write_all(value.as_bytes())?;
        Ok(())
    }
}

impl ChargePin for SysfsPin {
    fn set_high(&mut self) -> KioskResult<()> {
        self.write_value("1")
    }

    fn set_low(&mut self) -> KioskResult<()> {
        self.write_value("0")
    }
}
