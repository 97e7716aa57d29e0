//! Backlight control.

use crate::{Error, Result};
use embedded_hal::digital::OutputPin;
use tracing::debug;

/// Backlight brightness control handed to a panel driver.
pub trait Backlight {
    /// Sets brightness in percent (0-100).
    fn set_brightness(&mut self, percent: u8) -> Result<()>;
}

/// On/off backlight on a plain GPIO line. Any non-zero level switches it on.
pub struct GpioBacklight<P> {
    pin: P,
}

impl<P: OutputPin> GpioBacklight<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> Backlight for GpioBacklight<P> {
    fn set_brightness(&mut self, percent: u8) -> Result<()> {
        debug!("Backlight {}%", percent.min(100));
        if percent == 0 {
            self.pin.set_low().map_err(Error::pin)
        } else {
            self.pin.set_high().map_err(Error::pin)
        }
    }
}
