//! Command/data signalling over an SPI bus.
//!
//! The ST7789 distinguishes command bytes from parameter/pixel bytes with a
//! separate data/command (DC) line: low selects command, high selects data.
//! An optional active-low chip-select brackets every top-level call so several
//! panels can sit on one clock/data pair.

use crate::{Error, Result, MAX_TRANSFER_CHUNK};
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::SpiBus;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Physical command/data signalling for one panel.
pub trait Transport {
    /// Sends a single command byte.
    fn send_command(&mut self, command: u8) -> Result<()>;

    /// Sends a parameter or pixel payload of any length.
    fn send_data(&mut self, data: &[u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_command(&mut self, command: u8) -> Result<()> {
        (**self).send_command(command)
    }

    fn send_data(&mut self, data: &[u8]) -> Result<()> {
        (**self).send_data(data)
    }
}

/// SPI transport with a DC line and an optional GPIO chip-select.
pub struct SpiTransport<SPI, DC, CS> {
    spi: SPI,
    dc: DC,
    cs: Option<CS>,
    max_chunk: usize,
}

impl<SPI, DC, CS> SpiTransport<SPI, DC, CS>
where
    SPI: SpiBus,
    DC: OutputPin,
    CS: OutputPin,
{
    /// Creates a transport. A GPIO chip-select, if given, is driven idle high.
    pub fn new(spi: SPI, dc: DC, cs: Option<CS>) -> Result<Self> {
        let mut transport = Self {
            spi,
            dc,
            cs,
            max_chunk: MAX_TRANSFER_CHUNK,
        };
        transport.release()?;
        Ok(transport)
    }

    /// Overrides the per-write ceiling (defaults to 4096 bytes).
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    /// Returns the per-write ceiling.
    pub fn max_chunk(&self) -> usize {
        self.max_chunk
    }

    /// Consumes the transport and returns its parts.
    pub fn release_parts(self) -> (SPI, DC, Option<CS>) {
        (self.spi, self.dc, self.cs)
    }

    fn select(&mut self) -> Result<()> {
        match self.cs.as_mut() {
            Some(cs) => cs.set_low().map_err(Error::pin),
            None => Ok(()),
        }
    }

    fn release(&mut self) -> Result<()> {
        match self.cs.as_mut() {
            Some(cs) => cs.set_high().map_err(Error::pin),
            None => Ok(()),
        }
    }

    /// Runs `body` with chip-select asserted, releasing it on every path.
    fn transaction<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut SPI) -> Result<()>,
    {
        self.select()?;
        let result = body(&mut self.spi)
            .and_then(|()| self.spi.flush().map_err(Error::bus));
        let released = self.release();
        result.and(released)
    }
}

impl<SPI, DC, CS> Transport for SpiTransport<SPI, DC, CS>
where
    SPI: SpiBus,
    DC: OutputPin,
    CS: OutputPin,
{
    fn send_command(&mut self, command: u8) -> Result<()> {
        self.dc.set_low().map_err(Error::pin)?;
        let result = self.transaction(|spi| spi.write(&[command]).map_err(Error::bus));
        // Idle with DC in data mode
        let idle = self.dc.set_high().map_err(Error::pin);
        result.and(idle)
    }

    fn send_data(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.dc.set_high().map_err(Error::pin)?;

        let max_chunk = self.max_chunk;
        self.transaction(|spi| {
            for chunk in data.chunks(max_chunk) {
                spi.write(chunk).map_err(Error::bus)?;
            }
            trace!(
                "Wrote {} bytes in {} chunks",
                data.len(),
                data.len().div_ceil(max_chunk)
            );
            Ok(())
        })
    }
}

/// An output line that may not be wired, e.g. a reset line owned by
/// another panel. Driving an absent line does nothing.
pub enum OptionalLine<P> {
    Wired(P),
    Absent,
}

impl<P: digital::ErrorType> digital::ErrorType for OptionalLine<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for OptionalLine<P> {
    fn set_low(&mut self) -> std::result::Result<(), Self::Error> {
        match self {
            OptionalLine::Wired(pin) => pin.set_low(),
            OptionalLine::Absent => Ok(()),
        }
    }

    fn set_high(&mut self) -> std::result::Result<(), Self::Error> {
        match self {
            OptionalLine::Wired(pin) => pin.set_high(),
            OptionalLine::Absent => Ok(()),
        }
    }
}

/// An output line shared by several transports or drivers.
///
/// Two-panel boards commonly share the DC and reset GPIOs between panels on
/// separate chip-selects. Each holder drives the same physical line; callers
/// must not use the holders concurrently.
pub struct SharedLine<P> {
    inner: Arc<Mutex<P>>,
}

impl<P> SharedLine<P> {
    pub fn new(pin: P) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pin)),
        }
    }
}

impl<P> Clone for SharedLine<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: digital::ErrorType> digital::ErrorType for SharedLine<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for SharedLine<P> {
    fn set_low(&mut self) -> std::result::Result<(), Self::Error> {
        // A poisoned lock only means another holder panicked mid-write;
        // the pin itself is still usable.
        let mut pin = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        pin.set_low()
    }

    fn set_high(&mut self) -> std::result::Result<(), Self::Error> {
        let mut pin = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        pin.set_high()
    }
}
