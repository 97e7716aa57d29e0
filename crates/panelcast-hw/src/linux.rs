//! spidev + gpio-cdev backend for Linux hosts.
//!
//! Panels hang off `/dev/spidevB.C` nodes. The data/command and reset GPIOs
//! are requested once from a gpiochip and shared between every panel opened
//! through the same `LinuxBus`.

use crate::backlight::GpioBacklight;
use crate::panel::{PanelDriver, ResetTiming};
use crate::profile::PanelProfile;
use crate::transport::{OptionalLine, SharedLine, SpiTransport};
use crate::{Error, Result};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevBus};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Transport type produced by the Linux backend.
pub type LinuxTransport = SpiTransport<SpidevBus, SharedLine<CdevPin>, CdevPin>;

/// Driver type produced by the Linux backend.
pub type LinuxDriver = PanelDriver<LinuxTransport, OptionalLine<SharedLine<CdevPin>>, Delay>;

/// Bus-wide wiring shared by all panels.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub gpio_chip: PathBuf,
    /// SPI clock in Hz. Always mode 0.
    pub clock_hz: u32,
    pub dc_pin: u32,
    pub reset_pin: u32,
    pub reset: ResetTiming,
}

/// Per-panel wiring.
#[derive(Debug, Clone)]
pub struct PanelWiring {
    /// spidev node, e.g. `/dev/spidev0.1`.
    pub spi: PathBuf,
    /// GPIO chip-select, for panels not on a kernel-managed CS.
    pub cs_pin: Option<u32>,
    pub backlight_pin: Option<u32>,
    /// Whether this panel pulses the shared reset line during init.
    pub owns_reset: bool,
}

/// GPIO chip plus the lines shared across panels.
pub struct LinuxBus {
    chip: Chip,
    config: BusConfig,
    dc: SharedLine<CdevPin>,
    reset: SharedLine<CdevPin>,
}

impl LinuxBus {
    /// Opens the GPIO chip and requests the data/command and reset lines.
    pub fn open(config: BusConfig) -> Result<Self> {
        let mut chip = Chip::new(&config.gpio_chip)
            .map_err(|e| Error::Pin(format!("{}: {}", config.gpio_chip.display(), e)))?;

        let dc = request_output(&mut chip, config.dc_pin, "panelcast-dc", 1)?;
        let reset = request_output(&mut chip, config.reset_pin, "panelcast-rst", 1)?;

        info!(
            "GPIO chip {} opened (DC={}, RST={})",
            config.gpio_chip.display(),
            config.dc_pin,
            config.reset_pin
        );

        Ok(Self {
            chip,
            config,
            dc: SharedLine::new(dc),
            reset: SharedLine::new(reset),
        })
    }

    /// Opens one panel on this bus and runs its reset/init sequence.
    pub fn open_panel(
        &mut self,
        profile: PanelProfile,
        wiring: &PanelWiring,
    ) -> Result<LinuxDriver> {
        let spi = open_spidev(&wiring.spi, self.config.clock_hz)?;

        let cs = match wiring.cs_pin {
            Some(line) => Some(request_output(&mut self.chip, line, "panelcast-cs", 1)?),
            None => None,
        };
        let transport = SpiTransport::new(spi, self.dc.clone(), cs)?
            .with_max_chunk(profile.max_chunk);

        let reset = if wiring.owns_reset {
            OptionalLine::Wired(self.reset.clone())
        } else {
            OptionalLine::Absent
        };

        let mut driver = PanelDriver::new(profile, transport, reset, Delay, self.config.reset)?;

        if let Some(line) = wiring.backlight_pin {
            let pin = request_output(&mut self.chip, line, "panelcast-bl", 0)?;
            driver = driver.with_backlight(GpioBacklight::new(pin));
            driver.set_backlight(100)?;
        }

        Ok(driver)
    }
}

fn request_output(chip: &mut Chip, line: u32, consumer: &str, initial: u8) -> Result<CdevPin> {
    let handle = chip
        .get_line(line)
        .and_then(|l| l.request(LineRequestFlags::OUTPUT, initial, consumer))
        .map_err(|e| Error::Pin(format!("line {}: {}", line, e)))?;
    let pin = CdevPin::new(handle).map_err(|e| Error::Pin(format!("line {}: {:?}", line, e)))?;
    debug!("Requested GPIO line {} as {}", line, consumer);
    Ok(pin)
}

fn open_spidev(path: &Path, clock_hz: u32) -> Result<SpidevBus> {
    let mut spi = SpidevBus::open(path)
        .map_err(|e| Error::Bus(format!("{}: {:?}", path.display(), e)))?;

    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(clock_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options)
        .map_err(|e| Error::Bus(format!("{}: {:?}", path.display(), e)))?;

    info!("SPI device {} opened at {} Hz", path.display(), clock_hz);
    Ok(spi)
}
