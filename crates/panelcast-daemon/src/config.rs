//! Configuration management.

use anyhow::{bail, Context, Result};
use panelcast_hw::codec::parse_hex_color;
use panelcast_hw::linux::{BusConfig, PanelWiring};
use panelcast_hw::{PanelProfile, ResetTiming};
use panelcast_playback::{LoopCount, PlaybackOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Loop count, negative for endless playback
    #[serde(default = "default_loops")]
    pub loops: i64,

    /// Frames slower than this many intervals resync to the wall clock
    #[serde(default = "default_skip_threshold")]
    pub skip_threshold: f64,

    /// Gap between panels sharing the bus, in milliseconds
    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    /// Colour shown at startup, e.g. "#000000"
    #[serde(default = "default_clear_color")]
    pub clear_color: String,

    /// Fill panels with `clear_color` on shutdown
    #[serde(default)]
    pub clear_on_exit: bool,

    /// Pick frames by elapsed time rather than by index
    #[serde(default = "default_time_based")]
    pub time_based: bool,

    /// Shared SPI/GPIO wiring
    #[serde(default)]
    pub bus: BusSection,

    /// Panels in draw order
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
}

/// Bus-wide wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSection {
    /// SPI clock in Hz
    #[serde(default = "default_clock")]
    pub clock_hz: u32,

    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: String,

    /// Data/command line, shared by all panels
    #[serde(default = "default_dc_pin")]
    pub dc_pin: u32,

    /// Reset line, shared by all panels
    #[serde(default = "default_reset_pin")]
    pub reset_pin: u32,

    /// Settle time per reset edge in milliseconds
    #[serde(default = "default_reset_settle")]
    pub reset_settle_ms: u64,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            clock_hz: default_clock(),
            gpio_chip: default_gpio_chip(),
            dc_pin: default_dc_pin(),
            reset_pin: default_reset_pin(),
            reset_settle_ms: default_reset_settle(),
        }
    }
}

/// One panel on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub name: String,

    /// "2.4in", "1.47in" or "1.3in"
    pub kind: String,

    /// "portrait" or "landscape"
    #[serde(default = "default_orientation")]
    pub orientation: String,

    /// spidev node, e.g. "/dev/spidev0.0"
    pub spi: String,

    /// GPIO chip-select line, if CS is not kernel-managed
    #[serde(default)]
    pub cs_pin: Option<u32>,

    #[serde(default)]
    pub backlight_pin: Option<u32>,

    /// Directory of frame images, or "pattern" for test bars
    #[serde(default = "default_source")]
    pub source: String,

    /// Rate the frames were rendered at; defaults to the playback rate
    #[serde(default)]
    pub source_fps: Option<u32>,
}

// Default value functions
fn default_fps() -> u32 {
    30
}

fn default_loops() -> i64 {
    -1
}

fn default_skip_threshold() -> f64 {
    2.0
}

fn default_settle() -> u64 {
    2
}

fn default_clear_color() -> String {
    "#000000".to_string()
}

fn default_time_based() -> bool {
    true
}

fn default_clock() -> u32 {
    24_000_000
}

fn default_gpio_chip() -> String {
    "/dev/gpiochip0".to_string()
}

fn default_dc_pin() -> u32 {
    25
}

fn default_reset_pin() -> u32 {
    27
}

fn default_reset_settle() -> u64 {
    10
}

fn default_orientation() -> String {
    "portrait".to_string()
}

fn default_source() -> String {
    "pattern".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Checks everything that can be checked without touching hardware.
    pub fn validate(&self) -> Result<()> {
        if self.panels.is_empty() {
            bail!("No panels configured");
        }
        self.clear_color()?;
        self.playback_options()
            .interval()
            .context("Invalid playback rate")?;
        for panel in &self.panels {
            panel
                .profile()
                .with_context(|| format!("Panel {}", panel.name))?;
        }
        Ok(())
    }

    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            fps: self.fps,
            loops: LoopCount::from_signed(self.loops),
            skip_threshold: self.skip_threshold,
            time_based: self.time_based,
        }
    }

    /// Startup and shutdown fill colour as RGB565.
    pub fn clear_color(&self) -> Result<u16> {
        parse_hex_color(&self.clear_color)
            .with_context(|| format!("Invalid clear_color: {}", self.clear_color))
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            loops: default_loops(),
            skip_threshold: default_skip_threshold(),
            settle_ms: default_settle(),
            clear_color: default_clear_color(),
            clear_on_exit: false,
            time_based: default_time_based(),
            bus: BusSection::default(),
            panels: Vec::new(),
        }
    }
}

impl BusSection {
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            gpio_chip: PathBuf::from(&self.gpio_chip),
            clock_hz: self.clock_hz,
            dc_pin: self.dc_pin,
            reset_pin: self.reset_pin,
            reset: ResetTiming {
                settle: Duration::from_millis(self.reset_settle_ms),
            },
        }
    }
}

impl PanelConfig {
    pub fn profile(&self) -> Result<PanelProfile> {
        Ok(PanelProfile::lookup(&self.kind, &self.orientation)?)
    }

    /// Wiring for this panel; only one panel per bus pulses the shared reset.
    pub fn wiring(&self, owns_reset: bool) -> PanelWiring {
        PanelWiring {
            spi: PathBuf::from(&self.spi),
            cs_pin: self.cs_pin,
            backlight_pin: self.backlight_pin,
            owns_reset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelcast_hw::{Orientation, PanelKind};

    const TWO_PANELS: &str = r##"
fps = 24
loops = 3
clear_color = "#FF0000"

[bus]
clock_hz = 40000000
reset_settle_ms = 20

[[panels]]
name = "left"
kind = "1.47in"
spi = "/dev/spidev0.0"
source = "frames/left"
source_fps = 12

[[panels]]
name = "right"
kind = "2.4in"
orientation = "landscape"
spi = "/dev/spidev0.1"
cs_pin = 8
"##;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.fps, 30);
        assert_eq!(config.loops, -1);
        assert_eq!(config.settle(), Duration::from_millis(2));
        assert!(!config.clear_on_exit);
        assert_eq!(config.bus.dc_pin, 25);
        assert_eq!(config.bus.reset_pin, 27);
        assert_eq!(config.bus.clock_hz, 24_000_000);
        assert_eq!(config.playback_options(), PlaybackOptions::default());
        // No panels is a configuration error
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_two_panels() {
        let config = Config::parse(TWO_PANELS).unwrap();
        config.validate().unwrap();

        assert_eq!(config.playback_options().loops, LoopCount::Finite(3));
        assert_eq!(config.clear_color().unwrap(), 0xF800);
        assert_eq!(
            config.bus.bus_config().reset.settle,
            Duration::from_millis(20)
        );

        let left = &config.panels[0];
        let profile = left.profile().unwrap();
        assert_eq!(profile.kind, PanelKind::Lcd1in47);
        assert_eq!(profile.orientation, Orientation::Portrait);
        assert_eq!(left.source_fps, Some(12));
        assert!(left.wiring(true).owns_reset);

        let right = &config.panels[1];
        assert_eq!(right.source, "pattern");
        let wiring = right.wiring(false);
        assert_eq!(wiring.cs_pin, Some(8));
        assert!(!wiring.owns_reset);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::parse(TWO_PANELS).unwrap();
        config.panels[1].kind = "3.5in".into();
        assert!(config.validate().is_err());

        let mut config = Config::parse(TWO_PANELS).unwrap();
        config.clear_color = "red".into();
        assert!(config.validate().is_err());

        let mut config = Config::parse(TWO_PANELS).unwrap();
        config.fps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shipped_config() {
        let config = Config::parse(include_str!("../../../config/default.toml")).unwrap();
        config.validate().unwrap();
    }
}
