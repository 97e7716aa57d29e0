//! ST7789 panel driver.

use crate::backlight::Backlight;
use crate::codec::PackedFrame;
use crate::profile::PanelProfile;
use crate::transport::Transport;
use crate::{Error, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use std::time::Duration;
use tracing::{debug, info};

use super::protocol::{encode_range, init_sequence, Command, InitStep};

/// Settle delay after DISPON before the first pixel write.
const DISPLAY_ON_SETTLE_MS: u32 = 20;

/// Hardware reset timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTiming {
    /// Hold time after each of the three reset edges.
    pub settle: Duration,
}

impl Default for ResetTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(10),
        }
    }
}

/// A rectangle of controller RAM in logical panel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Window {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a window from a start corner and an exclusive end corner.
    pub fn from_corners(x0: u16, y0: u16, x1: u16, y1: u16) -> Self {
        Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// The whole panel.
    pub fn full(profile: &PanelProfile) -> Self {
        Self::new(0, 0, profile.width, profile.height)
    }

    /// Pixel bytes the controller expects after RAMWR for this window.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }

    fn check(&self, profile: &PanelProfile) -> Result<()> {
        let x1 = self.x as u32 + self.width as u32;
        let y1 = self.y as u32 + self.height as u32;
        if self.width == 0
            || self.height == 0
            || x1 > profile.width as u32
            || y1 > profile.height as u32
        {
            return Err(Error::InvalidWindow {
                x0: self.x,
                y0: self.y,
                x1: x1.min(u16::MAX as u32) as u16,
                y1: y1.min(u16::MAX as u32) as u16,
                width: profile.width,
                height: profile.height,
            });
        }
        Ok(())
    }
}

/// Drawing operations the playback layer needs from a panel.
pub trait Panel {
    /// Geometry of the panel.
    fn profile(&self) -> &PanelProfile;

    /// Draws a full-panel frame.
    fn draw_frame(&mut self, frame: &PackedFrame) -> Result<()>;

    /// Fills the whole panel with one RGB565 colour.
    fn fill_screen(&mut self, color: u16) -> Result<()>;
}

impl<P: Panel + ?Sized> Panel for Box<P> {
    fn profile(&self) -> &PanelProfile {
        (**self).profile()
    }

    fn draw_frame(&mut self, frame: &PackedFrame) -> Result<()> {
        (**self).draw_frame(frame)
    }

    fn fill_screen(&mut self, color: u16) -> Result<()> {
        (**self).fill_screen(color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Uninitialized,
    Ready,
}

/// Protocol driver for one panel.
///
/// Construction performs the hardware reset and the panel's init sequence;
/// a driver that fails either step is never returned.
pub struct PanelDriver<T, RST, D> {
    profile: PanelProfile,
    transport: T,
    reset: RST,
    delay: D,
    timing: ResetTiming,
    backlight: Option<Box<dyn Backlight + Send>>,
    state: DriverState,
}

impl<T, RST, D> PanelDriver<T, RST, D>
where
    T: Transport,
    RST: OutputPin,
    D: DelayNs,
{
    /// Resets and initializes a panel.
    pub fn new(
        profile: PanelProfile,
        transport: T,
        reset: RST,
        delay: D,
        timing: ResetTiming,
    ) -> Result<Self> {
        let mut driver = Self {
            profile,
            transport,
            reset,
            delay,
            timing,
            backlight: None,
            state: DriverState::Uninitialized,
        };
        driver.initialize()?;

        info!(
            "Panel {} initialized ({}x{}, {}, MADCTL 0x{:02X})",
            profile.kind, profile.width, profile.height, profile.orientation, profile.madctl
        );
        Ok(driver)
    }

    /// Attaches a backlight controller.
    pub fn with_backlight<B: Backlight + Send + 'static>(mut self, backlight: B) -> Self {
        self.backlight = Some(Box::new(backlight));
        self
    }

    /// Returns the panel geometry.
    pub fn profile(&self) -> &PanelProfile {
        &self.profile
    }

    /// Returns true once the init sequence has completed.
    pub fn is_initialized(&self) -> bool {
        self.state == DriverState::Ready
    }

    /// Re-runs reset and init. Drawing is refused until this succeeds.
    pub fn reinit(&mut self) -> Result<()> {
        self.initialize()?;
        info!("Panel {} re-initialized", self.profile.kind);
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        self.state = DriverState::Uninitialized;
        self.hard_reset()?;

        for step in init_sequence(self.profile.kind) {
            match *step {
                InitStep::Cmd(command, data) => self.command(command, data)?,
                InitStep::MemoryAccess => {
                    self.command(Command::MemoryAccessControl, &[self.profile.madctl])?
                }
                InitStep::Delay(ms) => self.delay.delay_ms(ms),
            }
        }

        self.program_window(Window::full(&self.profile))?;
        self.command(Command::DisplayOn, &[])?;
        self.delay.delay_ms(DISPLAY_ON_SETTLE_MS);

        self.state = DriverState::Ready;
        Ok(())
    }

    /// Drives reset high, low, high with a settle delay after each edge.
    fn hard_reset(&mut self) -> Result<()> {
        let settle = self.timing.settle.as_millis().min(u32::MAX as u128) as u32;

        self.reset.set_high().map_err(Error::pin)?;
        self.delay.delay_ms(settle);
        self.reset.set_low().map_err(Error::pin)?;
        self.delay.delay_ms(settle);
        self.reset.set_high().map_err(Error::pin)?;
        self.delay.delay_ms(settle);

        debug!("Hardware reset complete ({} ms edges)", settle);
        Ok(())
    }

    fn command(&mut self, command: Command, data: &[u8]) -> Result<()> {
        self.transport.send_command(command as u8)?;
        self.transport.send_data(data)
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            DriverState::Ready => Ok(()),
            DriverState::Uninitialized => Err(Error::NotInitialized),
        }
    }

    /// Programs CASET/RASET/RAMWR for `(x0, y0)..(x1, y1)`, end exclusive.
    pub fn set_address_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<()> {
        self.ensure_ready()?;
        let window = Window::from_corners(x0, y0, x1, y1);
        if x1 <= x0 || y1 <= y0 {
            return Err(Error::InvalidWindow {
                x0,
                y0,
                x1,
                y1,
                width: self.profile.width,
                height: self.profile.height,
            });
        }
        window.check(&self.profile)?;
        self.program_window(window)
    }

    fn program_window(&mut self, window: Window) -> Result<()> {
        let x0 = window.x + self.profile.x_offset;
        let x1 = window.x + window.width - 1 + self.profile.x_offset;
        let y0 = window.y + self.profile.y_offset;
        let y1 = window.y + window.height - 1 + self.profile.y_offset;

        self.command(Command::ColumnAddressSet, &encode_range(x0, x1))?;
        self.command(Command::RowAddressSet, &encode_range(y0, y1))?;
        self.transport.send_command(Command::MemoryWrite as u8)
    }

    /// Draws packed pixels into a sub-rectangle of the panel.
    ///
    /// The window is reprogrammed on every call. `frame` must hold exactly
    /// `width * height * 2` bytes for the window.
    pub fn draw_region(&mut self, window: Window, frame: &PackedFrame) -> Result<()> {
        self.ensure_ready()?;
        window.check(&self.profile)?;
        if frame.len() != window.byte_len() {
            return Err(Error::FrameSize {
                expected: window.byte_len(),
                actual: frame.len(),
            });
        }

        self.program_window(window)?;
        self.transport.send_data(frame.data())
    }

    /// Sets the backlight level, if a backlight is attached.
    pub fn set_backlight(&mut self, percent: u8) -> Result<()> {
        match self.backlight.as_mut() {
            Some(backlight) => backlight.set_brightness(percent),
            None => {
                debug!("No backlight attached to panel {}", self.profile.kind);
                Ok(())
            }
        }
    }

    /// Consumes the driver and returns its bus parts.
    pub fn release(self) -> (T, RST, D) {
        (self.transport, self.reset, self.delay)
    }
}

impl<T, RST, D> Panel for PanelDriver<T, RST, D>
where
    T: Transport,
    RST: OutputPin,
    D: DelayNs,
{
    fn profile(&self) -> &PanelProfile {
        &self.profile
    }

    fn draw_frame(&mut self, frame: &PackedFrame) -> Result<()> {
        self.draw_region(Window::full(&self.profile), frame)
    }

    fn fill_screen(&mut self, color: u16) -> Result<()> {
        let frame = PackedFrame::solid(self.profile.width as u32, self.profile.height as u32, color);
        self.draw_frame(&frame)
    }
}
