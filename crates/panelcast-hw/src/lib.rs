//! Panelcast Hardware Library
//!
//! Protocol driver for small SPI-attached ST7789-family colour panels
//! (2.4", 1.47" and 1.3" modules). Translates pixel-rectangle writes into the
//! command/data byte sequences each panel variant expects.

pub mod backlight;
pub mod codec;
pub mod error;
#[cfg(feature = "linux")]
pub mod linux;
pub mod panel;
pub mod profile;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use backlight::{Backlight, GpioBacklight};
pub use codec::{FrameSurface, PackedFrame, PixelFormat};
pub use error::{Error, Result};
pub use panel::{Panel, PanelDriver, ResetTiming, Window};
pub use profile::{Orientation, PanelKind, PanelProfile};
pub use transport::{OptionalLine, SharedLine, SpiTransport, Transport};

/// Largest single SPI write; matches the default spidev `bufsiz`.
pub const MAX_TRANSFER_CHUNK: usize = 4096;
