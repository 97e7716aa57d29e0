//! Error types for the panel hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a panel.
#[derive(Error, Debug)]
pub enum Error {
    /// Unrecognized panel type.
    #[error("Invalid panel type: {0}")]
    InvalidPanel(String),

    /// Invalid orientation value.
    #[error("Invalid orientation: {0}")]
    InvalidOrientation(String),

    /// SPI write failed.
    #[error("SPI bus error: {0}")]
    Bus(String),

    /// GPIO line could not be driven.
    #[error("GPIO error: {0}")]
    Pin(String),

    /// Drawing attempted before the init sequence completed.
    #[error("Panel not initialized")]
    NotInitialized,

    /// Packed frame length does not match the programmed window.
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    /// Surface buffer length does not match its dimensions.
    #[error("Surface size mismatch: expected {expected} bytes, got {actual}")]
    SurfaceSize { expected: usize, actual: usize },

    /// Address window outside the panel or empty.
    #[error("Invalid address window ({x0}, {y0})..({x1}, {y1}) for {width}x{height} panel")]
    InvalidWindow {
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
        width: u16,
        height: u16,
    },

    /// Device node could not be opened or configured.
    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error.
    #[error("Image error: {0}")]
    Image(String),
}

impl Error {
    /// Returns true for failures of the physical bus or its control lines.
    ///
    /// During playback these drop a single frame; every other variant is a
    /// configuration or caller contract problem.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Bus(_) | Error::Pin(_) | Error::Io(_))
    }

    pub(crate) fn bus<E: embedded_hal::spi::Error>(e: E) -> Self {
        Error::Bus(format!("{:?}", e.kind()))
    }

    pub(crate) fn pin<E: embedded_hal::digital::Error>(e: E) -> Self {
        Error::Pin(format!("{:?}", e.kind()))
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}
