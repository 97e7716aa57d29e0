//! Error types for playback.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a playback run.
#[derive(Error, Debug)]
pub enum Error {
    /// Panel or codec error.
    #[error(transparent)]
    Hw(#[from] panelcast_hw::Error),

    /// `play` called while a run is still marked as playing.
    #[error("Playback already in progress")]
    AlreadyPlaying,

    /// Source has no frames to show.
    #[error("Frame source is empty")]
    EmptySource,

    /// Target rate of zero or beyond what the pacing clock can express.
    #[error("Invalid frame rate: {0} fps")]
    InvalidFrameRate(u32),

    /// Renderer failed to produce a frame.
    #[error("Frame source error: {0}")]
    Source(String),

    /// Frame files could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true when the failure should only drop the current frame.
    pub fn is_frame_drop(&self) -> bool {
        matches!(self, Error::Hw(e) if e.is_transport())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Hw(e.into())
    }
}
