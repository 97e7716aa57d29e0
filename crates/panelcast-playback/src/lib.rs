//! Panelcast Playback
//!
//! Paces frames from a [`FrameSource`] onto one or more panels at a target
//! rate, resynchronizing to wall-clock time when rendering falls behind.

mod coordinator;
mod error;
mod pacing;
mod pattern;
mod scheduler;
mod sequence;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{MultiPanelCoordinator, DEFAULT_SETTLE};
pub use error::{Error, Result};
pub use pacing::{FrameStats, LoopCount, PlaybackOptions, PlaybackOutcome};
pub use pattern::TestPattern;
pub use scheduler::{PlaybackScheduler, SchedulerState};
pub use sequence::ImageSequence;
pub use source::{FrameSelector, FrameSource};
