//! Renderer contract.

use crate::Result;
use panelcast_hw::FrameSurface;
use std::future::Future;
use std::time::Duration;

/// Which frame the scheduler wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSelector {
    /// Frame number within the current loop.
    Index(usize),
    /// Playback position measured from the start of the current loop.
    Time(Duration),
}

impl FrameSelector {
    /// Maps the selector onto a source of `count` frames authored at `fps`.
    ///
    /// Positions past the end wrap around.
    pub fn index_for(self, count: usize, fps: u32) -> usize {
        if count == 0 {
            return 0;
        }
        match self {
            FrameSelector::Index(i) => i % count,
            FrameSelector::Time(t) => {
                let frame = t.as_nanos() * u128::from(fps) / 1_000_000_000;
                (frame % count as u128) as usize
            }
        }
    }
}

/// Produces frame surfaces on demand.
///
/// Rendering for the same selector and size must be deterministic. It may
/// take arbitrarily long; the scheduler resynchronizes when it does.
pub trait FrameSource: Send {
    /// Number of distinct frames in one loop.
    fn frame_count(&self) -> usize;

    /// Rate the frames were authored at, if the source has one.
    fn frame_rate(&self) -> Option<u32> {
        None
    }

    /// Renders the selected frame at `width` x `height`.
    fn render(
        &mut self,
        selector: FrameSelector,
        width: u32,
        height: u32,
    ) -> impl Future<Output = Result<FrameSurface>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_selector_wraps() {
        assert_eq!(FrameSelector::Index(3).index_for(10, 30), 3);
        assert_eq!(FrameSelector::Index(12).index_for(10, 30), 2);
        assert_eq!(FrameSelector::Index(5).index_for(0, 30), 0);
    }

    #[test]
    fn test_time_selector() {
        let at = |ms| FrameSelector::Time(Duration::from_millis(ms));
        assert_eq!(at(0).index_for(10, 10), 0);
        assert_eq!(at(99).index_for(10, 10), 0);
        assert_eq!(at(100).index_for(10, 10), 1);
        assert_eq!(at(950).index_for(10, 10), 9);
        assert_eq!(at(1_050).index_for(10, 10), 0);
        // 24 fps source sampled half a second in
        assert_eq!(at(500).index_for(48, 24), 12);
    }
}
