//! Procedural colour bars for bring-up without frame assets.

use crate::source::{FrameSelector, FrameSource};
use crate::Result;
use image::{Rgb, RgbImage};
use panelcast_hw::FrameSurface;

const BARS: [Rgb<u8>; 8] = [
    Rgb([255, 255, 255]),
    Rgb([255, 255, 0]),
    Rgb([0, 255, 255]),
    Rgb([0, 255, 0]),
    Rgb([255, 0, 255]),
    Rgb([255, 0, 0]),
    Rgb([0, 0, 255]),
    Rgb([0, 0, 0]),
];

/// Eight vertical colour bars scrolling one full width per loop.
#[derive(Debug, Clone)]
pub struct TestPattern {
    frames: usize,
    fps: u32,
}

impl TestPattern {
    pub fn new(frames: usize, fps: u32) -> Self {
        Self {
            frames: frames.max(1),
            fps,
        }
    }

    /// Draws frame `index` at the given size.
    pub fn frame(&self, index: usize, width: u32, height: u32) -> RgbImage {
        let span = u64::from(width.max(1));
        let shift = (index % self.frames) as u64 * span / self.frames as u64;
        RgbImage::from_fn(width, height, |x, _| {
            let column = (u64::from(x) + shift) % span;
            BARS[(column * BARS.len() as u64 / span) as usize]
        })
    }
}

impl Default for TestPattern {
    fn default() -> Self {
        Self::new(60, 30)
    }
}

impl FrameSource for TestPattern {
    fn frame_count(&self) -> usize {
        self.frames
    }

    fn frame_rate(&self) -> Option<u32> {
        Some(self.fps)
    }

    async fn render(
        &mut self,
        selector: FrameSelector,
        width: u32,
        height: u32,
    ) -> Result<FrameSurface> {
        let index = selector.index_for(self.frames, self.fps);
        Ok(self.frame(index, width, height).into())
    }
}
