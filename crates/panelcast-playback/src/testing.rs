//! Panel and renderer doubles for playback tests.

use crate::source::{FrameSelector, FrameSource};
use crate::{Error, Result};
use panelcast_hw::{
    FrameSurface, Orientation, PackedFrame, Panel, PanelKind, PanelProfile, PixelFormat,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One recorded panel draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Draw {
    Frame { panel: &'static str, at: Instant },
    Fill { panel: &'static str, color: u16, at: Instant },
}

impl Draw {
    pub fn panel(&self) -> &'static str {
        match self {
            Draw::Frame { panel, .. } | Draw::Fill { panel, .. } => panel,
        }
    }

    pub fn at(&self) -> Instant {
        match self {
            Draw::Frame { at, .. } | Draw::Fill { at, .. } => *at,
        }
    }
}

/// Draw log shared between mock panels so cross-panel order is visible.
#[derive(Debug, Clone, Default)]
pub struct DrawLog(Arc<Mutex<Vec<Draw>>>);

impl DrawLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> Vec<Draw> {
        self.0.lock().unwrap().clone()
    }

    pub fn frame_times(&self, panel: &str) -> Vec<Instant> {
        self.draws()
            .into_iter()
            .filter_map(|d| match d {
                Draw::Frame { panel: p, at } if p == panel => Some(at),
                _ => None,
            })
            .collect()
    }

    fn push(&self, draw: Draw) {
        self.0.lock().unwrap().push(draw);
    }
}

/// Panel that records draws and fails them while its fault switch is set.
pub struct MockPanel {
    name: &'static str,
    profile: PanelProfile,
    log: DrawLog,
    broken: Arc<AtomicBool>,
}

impl MockPanel {
    pub fn new(name: &'static str, log: &DrawLog) -> Self {
        Self {
            name,
            profile: PanelProfile {
                width: 8,
                height: 4,
                ..PanelProfile::resolve(PanelKind::Lcd1in3, Orientation::Portrait)
            },
            log: log.clone(),
            broken: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fault_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.broken)
    }

    fn check(&self) -> panelcast_hw::Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(panelcast_hw::Error::Bus("Other".into()));
        }
        Ok(())
    }
}

impl Panel for MockPanel {
    fn profile(&self) -> &PanelProfile {
        &self.profile
    }

    fn draw_frame(&mut self, frame: &PackedFrame) -> panelcast_hw::Result<()> {
        self.check()?;
        if frame.len() != self.profile.frame_bytes() {
            return Err(panelcast_hw::Error::FrameSize {
                expected: self.profile.frame_bytes(),
                actual: frame.len(),
            });
        }
        self.log.push(Draw::Frame {
            panel: self.name,
            at: Instant::now(),
        });
        Ok(())
    }

    fn fill_screen(&mut self, color: u16) -> panelcast_hw::Result<()> {
        self.check()?;
        self.log.push(Draw::Fill {
            panel: self.name,
            color,
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Record of one render request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCall {
    pub selector: FrameSelector,
    pub at: Instant,
}

/// Renderer that returns blank frames, optionally stalling or failing on one call.
#[derive(Clone)]
pub struct MockSource {
    frames: usize,
    rate: Option<u32>,
    calls: Arc<Mutex<Vec<RenderCall>>>,
    stall: Option<(usize, Duration)>,
    fail_at: Option<usize>,
    cost: Duration,
}

impl MockSource {
    pub fn new(frames: usize) -> Self {
        Self {
            frames,
            rate: None,
            calls: Arc::default(),
            stall: None,
            fail_at: None,
            cost: Duration::ZERO,
        }
    }

    /// Sleeps for `duration` inside the `call`th render (0-based).
    pub fn stalling(mut self, call: usize, duration: Duration) -> Self {
        self.stall = Some((call, duration));
        self
    }

    /// Every render takes `cost`.
    pub fn costing(mut self, cost: Duration) -> Self {
        self.cost = cost;
        self
    }

    pub fn failing_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl FrameSource for MockSource {
    fn frame_count(&self) -> usize {
        self.frames
    }

    fn frame_rate(&self) -> Option<u32> {
        self.rate
    }

    async fn render(
        &mut self,
        selector: FrameSelector,
        width: u32,
        height: u32,
    ) -> Result<FrameSurface> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RenderCall {
                selector,
                at: Instant::now(),
            });
            calls.len() - 1
        };
        if self.fail_at == Some(call) {
            return Err(Error::Source(format!("render {} failed", call)));
        }
        if !self.cost.is_zero() {
            tokio::time::sleep(self.cost).await;
        }
        if let Some((at, duration)) = self.stall {
            if at == call {
                tokio::time::sleep(duration).await;
            }
        }
        let data = vec![0u8; (width * height * 3) as usize];
        Ok(FrameSurface::new(width, height, PixelFormat::Rgb888, data)?)
    }
}
