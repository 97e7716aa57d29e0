//! Lock-step playback across panels sharing one SPI controller.
//!
//! Each tick renders every panel's frame concurrently, then writes them to
//! the bus one panel at a time. Every bus write, including the first of a
//! tick and those from `clear`, waits for the settle gap since the previous
//! one. Draw order is the order panels were added.

use crate::pacing::{ErrorThrottle, FrameStats, PlaybackOptions, PlaybackOutcome, PlaybackState};
use crate::scheduler::SchedulerState;
use crate::source::{FrameSelector, FrameSource};
use crate::{Error, Result};
use futures::future::join_all;
use panelcast_hw::{PackedFrame, Panel};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Gap between one panel's last byte and the next panel's first.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(2);

struct Slot<P, S> {
    name: String,
    panel: P,
    source: S,
    throttle: ErrorThrottle,
}

impl<P: Panel, S: FrameSource> Slot<P, S> {
    async fn render(&mut self, selector: FrameSelector) -> Result<PackedFrame> {
        let (width, height) = self.panel.profile().dimensions();
        let surface = self
            .source
            .render(selector, u32::from(width), u32::from(height))
            .await?;
        Ok(PackedFrame::encode(&surface))
    }
}

/// Owns every panel on a shared bus and serializes their draws.
pub struct MultiPanelCoordinator<P, S> {
    slots: Vec<Slot<P, S>>,
    settle: Duration,
    /// When the bus was last handed back by a panel.
    last_release: Option<Instant>,
    state: SchedulerState,
    stats: FrameStats,
}

impl<P: Panel, S: FrameSource> Default for MultiPanelCoordinator<P, S> {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE)
    }
}

impl<P: Panel, S: FrameSource> MultiPanelCoordinator<P, S> {
    pub fn new(settle: Duration) -> Self {
        Self {
            slots: Vec::new(),
            settle,
            last_release: None,
            state: SchedulerState::Idle,
            stats: FrameStats::default(),
        }
    }

    /// Appends a panel; panels are drawn in the order they were added.
    pub fn add_panel(&mut self, name: impl Into<String>, panel: P, source: S) -> &mut Self {
        let name = name.into();
        debug!("Coordinating panel {} ({})", name, panel.profile().kind);
        self.slots.push(Slot {
            name,
            panel,
            source,
            throttle: ErrorThrottle::new("Panel draw"),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Counters summed over all panels.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Plays all sources in lock-step until the requested loops are done or
    /// `cancel` fires.
    ///
    /// A loop lasts as long as the longest source; shorter ones wrap.
    pub async fn play(
        &mut self,
        options: PlaybackOptions,
        cancel: &CancellationToken,
    ) -> Result<PlaybackOutcome> {
        if self.state == SchedulerState::Playing {
            return Err(Error::AlreadyPlaying);
        }

        let mut ticks = 0;
        for slot in &self.slots {
            let per_source = PlaybackState::new(
                slot.source.frame_count(),
                slot.source.frame_rate(),
                &options,
            )?;
            ticks = ticks.max(per_source.total_frames());
        }
        let mut playback = PlaybackState::new(ticks, None, &options)?;

        self.state = SchedulerState::Playing;
        self.stats = FrameStats::default();
        info!(
            "Playing {} panels, {} ticks per loop at {} fps",
            self.slots.len(),
            ticks,
            options.fps
        );

        let result = self.run(&mut playback, cancel).await;
        self.state = match result {
            Ok(PlaybackOutcome::Cancelled) => SchedulerState::Cancelled,
            _ => SchedulerState::Stopped,
        };
        info!(
            "Playback ended: {:?} ({} drawn, {} dropped, {} resyncs)",
            self.state, self.stats.drawn, self.stats.dropped, self.stats.resyncs
        );
        result
    }

    async fn run(
        &mut self,
        playback: &mut PlaybackState,
        cancel: &CancellationToken,
    ) -> Result<PlaybackOutcome> {
        while playback.begin_loop() {
            while !playback.loop_done() {
                if cancel.is_cancelled() {
                    return Ok(PlaybackOutcome::Cancelled);
                }

                let tick_start = Instant::now();
                self.tick(playback.selector()).await?;

                let remaining = playback.finish_frame(tick_start, &mut self.stats);
                let cancelled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(remaining) => false,
                };
                if cancelled {
                    return Ok(PlaybackOutcome::Cancelled);
                }
            }
            playback.end_loop(&mut self.stats);
        }

        Ok(PlaybackOutcome::Completed)
    }

    async fn tick(&mut self, selector: FrameSelector) -> Result<()> {
        let frames = join_all(self.slots.iter_mut().map(|slot| slot.render(selector)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        for (slot, frame) in self.slots.iter_mut().zip(&frames) {
            settle_bus(self.settle, self.last_release).await;
            let drawn = slot.panel.draw_frame(frame);
            self.last_release = Some(Instant::now());
            match drawn {
                Ok(()) => {
                    self.stats.drawn += 1;
                    slot.throttle.reset();
                }
                Err(e) if e.is_transport() => {
                    self.stats.dropped += 1;
                    slot.throttle.record(&format!("{}: {}", slot.name, e));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Returns to `Idle`, discarding the state of the last run.
    pub fn stop(&mut self) {
        self.state = SchedulerState::Idle;
        self.stats = FrameStats::default();
    }

    /// Fills every panel with one colour, in draw order.
    pub async fn clear(&mut self, color: u16) -> Result<()> {
        for slot in self.slots.iter_mut() {
            settle_bus(self.settle, self.last_release).await;
            let filled = slot.panel.fill_screen(color);
            self.last_release = Some(Instant::now());
            filled?;
        }
        Ok(())
    }
}

/// Waits until `settle` has passed since the previous panel released the bus.
async fn settle_bus(settle: Duration, last_release: Option<Instant>) {
    if let Some(released) = last_release {
        let wait = settle.saturating_sub(released.elapsed());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
