//! Single-panel playback.

use crate::pacing::{ErrorThrottle, FrameStats, PlaybackOptions, PlaybackOutcome, PlaybackState};
use crate::source::{FrameSelector, FrameSource};
use crate::{Error, Result};
use panelcast_hw::{PackedFrame, Panel};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Playing,
    /// Requested loops finished or playback ended on an error.
    Stopped,
    Cancelled,
}

/// Drives one panel from one frame source at a target rate.
pub struct PlaybackScheduler<P, S> {
    panel: P,
    source: S,
    state: SchedulerState,
    stats: FrameStats,
}

impl<P: Panel, S: FrameSource> PlaybackScheduler<P, S> {
    pub fn new(panel: P, source: S) -> Self {
        Self {
            panel,
            source,
            state: SchedulerState::Idle,
            stats: FrameStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Counters from the current or most recent run.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    pub fn into_parts(self) -> (P, S) {
        (self.panel, self.source)
    }

    /// Plays the source until the requested loops are done or `cancel` fires.
    ///
    /// Transport failures drop the affected frame and playback continues.
    /// Any other error ends the run. The screen is left showing the last
    /// frame; see [`clear`](Self::clear).
    ///
    /// If the returned future is dropped mid-run the scheduler stays in
    /// `Playing` until [`stop`](Self::stop) is called.
    pub async fn play(
        &mut self,
        options: PlaybackOptions,
        cancel: &CancellationToken,
    ) -> Result<PlaybackOutcome> {
        if self.state == SchedulerState::Playing {
            return Err(Error::AlreadyPlaying);
        }

        let mut playback =
            PlaybackState::new(self.source.frame_count(), self.source.frame_rate(), &options)?;
        self.state = SchedulerState::Playing;
        self.stats = FrameStats::default();
        info!(
            "Playing {} frames per loop every {:?} ({:?})",
            playback.total_frames(),
            playback.interval(),
            options.loops
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
        let mut throttle = ErrorThrottle::new("Frame");

        while playback.begin_loop() {
            while !playback.loop_done() {
                if cancel.is_cancelled() {
                    return Ok(PlaybackOutcome::Cancelled);
                }

                let frame_start = Instant::now();
                match self.show(playback.selector()).await {
                    Ok(()) => {
                        self.stats.drawn += 1;
                        throttle.reset();
                    }
                    Err(e) if e.is_frame_drop() => {
                        self.stats.dropped += 1;
                        throttle.record(&e);
                    }
                    Err(e) => return Err(e),
                }

                let remaining = playback.finish_frame(frame_start, &mut self.stats);
                let cancelled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(remaining) => false,
                };
                if cancelled {
                    debug!(
                        "Cancelled during pacing sleep (last frame took {:?})",
                        playback.last_render()
                    );
                    return Ok(PlaybackOutcome::Cancelled);
                }
            }
            playback.end_loop(&mut self.stats);
        }

        Ok(PlaybackOutcome::Completed)
    }

    async fn show(&mut self, selector: FrameSelector) -> Result<()> {
        let (width, height) = self.panel.profile().dimensions();
        let surface = self
            .source
            .render(selector, u32::from(width), u32::from(height))
            .await?;
        let frame = PackedFrame::encode(&surface);
        self.panel.draw_frame(&frame)?;
        Ok(())
    }

    /// Returns to `Idle`, discarding the state of the last run.
    pub fn stop(&mut self) {
        debug!("Scheduler reset from {:?}", self.state);
        self.state = SchedulerState::Idle;
        self.stats = FrameStats::default();
    }

    /// Fills the panel with one colour.
    pub fn clear(&mut self, color: u16) -> Result<()> {
        self.panel.fill_screen(color)?;
        Ok(())
    }
}
