//! Frame pacing shared by the scheduler and the coordinator.

use crate::source::FrameSelector;
use crate::{Error, Result};
use std::fmt::Display;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Highest target rate accepted; keeps the frame interval at a millisecond or more.
const MAX_FPS: u32 = 1000;

/// How many times the frame sequence repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopCount {
    Finite(u32),
    #[default]
    Forever,
}

impl LoopCount {
    /// Maps the config convention (negative means forever) onto a loop count.
    pub fn from_signed(loops: i64) -> Self {
        if loops < 0 {
            LoopCount::Forever
        } else {
            LoopCount::Finite(u32::try_from(loops).unwrap_or(u32::MAX))
        }
    }

    fn exhausted(&self, completed: u32) -> bool {
        match self {
            LoopCount::Finite(n) => completed >= *n,
            LoopCount::Forever => false,
        }
    }
}

/// Playback parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    pub fps: u32,
    pub loops: LoopCount,
    /// A frame slower than this many intervals triggers a wall-clock resync.
    pub skip_threshold: f64,
    /// Select frames by playback position instead of by index.
    pub time_based: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            loops: LoopCount::Forever,
            skip_threshold: 2.0,
            time_based: true,
        }
    }
}

impl PlaybackOptions {
    /// Target time between frame starts.
    pub fn interval(&self) -> Result<Duration> {
        if self.fps == 0 || self.fps > MAX_FPS {
            return Err(Error::InvalidFrameRate(self.fps));
        }
        Ok(Duration::from_secs(1) / self.fps)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// All requested loops were shown.
    Completed,
    /// The cancellation token fired.
    Cancelled,
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames fully written to a panel.
    pub drawn: u64,
    /// Frames lost to bus errors.
    pub dropped: u64,
    /// Times the frame position jumped to catch up with the clock.
    pub resyncs: u64,
    /// Loops completed.
    pub loops: u32,
}

/// Mutable state of one playback run.
#[derive(Debug)]
pub(crate) struct PlaybackState {
    start: Instant,
    total_frames: usize,
    interval: Duration,
    loop_count: u32,
    last_render: Option<Duration>,
    position: usize,
    loops: LoopCount,
    time_based: bool,
    skip_after: Duration,
}

impl PlaybackState {
    /// Prepares a run over `frame_count` frames authored at `source_fps`.
    ///
    /// When selecting by time and the source rate differs from the target
    /// rate, a loop lasts as long as the source does rather than one tick per
    /// source frame.
    pub(crate) fn new(
        frame_count: usize,
        source_fps: Option<u32>,
        options: &PlaybackOptions,
    ) -> Result<Self> {
        let interval = options.interval()?;
        if frame_count == 0 {
            return Err(Error::EmptySource);
        }

        let total_frames = match source_fps {
            Some(rate) if options.time_based && rate > 0 && rate != options.fps => {
                let ticks =
                    (frame_count as u64 * u64::from(options.fps)).div_ceil(u64::from(rate));
                usize::try_from(ticks).unwrap_or(usize::MAX).max(1)
            }
            _ => frame_count,
        };

        Ok(Self {
            start: Instant::now(),
            total_frames,
            interval,
            loop_count: 0,
            last_render: None,
            position: 0,
            loops: options.loops,
            time_based: options.time_based,
            skip_after: interval.mul_f64(options.skip_threshold.max(1.0)),
        })
    }

    pub(crate) fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn last_render(&self) -> Option<Duration> {
        self.last_render
    }

    /// Starts the next loop, or returns false once the requested loops are done.
    pub(crate) fn begin_loop(&mut self) -> bool {
        if self.loops.exhausted(self.loop_count) {
            return false;
        }
        self.start = Instant::now();
        self.position = 0;
        true
    }

    pub(crate) fn loop_done(&self) -> bool {
        self.position >= self.total_frames
    }

    pub(crate) fn end_loop(&mut self, stats: &mut FrameStats) {
        self.loop_count += 1;
        stats.loops = self.loop_count;
        debug!("Loop {} complete", self.loop_count);
    }

    /// Selector for the frame at the current position.
    pub(crate) fn selector(&self) -> FrameSelector {
        if self.time_based {
            FrameSelector::Time(self.interval * self.position as u32)
        } else {
            FrameSelector::Index(self.position)
        }
    }

    /// Records a finished frame and returns how long to sleep before the next.
    ///
    /// A frame that overran the skip threshold moves the position to the
    /// first frame whose wall-clock slot has not started yet, and the sleep
    /// runs to the start of that slot. The final frame of a loop is never
    /// skipped.
    pub(crate) fn finish_frame(
        &mut self,
        frame_start: Instant,
        stats: &mut FrameStats,
    ) -> Duration {
        let elapsed = frame_start.elapsed();
        self.last_render = Some(elapsed);

        let next = self.position + 1;
        if elapsed > self.skip_after {
            let due = (self.start.elapsed().as_nanos() / self.interval.as_nanos()) as usize;
            let target = (due + 1).min(self.total_frames.saturating_sub(1));
            if target > next {
                debug!(
                    "Frame {} took {:?}, resyncing to frame {}",
                    self.position, elapsed, target
                );
                stats.resyncs += 1;
                self.position = target;
                return self.slot_start(target).saturating_duration_since(Instant::now());
            }
        }
        self.position = next;
        self.interval.saturating_sub(elapsed)
    }

    fn slot_start(&self, position: usize) -> Instant {
        self.start + self.interval * position as u32
    }
}

/// Rate-limited warning for errors that repeat every frame.
///
/// Logs the first occurrence, then a summary at most once per minute.
#[derive(Debug)]
pub(crate) struct ErrorThrottle {
    what: &'static str,
    consecutive: u32,
    last_log: Instant,
}

impl ErrorThrottle {
    pub(crate) fn new(what: &'static str) -> Self {
        Self {
            what,
            consecutive: 0,
            last_log: Instant::now(),
        }
    }

    pub(crate) fn record(&mut self, e: &dyn Display) {
        self.consecutive += 1;
        let elapsed = self.last_log.elapsed();
        if self.consecutive == 1 || elapsed >= Duration::from_secs(60) {
            if self.consecutive > 1 {
                warn!(
                    "{} error (repeated {} times in {:?}): {}",
                    self.what, self.consecutive, elapsed, e
                );
            } else {
                warn!("{} error: {}", self.what, e);
            }
            self.last_log = Instant::now();
            self.consecutive = 0;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.consecutive = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(fps: u32) -> PlaybackOptions {
        PlaybackOptions {
            fps,
            loops: LoopCount::Finite(1),
            skip_threshold: 2.0,
            time_based: false,
        }
    }

    #[test]
    fn test_interval() {
        assert_eq!(options(50).interval().unwrap(), Duration::from_millis(20));
        assert!(matches!(options(0).interval(), Err(Error::InvalidFrameRate(0))));
        assert!(matches!(
            options(5000).interval(),
            Err(Error::InvalidFrameRate(5000))
        ));
    }

    #[test]
    fn test_loop_count_from_signed() {
        assert_eq!(LoopCount::from_signed(-1), LoopCount::Forever);
        assert_eq!(LoopCount::from_signed(0), LoopCount::Finite(0));
        assert_eq!(LoopCount::from_signed(3), LoopCount::Finite(3));
    }

    #[test]
    fn test_empty_source_rejected() {
        assert!(matches!(
            PlaybackState::new(0, None, &options(30)),
            Err(Error::EmptySource)
        ));
    }

    #[test]
    fn test_frames_per_loop_follows_source_duration() {
        let mut opts = options(30);
        assert_eq!(PlaybackState::new(24, Some(24), &opts).unwrap().total_frames(), 24);
        // Index selection always walks every source frame
        assert_eq!(PlaybackState::new(24, Some(12), &opts).unwrap().total_frames(), 24);

        opts.time_based = true;
        // Two seconds of 12 fps material at 30 fps
        assert_eq!(PlaybackState::new(24, Some(12), &opts).unwrap().total_frames(), 60);
        assert_eq!(PlaybackState::new(24, None, &opts).unwrap().total_frames(), 24);
    }

    #[test]
    fn test_selector_modes() {
        let mut opts = options(50);
        let state = PlaybackState::new(10, None, &opts).unwrap();
        assert_eq!(state.selector(), FrameSelector::Index(0));

        opts.time_based = true;
        let mut state = PlaybackState::new(10, None, &opts).unwrap();
        let mut stats = FrameStats::default();
        state.finish_frame(Instant::now(), &mut stats);
        state.finish_frame(Instant::now(), &mut stats);
        assert_eq!(state.selector(), FrameSelector::Time(Duration::from_millis(40)));
    }

    #[test]
    fn test_loop_count_exhausted() {
        let mut state = PlaybackState::new(2, None, &options(30)).unwrap();
        let mut stats = FrameStats::default();
        assert!(state.begin_loop());
        state.end_loop(&mut stats);
        assert!(!state.begin_loop());
        assert_eq!(stats.loops, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_frame_sleeps_for_remainder() {
        let mut state = PlaybackState::new(10, None, &options(50)).unwrap();
        let mut stats = FrameStats::default();
        state.begin_loop();
        let start = Instant::now();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(state.finish_frame(start, &mut stats), Duration::from_millis(15));
        assert_eq!(state.last_render(), Some(Duration::from_millis(5)));
        assert_eq!(state.selector(), FrameSelector::Index(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_frame_advances_sequentially_below_threshold() {
        let mut state = PlaybackState::new(10, None, &options(50)).unwrap();
        let mut stats = FrameStats::default();
        state.begin_loop();
        let start = Instant::now();
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert_eq!(state.finish_frame(start, &mut stats), Duration::ZERO);
        assert_eq!(state.selector(), FrameSelector::Index(1));
        assert_eq!(stats.resyncs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_resyncs_to_wall_clock() {
        let mut state = PlaybackState::new(10, None, &options(50)).unwrap();
        let mut stats = FrameStats::default();
        state.begin_loop();
        let start = Instant::now();
        tokio::time::sleep(Duration::from_millis(60)).await;
        // Slot 3 started at 60 ms; the next free slot is 4 at 80 ms
        assert_eq!(state.finish_frame(start, &mut stats), Duration::from_millis(20));
        assert_eq!(state.selector(), FrameSelector::Index(4));
        assert_eq!(stats.resyncs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_sleeps_to_slot_boundary() {
        let mut state = PlaybackState::new(40, None, &options(50)).unwrap();
        let mut stats = FrameStats::default();
        state.begin_loop();
        let start = Instant::now();
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert_eq!(state.finish_frame(start, &mut stats), Duration::from_millis(10));
        assert_eq!(state.selector(), FrameSelector::Index(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_keeps_final_frame() {
        let mut state = PlaybackState::new(4, None, &options(50)).unwrap();
        let mut stats = FrameStats::default();
        state.begin_loop();
        let start = Instant::now();
        tokio::time::sleep(Duration::from_millis(150)).await;
        state.finish_frame(start, &mut stats);
        assert!(!state.loop_done());
        assert_eq!(state.selector(), FrameSelector::Index(3));

        state.finish_frame(Instant::now(), &mut stats);
        assert!(state.loop_done());
    }
}
