use std::time::{Duration, Instant};

use super::source::{SystemClock, TimeSource};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds (clamped).
    pub dt: f32,

    /// Sum of all clamped `dt` values, in seconds. Drives animations.
    pub elapsed: f64,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped so a debugger pause, a minimized window or a long
/// shader reload does not turn into one giant animation step.
#[derive(Debug, Clone)]
pub struct FrameClock<S = SystemClock> {
    source: S,
    last: Instant,
    elapsed: f64,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock<SystemClock> {
    /// Creates a new clock with default clamps (100µs ..= 250ms).
    pub fn new() -> Self {
        Self::with_source(SystemClock)
    }
}

impl<S: TimeSource> FrameClock<S> {
    pub fn with_source(source: S) -> Self {
        Self::with_clamps(source, Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(source: S, dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let last = source.now();
        Self {
            source,
            last,
            elapsed: 0.0,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the delta baseline. Accumulated time is kept.
    pub fn reset(&mut self) {
        self.last = self.source.now();
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = self.source.now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;
        self.elapsed += dt.as_secs_f64();

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}
