use std::time::{Duration, Instant};

use super::source::{SystemClock, TimeSource};

/// How the frame limiter waits out the rest of a frame budget.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PacingStrategy {
    /// Sleep for `1 - spin_fraction` of the remaining time, then busy-wait
    /// until the deadline. Coarse sleeps commonly overshoot; the spin tail
    /// trades CPU time for a deadline hit within microseconds.
    Hybrid { spin_fraction: f64 },

    /// One sleep for the whole remainder. Lower CPU use, less precise.
    Sleep,
}

impl PacingStrategy {
    pub const DEFAULT_SPIN_FRACTION: f64 = 0.01;

    /// Clamps `spin_fraction` to `[0, 1]`; a non-finite value falls back to
    /// [`DEFAULT_SPIN_FRACTION`](Self::DEFAULT_SPIN_FRACTION).
    pub fn sanitized(self) -> Self {
        match self {
            PacingStrategy::Hybrid { spin_fraction } if spin_fraction.is_finite() => {
                PacingStrategy::Hybrid {
                    spin_fraction: spin_fraction.clamp(0.0, 1.0),
                }
            }
            PacingStrategy::Hybrid { spin_fraction } => {
                log::warn!("spin fraction {spin_fraction} is not a number, using the default");
                PacingStrategy::default()
            }
            PacingStrategy::Sleep => PacingStrategy::Sleep,
        }
    }
}

impl Default for PacingStrategy {
    fn default() -> Self {
        PacingStrategy::Hybrid {
            spin_fraction: Self::DEFAULT_SPIN_FRACTION,
        }
    }
}

/// The wait the limiter wants between two frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameWait {
    /// End of the coarse wait. An event loop parks until this instant.
    pub wake_at: Instant,
    /// End of the frame budget. The stretch after `wake_at` is spun.
    pub deadline: Instant,
}

/// Paces the render loop and samples the frame rate.
///
/// Two independent parts share only the clock:
/// - the FPS sampler (`record_frame`) recomputes `current_fps` once per
///   second of wall time, so the displayed value does not jitter per frame
/// - the limiter holds the next frame back until the budget `1 / target_fps`
///   has elapsed since the previous one
///
/// The limiter comes in two forms. `limit` blocks the calling thread.
/// `plan_wait` + `complete_wait` split the same wait so an event loop can do
/// the coarse part with its own wait primitive and stay responsive.
///
/// One scheduler per render loop; it is mutated once per frame.
#[derive(Debug)]
pub struct FrameScheduler<S = SystemClock> {
    source: S,
    strategy: PacingStrategy,
    target_fps: u32,

    frame_start: Instant,
    last_frame_time: Instant,

    frame_count: u32,
    last_sample_time: Instant,
    current_fps: f64,
}

const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

impl FrameScheduler<SystemClock> {
    pub fn new(target_fps: u32, strategy: PacingStrategy) -> Self {
        Self::with_source(SystemClock, target_fps, strategy)
    }
}

impl<S: TimeSource> FrameScheduler<S> {
    pub fn with_source(source: S, target_fps: u32, strategy: PacingStrategy) -> Self {
        let now = source.now();
        Self {
            source,
            strategy: strategy.sanitized(),
            target_fps,
            frame_start: now,
            last_frame_time: now,
            frame_count: 0,
            last_sample_time: now,
            current_fps: 0.0,
        }
    }

    /// Records the start of a frame.
    pub fn begin_frame(&mut self, now: Instant) {
        self.frame_start = now;
    }

    /// Counts a finished frame and refreshes `current_fps` once at least one
    /// second has passed since the previous sample.
    pub fn record_frame(&mut self, now: Instant) {
        self.frame_count += 1;

        let elapsed = now.saturating_duration_since(self.last_sample_time);
        if elapsed >= SAMPLE_INTERVAL {
            self.current_fps = f64::from(self.frame_count) / elapsed.as_secs_f64();
            log::trace!(
                "fps sample: {:.1} ({} frames in {:.3}s)",
                self.current_fps,
                self.frame_count,
                elapsed.as_secs_f64()
            );
            self.frame_count = 0;
            self.last_sample_time = now;
        }
    }

    /// Plans the wait after a frame that finished at `now`.
    ///
    /// `None` when no wait is needed: `target_fps == 0` (uncapped) or the
    /// budget is already used up. For `Hybrid` the last `spin_fraction` of the
    /// remaining time lies between `wake_at` and `deadline`.
    pub fn plan_wait(&self, now: Instant, target_fps: u32) -> Option<FrameWait> {
        if target_fps == 0 {
            return None;
        }

        let budget = Duration::from_secs_f64(1.0 / f64::from(target_fps));
        let elapsed = now.saturating_duration_since(self.last_frame_time);
        if elapsed >= budget {
            return None;
        }

        let remaining = budget - elapsed;
        let deadline = now + remaining;
        let wake_at = match self.strategy {
            PacingStrategy::Sleep => deadline,
            PacingStrategy::Hybrid { spin_fraction } => {
                now + remaining.mul_f64(1.0 - spin_fraction)
            }
        };

        Some(FrameWait { wake_at, deadline })
    }

    /// Spins out whatever is left of `wait` and starts the next frame budget.
    ///
    /// `last_frame_time` is refreshed from the clock whether or not there was
    /// anything to wait for.
    pub fn complete_wait(&mut self, wait: Option<FrameWait>) {
        if let Some(wait) = wait {
            while self.source.now() < wait.deadline {
                self.source.spin();
            }
        }
        self.last_frame_time = self.source.now();
    }

    /// Blocks until the frame budget for `target_fps` has elapsed since the
    /// previous frame. `target_fps == 0` means uncapped.
    ///
    /// The coarse part is a [`TimeSource::sleep`]. Returns the time spent
    /// waiting.
    pub fn limit(&mut self, now: Instant, target_fps: u32) -> Duration {
        let wait = self.plan_wait(now, target_fps);

        if let Some(wait) = wait {
            let coarse = wait.wake_at.saturating_duration_since(now);
            if !coarse.is_zero() {
                self.source.sleep(coarse);
            }
        }
        self.complete_wait(wait);

        match wait {
            Some(_) => self.source.now().saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Sampled frames per second; `0.0` until the first full second.
    pub fn current_fps(&self) -> f64 {
        self.current_fps
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Sets the cap used by the runtime for subsequent frames. `0` = uncapped.
    pub fn set_target_fps(&mut self, target_fps: u32) {
        self.target_fps = target_fps;
    }

    pub fn strategy(&self) -> PacingStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: PacingStrategy) {
        let strategy = strategy.sanitized();
        log::trace!("pacing strategy {:?} -> {strategy:?}", self.strategy);
        self.strategy = strategy;
    }

    pub fn frame_start(&self) -> Instant {
        self.frame_start
    }

    pub fn last_frame_time(&self) -> Instant {
        self.last_frame_time
    }
}
