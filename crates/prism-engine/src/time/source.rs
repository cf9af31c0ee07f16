use std::time::{Duration, Instant};

/// Wall-clock access used by the frame clock and the frame scheduler.
pub trait TimeSource {
    fn now(&self) -> Instant;

    /// Coarse wait. May overshoot.
    fn sleep(&self, duration: Duration);

    /// One iteration of a busy wait.
    fn spin(&self) {
        std::hint::spin_loop();
    }
}

/// The process monotonic clock.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
