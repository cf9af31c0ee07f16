//! Time subsystem.
//!
//! Frame timing and pacing, decoupled from the runtime so it can be driven by
//! a manual clock in tests.
//! - one `FrameClock` per render loop; `tick()` once per frame for `dt`/`elapsed`
//! - one `FrameScheduler` per render loop; `begin_frame` and `record_frame`
//!   once per frame, then either `limit` or `plan_wait` + `complete_wait`

mod frame_clock;
mod scheduler;
mod source;

pub use frame_clock::{FrameClock, FrameTime};
pub use scheduler::{FrameScheduler, FrameWait, PacingStrategy};
pub use source::{SystemClock, TimeSource};
