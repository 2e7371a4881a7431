// waypost/src/clock/mod.rs

//! Monotonic time and single-shot timers.
//!
//! Every step measures its minimum-active window against [`Clock::now`] and arms
//! its timeout and debounce waits through [`Clock::schedule`]. Two clocks ship
//! with the crate:
//!  - [`ManualClock`]: virtual time advanced explicitly, for deterministic tests
//!    and frame-driven hosts.
//!  - [`TokioClock`]: timers run as tokio tasks.

pub mod manual;
pub mod tokio_clock;

pub use manual::ManualClock;
pub use tokio_clock::TokioClock;

use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// A point in time, expressed as the offset from the owning clock's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
  pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

  pub const fn from_origin(offset: Duration) -> Self {
    Timestamp(offset)
  }

  pub const fn since_origin(self) -> Duration {
    self.0
  }

  /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
  pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
    self.0.saturating_sub(earlier.0)
  }
}

impl Add<Duration> for Timestamp {
  type Output = Timestamp;

  fn add(self, rhs: Duration) -> Timestamp {
    Timestamp(self.0.saturating_add(rhs))
  }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "t+{:?}", self.0)
  }
}

/// Identifies a scheduled timer. Handles are never reused by a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
  /// For `Clock` implementations minting their own handles.
  pub const fn from_raw(id: u64) -> Self {
    TimerHandle(id)
  }

  pub const fn id(self) -> u64 {
    self.0
  }
}

pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Time source and timer scheduler shared by every step of a sequence.
///
/// Contract:
///  - `now` never decreases.
///  - `schedule` does not block; `callback` runs exactly once after `after`
///    has elapsed unless the timer is cancelled first. It may run on another
///    thread than the caller of `schedule`, and may call back into the clock.
///  - `cancel` is idempotent and a no-op for timers that already fired.
pub trait Clock: Send + Sync {
  fn now(&self) -> Timestamp;

  fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle;

  fn cancel(&self, handle: TimerHandle);
}
