// waypost/src/clock/manual.rs

use crate::clock::{Clock, Timestamp, TimerCallback, TimerHandle};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{event, Level};

/// A clock that only moves when told to.
///
/// Timers fire from inside [`ManualClock::advance`], in deadline order (ties in
/// scheduling order), with `now` set to each timer's deadline while its callback
/// runs. Callbacks run without the clock's lock held, so they may schedule or
/// cancel further timers; timers they schedule inside the advanced window fire
/// in the same call.
#[derive(Default)]
pub struct ManualClock {
  state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
  now: Duration,
  next_id: u64,
  queue: BTreeMap<(Duration, u64), TimerCallback>,
  deadlines: HashMap<u64, Duration>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self::default()
  }

  /// Moves time forward by `by`, firing every timer that falls due.
  pub fn advance(&self, by: Duration) {
    let target = self.state.lock().now.saturating_add(by);
    self.advance_to(Timestamp::from_origin(target));
  }

  /// Moves time forward to `target`. Targets in the past leave `now` unchanged.
  pub fn advance_to(&self, target: Timestamp) {
    let target = target.since_origin();
    loop {
      let due = {
        let mut state = self.state.lock();
        let next_key = state
          .queue
          .keys()
          .next()
          .copied()
          .filter(|(deadline, _)| *deadline <= target);
        match next_key {
          Some(key) => {
            state.deadlines.remove(&key.1);
            state.now = state.now.max(key.0);
            state.queue.remove(&key)
          }
          None => {
            state.now = state.now.max(target);
            return;
          }
        }
      };
      if let Some(callback) = due {
        event!(Level::TRACE, "ManualClock firing timer.");
        callback();
      }
    }
  }

  /// Number of timers scheduled and not yet fired or cancelled.
  pub fn pending_timers(&self) -> usize {
    self.state.lock().queue.len()
  }

  pub fn is_pending(&self, handle: TimerHandle) -> bool {
    self.state.lock().deadlines.contains_key(&handle.id())
  }

  pub fn next_deadline(&self) -> Option<Timestamp> {
    self
      .state
      .lock()
      .queue
      .keys()
      .next()
      .map(|(deadline, _)| Timestamp::from_origin(*deadline))
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Timestamp {
    Timestamp::from_origin(self.state.lock().now)
  }

  fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle {
    let mut state = self.state.lock();
    let id = state.next_id;
    state.next_id += 1;
    let deadline = state.now.saturating_add(after);
    state.queue.insert((deadline, id), callback);
    state.deadlines.insert(id, deadline);
    TimerHandle::from_raw(id)
  }

  fn cancel(&self, handle: TimerHandle) {
    let mut state = self.state.lock();
    if let Some(deadline) = state.deadlines.remove(&handle.id()) {
      state.queue.remove(&(deadline, handle.id()));
    }
  }
}
