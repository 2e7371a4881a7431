// waypost/src/clock/tokio_clock.rs

use crate::clock::{Clock, Timestamp, TimerCallback, TimerHandle};
use crate::error::{WaypostError, WaypostResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{event, Level};

/// A clock backed by the tokio timer wheel.
///
/// Each scheduled timer is a spawned task that sleeps, then runs its callback
/// on a runtime worker. Honours tokio's paused test time.
pub struct TokioClock {
  origin: Instant,
  handle: Handle,
  next_id: AtomicU64,
  // Live timers only. A task removes its own entry before firing, so whoever
  // removes an entry first (the task or `cancel`) decides whether it fires.
  timers: Arc<Mutex<HashMap<u64, AbortHandle>>>,
}

impl TokioClock {
  /// Binds to the runtime of the calling context.
  pub fn current() -> WaypostResult<Self> {
    let handle = Handle::try_current().map_err(|err| WaypostError::Runtime(err.to_string()))?;
    Ok(Self::with_handle(handle))
  }

  pub fn with_handle(handle: Handle) -> Self {
    Self {
      origin: Instant::now(),
      handle,
      next_id: AtomicU64::new(0),
      timers: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  pub fn pending_timers(&self) -> usize {
    self.timers.lock().len()
  }

  pub fn is_pending(&self, handle: TimerHandle) -> bool {
    self.timers.lock().contains_key(&handle.id())
  }
}

impl Clock for TokioClock {
  fn now(&self) -> Timestamp {
    Timestamp::from_origin(Instant::now().saturating_duration_since(self.origin))
  }

  fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let timers = Arc::clone(&self.timers);

    // Registered under the lock so the task cannot look itself up before it exists.
    let mut live = self.timers.lock();
    let task = self.handle.spawn(async move {
      tokio::time::sleep(after).await;
      let still_armed = timers.lock().remove(&id).is_some();
      if still_armed {
        callback();
      } else {
        event!(Level::TRACE, timer_id = id, "Timer woke after cancellation.");
      }
    });
    live.insert(id, task.abort_handle());
    TimerHandle::from_raw(id)
  }

  fn cancel(&self, handle: TimerHandle) {
    if let Some(task) = self.timers.lock().remove(&handle.id()) {
      task.abort();
    }
  }
}

impl Drop for TokioClock {
  fn drop(&mut self) {
    for (_, task) in self.timers.lock().drain() {
      task.abort();
    }
  }
}
