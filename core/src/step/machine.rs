// waypost/src/step/machine.rs

//! The per-task state machine: activation and skip evaluation, the timeout
//! timer, the minimum-active debounce and the completion entry point.

use crate::clock::Clock;
use crate::core::config::{TaskConfig, TriggerKind};
use crate::core::control::{StepOutcome, StepState, StepTransition};
use crate::core::oracle::StateOracle;
use crate::core::predicate::CompletionPredicate;
use crate::error::{WaypostError, WaypostResult};
use crate::step::runtime::{ArmedTimer, StepRuntime};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{event, instrument, Level};

/// Receives every terminal outcome of a step, whether produced by a direct
/// call or by one of its timers. Invoked after the step's lock is released,
/// so it may call back into the step.
pub type OutcomeListener = Arc<dyn Fn(StepOutcome) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
  Timeout,
  Debounce,
}

/// Runtime of a single tutorial step.
///
/// All mutations go through one lock, so completion requests, the timeout timer
/// and the debounce timer may race freely: exactly one of them produces the
/// terminal transition and the others observe a non-`Active` state and back off.
/// Timer callbacks only hold a weak reference; dropping every clone of a step
/// cancels whatever it still has armed.
#[derive(Clone)]
pub struct TaskStep {
  inner: Arc<StepInner>,
}

struct StepInner {
  config: TaskConfig,
  clock: Arc<dyn Clock>,
  oracle: Arc<dyn StateOracle>,
  runtime: Mutex<StepRuntime>,
  state_tx: watch::Sender<StepState>,
  listener: Option<OutcomeListener>,
}

impl TaskStep {
  /// Creates a `Pending` step. Fails with `InvalidConfig` if `config` does not validate.
  pub fn new(config: TaskConfig, clock: Arc<dyn Clock>, oracle: Arc<dyn StateOracle>) -> WaypostResult<Self> {
    Self::build(config, clock, oracle, None)
  }

  /// Like [`TaskStep::new`], delivering terminal outcomes to `listener`.
  pub fn with_listener(
    config: TaskConfig,
    clock: Arc<dyn Clock>,
    oracle: Arc<dyn StateOracle>,
    listener: OutcomeListener,
  ) -> WaypostResult<Self> {
    Self::build(config, clock, oracle, Some(listener))
  }

  fn build(
    config: TaskConfig,
    clock: Arc<dyn Clock>,
    oracle: Arc<dyn StateOracle>,
    listener: Option<OutcomeListener>,
  ) -> WaypostResult<Self> {
    config.validate()?;
    let (state_tx, _) = watch::channel(StepState::Pending);
    Ok(Self {
      inner: Arc::new(StepInner {
        config,
        clock,
        oracle,
        runtime: Mutex::new(StepRuntime::default()),
        state_tx,
        listener,
      }),
    })
  }

  pub fn name(&self) -> &str {
    &self.inner.config.name
  }

  pub fn config(&self) -> &TaskConfig {
    &self.inner.config
  }

  pub fn state(&self) -> StepState {
    self.inner.runtime.lock().state
  }

  pub fn outcome(&self) -> Option<StepOutcome> {
    self.inner.runtime.lock().outcome
  }

  /// A snapshot of the runtime bookkeeping.
  pub fn runtime(&self) -> StepRuntime {
    self.inner.runtime.lock().clone()
  }

  /// Observes state changes, e.g. to show or hide the step's UI.
  pub fn watch_state(&self) -> watch::Receiver<StepState> {
    self.inner.state_tx.subscribe()
  }

  /// Starts the step.
  ///
  /// Queries the oracle once: if it reports the configured skip state the step
  /// goes straight to `Skipped` without arming anything. Otherwise it becomes
  /// `Active` and arms the timeout timer when one is configured.
  #[instrument(name = "TaskStep::activate", skip_all, fields(task = %self.inner.config.name), err(Display))]
  pub fn activate(&self) -> WaypostResult<StepTransition> {
    let inner = &self.inner;
    // Read before locking: the oracle may inspect this step.
    let current = inner.oracle.current_state();
    let transition = {
      let mut rt = inner.runtime.lock();
      if rt.state != StepState::Pending {
        return Err(WaypostError::invalid_transition(&inner.config.name, "activate", rt.state));
      }

      if inner.config.skip_state.as_ref() == Some(&current) {
        inner.finish(&mut rt, StepState::Skipped, StepOutcome::Skipped);
        event!(Level::INFO, app_state = %current, "Step skipped at activation.");
        StepTransition::Finished(StepOutcome::Skipped)
      } else {
        rt.state = StepState::Active;
        rt.activated_at = Some(inner.clock.now());
        if let Some(timeout) = inner.config.timeout() {
          let armed = inner.arm(&mut rt, timeout, TimerKind::Timeout);
          rt.timeout_timer = Some(armed);
        }
        inner.state_tx.send_replace(StepState::Active);
        event!(Level::DEBUG, app_state = %current, timeout = ?inner.config.timeout(), "Step activated.");
        StepTransition::Activated
      }
    };
    if let StepTransition::Finished(outcome) = transition {
      inner.notify(outcome);
    }
    Ok(transition)
  }

  /// Asks the step to complete. Used by both trigger kinds.
  ///
  /// Honoured immediately once the step has been active for at least
  /// `min_enabled_seconds`; earlier requests are deferred until that instant
  /// and reported as `Deferred`. Repeated early requests re-arm the same wait.
  #[instrument(name = "TaskStep::request_complete", skip_all, fields(task = %self.inner.config.name), err(Display))]
  pub fn request_complete(&self) -> WaypostResult<StepTransition> {
    let inner = &self.inner;
    let transition = {
      let mut rt = inner.runtime.lock();
      if rt.state != StepState::Active {
        return Err(WaypostError::invalid_transition(
          &inner.config.name,
          "request completion",
          rt.state,
        ));
      }
      inner.complete_or_defer(&mut rt)
    };
    if let StepTransition::Finished(outcome) = transition {
      inner.notify(outcome);
    }
    Ok(transition)
  }

  /// Drives an `Auto` step: waits for `predicate`, then requests completion.
  ///
  /// Returns `AlreadyFinished` if the step reaches a terminal state (timeout)
  /// before the predicate holds; the predicate future is dropped in that case.
  #[instrument(name = "TaskStep::run_auto", skip_all, fields(task = %self.inner.config.name), err(Display))]
  pub async fn run_auto(&self, predicate: &dyn CompletionPredicate) -> WaypostResult<StepTransition> {
    let config = &self.inner.config;
    if config.complete_trigger != TriggerKind::Auto {
      return Err(WaypostError::TriggerMismatch {
        task: config.name.clone(),
        expected: TriggerKind::Auto.to_string(),
        actual: config.complete_trigger.to_string(),
      });
    }

    let mut state_rx = self.watch_state();
    {
      let rt = self.inner.runtime.lock();
      match (rt.state, rt.outcome) {
        (StepState::Active, _) => {}
        (_, Some(outcome)) => return Ok(StepTransition::AlreadyFinished(outcome)),
        (state, None) => {
          return Err(WaypostError::invalid_transition(&config.name, "run auto trigger", state));
        }
      }
    }

    tokio::select! {
      met = predicate.wait_until_met() => {
        met.map_err(|source| WaypostError::PredicateFailure { task: config.name.clone(), source })?;
        event!(Level::DEBUG, "Completion predicate met.");
        match self.request_complete() {
          Err(err) if err.is_invalid_transition() => self
            .outcome()
            .map(StepTransition::AlreadyFinished)
            .ok_or(err),
          other => other,
        }
      }
      _ = state_rx.wait_for(|state| state.is_terminal()) => {
        event!(Level::DEBUG, "Step finished before its predicate held.");
        self
          .outcome()
          .map(StepTransition::AlreadyFinished)
          .ok_or_else(|| WaypostError::invalid_transition(&config.name, "run auto trigger", self.state()))
      }
    }
  }
}

impl TaskStep {
  /// Stops the step without an outcome when its sequence is torn down.
  ///
  /// Armed timers are cancelled and the listener is not called. Returns `false`
  /// if the step had already reached a terminal state.
  pub(crate) fn discard(&self) -> bool {
    let inner = &self.inner;
    let mut rt = inner.runtime.lock();
    if rt.state.is_terminal() {
      return false;
    }
    inner.disarm(&mut rt);
    rt.discard();
    inner.state_tx.send_replace(StepState::Discarded);
    event!(Level::DEBUG, task = %inner.config.name, "Step discarded.");
    true
  }
}

impl StepInner {
  fn arm(self: &Arc<Self>, rt: &mut StepRuntime, after: Duration, kind: TimerKind) -> ArmedTimer {
    let token = rt.issue_token();
    let step = Arc::downgrade(self);
    let handle = self.clock.schedule(
      after,
      Box::new(move || match step.upgrade() {
        Some(inner) => inner.on_timer(kind, token),
        None => event!(Level::TRACE, ?kind, "Timer fired for a discarded step."),
      }),
    );
    event!(Level::TRACE, ?kind, ?after, timer_id = handle.id(), "Timer armed.");
    ArmedTimer { handle, token }
  }

  fn disarm(&self, rt: &mut StepRuntime) {
    for armed in [rt.timeout_timer.take(), rt.debounce_timer.take()].into_iter().flatten() {
      self.clock.cancel(armed.handle);
    }
  }

  fn finish(&self, rt: &mut StepRuntime, state: StepState, outcome: StepOutcome) {
    self.disarm(rt);
    rt.finish(state, outcome);
    self.state_tx.send_replace(state);
  }

  /// The completion path shared by direct requests and the debounce timer.
  fn complete_or_defer(self: &Arc<Self>, rt: &mut StepRuntime) -> StepTransition {
    let now = self.clock.now();
    let elapsed = rt
      .activated_at
      .map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
    let min_enabled = self.config.min_enabled();

    if elapsed >= min_enabled {
      let outcome = StepOutcome::Completed { cascade: false };
      self.finish(rt, StepState::Completed, outcome);
      event!(Level::INFO, task = %self.config.name, ?elapsed, "Step completed.");
      return StepTransition::Finished(outcome);
    }

    let remaining = min_enabled - elapsed;
    rt.pending_completion = true;
    if let Some(previous) = rt.debounce_timer.take() {
      self.clock.cancel(previous.handle);
    }
    let armed = self.arm(rt, remaining, TimerKind::Debounce);
    rt.debounce_timer = Some(armed);
    event!(Level::DEBUG, task = %self.config.name, ?elapsed, ?remaining, "Completion deferred until minimum active time.");
    StepTransition::Deferred { remaining }
  }

  fn on_timer(self: &Arc<Self>, kind: TimerKind, token: u64) {
    let outcome = {
      let mut rt = self.runtime.lock();
      let armed = match kind {
        TimerKind::Timeout => rt.timeout_timer,
        TimerKind::Debounce => rt.debounce_timer,
      };
      if rt.state != StepState::Active || armed.map(|a| a.token) != Some(token) {
        event!(Level::TRACE, task = %self.config.name, ?kind, state = %rt.state, "Stale timer fire ignored.");
        return;
      }

      match kind {
        TimerKind::Timeout => {
          rt.timeout_timer = None;
          let outcome = StepOutcome::Completed {
            cascade: self.config.cascades_on_timeout(),
          };
          self.finish(&mut rt, StepState::Completed, outcome);
          event!(Level::INFO, task = %self.config.name, cascade = outcome.cascades(), "Step timed out.");
          outcome
        }
        TimerKind::Debounce => {
          rt.debounce_timer = None;
          match self.complete_or_defer(&mut rt) {
            StepTransition::Finished(outcome) => outcome,
            _ => return,
          }
        }
      }
    };
    self.notify(outcome);
  }

  fn notify(&self, outcome: StepOutcome) {
    if let Some(listener) = &self.listener {
      listener(outcome);
    }
  }
}

impl Drop for StepInner {
  fn drop(&mut self) {
    let rt = self.runtime.get_mut();
    for armed in [rt.timeout_timer.take(), rt.debounce_timer.take()].into_iter().flatten() {
      self.clock.cancel(armed.handle);
    }
  }
}

impl fmt::Debug for TaskStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskStep")
      .field("config", &self.inner.config)
      .field("runtime", &*self.inner.runtime.lock())
      .field("listener_present", &self.inner.listener.is_some())
      .finish()
  }
}
