// waypost/src/step/runtime.rs

//! Mutable per-activation bookkeeping of a step.

use crate::clock::{Timestamp, TimerHandle};
use crate::core::control::{StepOutcome, StepState};

/// A timer the step armed, tagged with the token its callback carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArmedTimer {
  pub(crate) handle: TimerHandle,
  pub(crate) token: u64,
}

/// Runtime state of one step.
///
/// Invariants maintained by `TaskStep`:
///  - the timeout timer is armed iff `state == Active` and the config has a timeout;
///  - `activated_at` is set only while `Active`;
///  - `pending_completion` is only ever `true` while `Active`;
///  - `outcome` is set iff the state is `Completed` or `Skipped`.
#[derive(Debug, Clone, Default)]
pub struct StepRuntime {
  pub(crate) state: StepState,
  pub(crate) activated_at: Option<Timestamp>,
  pub(crate) pending_completion: bool,
  pub(crate) timeout_timer: Option<ArmedTimer>,
  pub(crate) debounce_timer: Option<ArmedTimer>,
  pub(crate) outcome: Option<StepOutcome>,
  pub(crate) next_token: u64,
}

impl StepRuntime {
  pub fn state(&self) -> StepState {
    self.state
  }

  pub fn activated_at(&self) -> Option<Timestamp> {
    self.activated_at
  }

  pub fn pending_completion(&self) -> bool {
    self.pending_completion
  }

  pub fn timeout_timer(&self) -> Option<TimerHandle> {
    self.timeout_timer.map(|armed| armed.handle)
  }

  pub fn debounce_timer(&self) -> Option<TimerHandle> {
    self.debounce_timer.map(|armed| armed.handle)
  }

  pub fn outcome(&self) -> Option<StepOutcome> {
    self.outcome
  }

  pub(crate) fn issue_token(&mut self) -> u64 {
    self.next_token += 1;
    self.next_token
  }

  /// Moves into a terminal state, clearing every piece of active-only bookkeeping.
  /// Timers must already have been taken by the caller.
  pub(crate) fn finish(&mut self, state: StepState, outcome: StepOutcome) {
    debug_assert!(state.is_terminal());
    self.state = state;
    self.activated_at = None;
    self.pending_completion = false;
    self.outcome = Some(outcome);
  }

  pub(crate) fn discard(&mut self) {
    self.state = StepState::Discarded;
    self.activated_at = None;
    self.pending_completion = false;
  }
}
