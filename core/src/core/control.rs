// waypost/src/core/control.rs

//! Defines the states and outcomes exchanged between a step, its sequence and the host.

use std::fmt;
use std::time::Duration;

/// Externally observable state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepState {
  #[default]
  Pending,
  Active,
  Completed,
  Skipped,
  /// Torn down with its sequence before reaching an outcome.
  Discarded,
}

impl StepState {
  /// Nothing leaves a terminal state. Only `Completed` and `Skipped` carry an outcome.
  pub const fn is_terminal(self) -> bool {
    matches!(self, StepState::Completed | StepState::Skipped | StepState::Discarded)
  }
}

impl fmt::Display for StepState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

/// Terminal outcome a step reports to its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
  Skipped,
  /// `cascade` asks the sequence to force-finish instead of advancing.
  Completed { cascade: bool },
}

impl StepOutcome {
  pub const fn cascades(self) -> bool {
    matches!(self, StepOutcome::Completed { cascade: true })
  }
}

/// Result of a synchronous step operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTransition {
  /// The step is now `Active`.
  Activated,
  /// Completion was requested inside the minimum-active window and will be
  /// honoured once `remaining` has elapsed.
  Deferred { remaining: Duration },
  /// This call moved the step into a terminal state.
  Finished(StepOutcome),
  /// The step had already reached a terminal state by other means.
  AlreadyFinished(StepOutcome),
}

/// Outcome of a whole tutorial sequence, reported to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
  /// Every step was completed or skipped.
  Finished,
  /// A step timed out with cascade enabled; remaining steps never ran.
  ForceFinished,
  /// The host aborted the sequence.
  Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStatus {
  Idle,
  Running { active: usize },
  Done(SequenceOutcome),
}

impl fmt::Display for SequenceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SequenceStatus::Idle => f.write_str("Idle"),
      SequenceStatus::Running { active } => write!(f, "Running(step {active})"),
      SequenceStatus::Done(outcome) => write!(f, "Done({outcome:?})"),
    }
  }
}
