// waypost/src/sequence/execution.rs

//! Drives a `TutorialSequence`: starting, advancing on step outcomes, aborting.
//!
//! The controller never calls into a step while holding its own lock. Every
//! state change is expressed as a `Signal`, queued, and applied by a single
//! pumping caller; step operations triggered by a signal run after the lock is
//! released. Outcomes a step reports while the pump is busy (for instance a
//! step skipping itself during activation) are simply queued behind it.

use crate::core::control::{SequenceOutcome, SequenceStatus, StepOutcome, StepTransition};
use crate::error::{WaypostError, WaypostResult};
use crate::sequence::definition::{SequenceInner, SequenceRuntime, Signal, StepRecord, TutorialSequence};
use crate::step::{OutcomeListener, TaskStep};
use std::sync::Arc;
use tracing::{event, instrument, Level};

enum Action {
  Activate(TaskStep),
  Publish(SequenceOutcome),
  Nothing,
}

impl TutorialSequence {
  /// Activates the first step (and any eligible successors of skipped ones).
  ///
  /// An empty sequence finishes immediately with `Finished`.
  #[instrument(
        name = "TutorialSequence::start",
        skip_all,
        fields(tutorial = %self.inner.name, num_steps = self.inner.configs.len()),
        err(Display)
    )]
  pub fn start(&self) -> WaypostResult<()> {
    let inner = &self.inner;
    let empty = {
      let mut rt = inner.runtime.lock();
      if rt.status != SequenceStatus::Idle {
        return Err(WaypostError::invalid_transition(&inner.name, "start", rt.status));
      }
      if inner.configs.is_empty() {
        rt.status = SequenceStatus::Done(SequenceOutcome::Finished);
        true
      } else {
        rt.status = SequenceStatus::Running { active: 0 };
        false
      }
    };

    if empty {
      event!(Level::INFO, "Empty tutorial finished on start.");
      inner.publish(SequenceOutcome::Finished);
    } else {
      event!(Level::DEBUG, "Tutorial starting.");
      inner.enqueue(Signal::Activate(0));
    }
    Ok(())
  }

  /// Forwards a completion request to the active step.
  #[instrument(name = "TutorialSequence::request_complete", skip_all, fields(tutorial = %self.inner.name), err(Display))]
  pub fn request_complete(&self) -> WaypostResult<StepTransition> {
    let step = {
      let rt = self.inner.runtime.lock();
      match rt.status {
        SequenceStatus::Running { active } => rt.steps.get(active).cloned().flatten().ok_or_else(|| {
          WaypostError::invalid_transition(&self.inner.name, "request completion", "activating a step")
        })?,
        status => {
          return Err(WaypostError::invalid_transition(
            &self.inner.name,
            "request completion",
            status,
          ))
        }
      }
    };
    step.request_complete()
  }

  /// Ends the tutorial with `Aborted`, discarding the active step and its timers.
  #[instrument(name = "TutorialSequence::abort", skip_all, fields(tutorial = %self.inner.name), err(Display))]
  pub fn abort(&self) -> WaypostResult<()> {
    let inner = &self.inner;
    let discarded = {
      let mut rt = inner.runtime.lock();
      if let SequenceStatus::Done(_) = rt.status {
        return Err(WaypostError::invalid_transition(&inner.name, "abort", rt.status));
      }
      rt.status = SequenceStatus::Done(SequenceOutcome::Aborted);
      rt.inbox.clear();
      std::mem::take(&mut rt.steps)
    };
    // Outside the lock. Hosts may still hold clones, so each step is stopped explicitly.
    for step in discarded.iter().flatten() {
      step.discard();
    }

    event!(Level::INFO, "Tutorial aborted.");
    inner.publish(SequenceOutcome::Aborted);
    Ok(())
  }
}

impl SequenceInner {
  fn listener_for(self: &Arc<Self>, index: usize) -> OutcomeListener {
    let sequence = Arc::downgrade(self);
    Arc::new(move |outcome| {
      if let Some(sequence) = sequence.upgrade() {
        sequence.enqueue(Signal::StepFinished { index, outcome });
      }
    })
  }

  pub(crate) fn enqueue(self: &Arc<Self>, signal: Signal) {
    let claimed = {
      let mut rt = self.runtime.lock();
      rt.inbox.push_back(signal);
      !std::mem::replace(&mut rt.pumping, true)
    };
    if claimed {
      self.pump();
    }
  }

  fn pump(self: &Arc<Self>) {
    loop {
      let action = {
        let mut rt = self.runtime.lock();
        match rt.inbox.pop_front() {
          Some(signal) => self.apply(&mut rt, signal),
          None => {
            rt.pumping = false;
            return;
          }
        }
      };

      match action {
        Action::Activate(step) => match step.activate() {
          Ok(StepTransition::Activated) => {
            event!(Level::DEBUG, tutorial = %self.name, task = %step.name(), "Step is now active.");
          }
          Ok(_) => {}
          Err(err) if err.is_invalid_transition() => {
            // Discarded by an abort that raced this activation.
            event!(Level::DEBUG, tutorial = %self.name, task = %step.name(), error = %err, "Step not activated.");
          }
          Err(err) => {
            event!(Level::ERROR, tutorial = %self.name, task = %step.name(), error = %err, "Failed to activate step.");
          }
        },
        Action::Publish(outcome) => self.publish(outcome),
        Action::Nothing => {}
      }
    }
  }

  fn apply(self: &Arc<Self>, rt: &mut SequenceRuntime, signal: Signal) -> Action {
    match signal {
      Signal::Activate(index) => {
        if rt.status != (SequenceStatus::Running { active: index }) {
          event!(Level::TRACE, tutorial = %self.name, index, "Activation signal no longer current.");
          return Action::Nothing;
        }
        let config = self.configs[index].clone();
        match TaskStep::with_listener(config, self.clock.clone(), self.oracle.clone(), self.listener_for(index)) {
          Ok(step) => {
            rt.steps[index] = Some(step.clone());
            Action::Activate(step)
          }
          Err(err) => {
            event!(Level::ERROR, tutorial = %self.name, index, error = %err, "Could not instantiate step.");
            rt.status = SequenceStatus::Done(SequenceOutcome::Aborted);
            Action::Publish(SequenceOutcome::Aborted)
          }
        }
      }
      Signal::StepFinished { index, outcome } => {
        if rt.status != (SequenceStatus::Running { active: index }) {
          event!(Level::TRACE, tutorial = %self.name, index, ?outcome, "Outcome from a step that is no longer current.");
          return Action::Nothing;
        }
        self.advance(rt, index, outcome)
      }
    }
  }

  fn advance(&self, rt: &mut SequenceRuntime, index: usize, outcome: StepOutcome) -> Action {
    let name = self.configs[index].name.clone();
    event!(Level::INFO, tutorial = %self.name, task = %name, index, ?outcome, "Step finished.");
    rt.records.push(StepRecord { index, name, outcome });
    rt.steps[index] = None;

    if outcome.cascades() {
      rt.status = SequenceStatus::Done(SequenceOutcome::ForceFinished);
      return Action::Publish(SequenceOutcome::ForceFinished);
    }

    let next = index + 1;
    if next < self.configs.len() {
      rt.status = SequenceStatus::Running { active: next };
      rt.inbox.push_back(Signal::Activate(next));
      Action::Nothing
    } else {
      rt.status = SequenceStatus::Done(SequenceOutcome::Finished);
      Action::Publish(SequenceOutcome::Finished)
    }
  }

  pub(crate) fn publish(&self, outcome: SequenceOutcome) {
    event!(Level::INFO, tutorial = %self.name, ?outcome, "Tutorial finished.");
    self.outcome_tx.send_replace(Some(outcome));
    let listeners = self.finish_listeners.lock().clone();
    for listener in listeners {
      listener(outcome);
    }
  }
}
