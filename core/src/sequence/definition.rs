// waypost/src/sequence/definition.rs

//! Contains the `TutorialSequence` struct definition, its construction and
//! read-only accessors.

use crate::clock::Clock;
use crate::core::config::TaskConfig;
use crate::core::control::{SequenceOutcome, SequenceStatus, StepOutcome};
use crate::core::oracle::StateOracle;
use crate::error::{WaypostError, WaypostResult};
use crate::step::TaskStep;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Called once when a sequence reaches its final outcome.
pub type FinishListener = Arc<dyn Fn(SequenceOutcome) + Send + Sync + 'static>;

/// One entry of a sequence's history, in the order steps finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
  pub index: usize,
  pub name: String,
  pub outcome: StepOutcome,
}

/// A tutorial: an ordered list of task configs run one step at a time.
///
/// Steps are instantiated lazily when they become current and discarded once
/// they finish. Clones share the same running sequence.
#[derive(Clone)]
pub struct TutorialSequence {
  pub(crate) inner: Arc<SequenceInner>,
}

pub(crate) struct SequenceInner {
  pub(crate) name: String,
  pub(crate) configs: Vec<TaskConfig>,
  pub(crate) clock: Arc<dyn Clock>,
  pub(crate) oracle: Arc<dyn StateOracle>,
  pub(crate) runtime: Mutex<SequenceRuntime>,
  pub(crate) outcome_tx: watch::Sender<Option<SequenceOutcome>>,
  pub(crate) finish_listeners: Mutex<Vec<FinishListener>>,
}

pub(crate) struct SequenceRuntime {
  pub(crate) status: SequenceStatus,
  pub(crate) steps: Vec<Option<TaskStep>>,
  pub(crate) records: Vec<StepRecord>,
  // Signals are applied one at a time by whichever caller holds `pumping`.
  pub(crate) inbox: VecDeque<Signal>,
  pub(crate) pumping: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Signal {
  Activate(usize),
  StepFinished { index: usize, outcome: StepOutcome },
}

impl TutorialSequence {
  /// Creates an idle sequence. Every config is validated up front.
  pub fn new(
    name: impl Into<String>,
    configs: Vec<TaskConfig>,
    clock: Arc<dyn Clock>,
    oracle: Arc<dyn StateOracle>,
  ) -> WaypostResult<Self> {
    let name = name.into();
    if name.trim().is_empty() {
      return Err(WaypostError::InvalidConfig {
        task: name,
        message: "tutorial name must not be empty".to_string(),
      });
    }
    for config in &configs {
      config.validate()?;
    }

    let (outcome_tx, _) = watch::channel(None);
    let steps = configs.iter().map(|_| None).collect();
    Ok(Self {
      inner: Arc::new(SequenceInner {
        name,
        configs,
        clock,
        oracle,
        runtime: Mutex::new(SequenceRuntime {
          status: SequenceStatus::Idle,
          steps,
          records: Vec::new(),
          inbox: VecDeque::new(),
          pumping: false,
        }),
        outcome_tx,
        finish_listeners: Mutex::new(Vec::new()),
      }),
    })
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  pub fn len(&self) -> usize {
    self.inner.configs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.configs.is_empty()
  }

  pub fn configs(&self) -> &[TaskConfig] {
    &self.inner.configs
  }

  pub fn status(&self) -> SequenceStatus {
    self.inner.runtime.lock().status
  }

  pub fn active_index(&self) -> Option<usize> {
    match self.status() {
      SequenceStatus::Running { active } => Some(active),
      _ => None,
    }
  }

  /// The step currently owned by the sequence, if it has been instantiated.
  pub fn active_step(&self) -> Option<TaskStep> {
    let rt = self.inner.runtime.lock();
    match rt.status {
      SequenceStatus::Running { active } => rt.steps.get(active).cloned().flatten(),
      _ => None,
    }
  }

  pub fn outcome(&self) -> Option<SequenceOutcome> {
    match self.status() {
      SequenceStatus::Done(outcome) => Some(outcome),
      _ => None,
    }
  }

  /// Steps that have finished so far, in order.
  pub fn report(&self) -> Vec<StepRecord> {
    self.inner.runtime.lock().records.clone()
  }

  /// Registers a callback for the final outcome. Listeners added after the
  /// sequence finished are not called; use [`TutorialSequence::finished`].
  pub fn on_finished(&self, listener: impl Fn(SequenceOutcome) + Send + Sync + 'static) {
    self.inner.finish_listeners.lock().push(Arc::new(listener));
  }

  /// Resolves with the final outcome, immediately if already finished.
  pub async fn finished(&self) -> WaypostResult<SequenceOutcome> {
    let mut outcome_rx = self.inner.outcome_tx.subscribe();
    let outcome = outcome_rx
      .wait_for(Option::is_some)
      .await
      .map_err(|err| WaypostError::Internal(format!("outcome channel closed: {err}")))?;
    (*outcome).ok_or_else(|| WaypostError::Internal("outcome missing after wait".to_string()))
  }
}

impl fmt::Debug for TutorialSequence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TutorialSequence")
      .field("name", &self.inner.name)
      .field("num_steps", &self.inner.configs.len())
      .field("status", &self.status())
      .finish()
  }
}
