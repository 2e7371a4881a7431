// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use waypost::{
  Clock, ManualClock, OutcomeListener, SequenceOutcome, SharedStateOracle, StateOracle, StepOutcome, TaskConfig,
  TaskStep, TriggerKind, TutorialSequence,
};

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::TRACE)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn secs(seconds: f64) -> Duration {
  Duration::from_secs_f64(seconds)
}

// --- Test environment: a virtual clock and an updatable oracle ---
pub struct Env {
  pub clock: Arc<ManualClock>,
  pub oracle: SharedStateOracle,
}

impl Env {
  pub fn new() -> Self {
    Self {
      clock: Arc::new(ManualClock::new()),
      oracle: SharedStateOracle::new("Menu"),
    }
  }

  pub fn clock(&self) -> Arc<dyn Clock> {
    self.clock.clone()
  }

  pub fn oracle(&self) -> Arc<dyn StateOracle> {
    Arc::new(self.oracle.clone())
  }

  pub fn step(&self, config: TaskConfig) -> TaskStep {
    TaskStep::new(config, self.clock(), self.oracle()).expect("valid config")
  }

  pub fn recorded_step(&self, config: TaskConfig) -> (TaskStep, OutcomeLog) {
    let log = OutcomeLog::default();
    let step = TaskStep::with_listener(config, self.clock(), self.oracle(), log.listener()).expect("valid config");
    (step, log)
  }

  pub fn sequence(&self, name: &str, configs: Vec<TaskConfig>) -> (TutorialSequence, FinishLog) {
    let sequence = TutorialSequence::new(name, configs, self.clock(), self.oracle()).expect("valid configs");
    let log = FinishLog::default();
    let sink = log.0.clone();
    sequence.on_finished(move |outcome| sink.lock().push(outcome));
    (sequence, log)
  }

  pub fn advance(&self, seconds: f64) {
    self.clock.advance(secs(seconds));
  }
}

// --- Outcome recorders ---
#[derive(Clone, Default)]
pub struct OutcomeLog(pub Arc<Mutex<Vec<StepOutcome>>>);

impl OutcomeLog {
  pub fn listener(&self) -> OutcomeListener {
    let sink = self.0.clone();
    Arc::new(move |outcome| sink.lock().push(outcome))
  }

  pub fn outcomes(&self) -> Vec<StepOutcome> {
    self.0.lock().clone()
  }
}

#[derive(Clone, Default)]
pub struct FinishLog(pub Arc<Mutex<Vec<SequenceOutcome>>>);

impl FinishLog {
  pub fn outcomes(&self) -> Vec<SequenceOutcome> {
    self.0.lock().clone()
  }
}

// --- Common configs ---

/// Manual step, 5s timeout that cascades, 2s minimum active time.
pub fn debounced_cascading_task(name: &str) -> TaskConfig {
  TaskConfig::new(name)
    .trigger(TriggerKind::Manual)
    .timeout_seconds(5.0)
    .complete_tutorial_if_timeout(true)
    .min_enabled_seconds(2.0)
}

pub fn manual_task(name: &str) -> TaskConfig {
  TaskConfig::new(name).trigger(TriggerKind::Manual)
}
