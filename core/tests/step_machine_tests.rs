// tests/step_machine_tests.rs
mod common;

use common::*;
use parking_lot::Mutex;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use waypost::{StateTag, StepOutcome, StepState, StepTransition, TaskConfig, TaskStep, Timestamp, WaypostError};

#[test]
#[serial]
fn test_debounced_completion_waits_for_min_enabled_and_cancels_timeout() {
  setup_tracing();
  let env = Env::new();
  let (step, log) = env.recorded_step(debounced_cascading_task("open_inventory"));

  assert_eq!(step.activate().unwrap(), StepTransition::Activated);
  let timeout_timer = step.runtime().timeout_timer().expect("timeout armed");
  assert_eq!(step.runtime().activated_at(), Some(Timestamp::ZERO));

  env.advance(1.0);
  assert_eq!(
    step.request_complete().unwrap(),
    StepTransition::Deferred { remaining: secs(1.0) }
  );
  assert_eq!(step.state(), StepState::Active);
  assert!(step.runtime().pending_completion());
  assert!(log.outcomes().is_empty());

  env.clock.advance(Duration::from_millis(999));
  assert_eq!(step.state(), StepState::Active);

  env.clock.advance(Duration::from_millis(1));
  assert_eq!(step.state(), StepState::Completed);
  assert_eq!(log.outcomes(), vec![StepOutcome::Completed { cascade: false }]);
  assert!(!env.clock.is_pending(timeout_timer));
  assert_eq!(env.clock.pending_timers(), 0);

  let runtime = step.runtime();
  assert!(!runtime.pending_completion());
  assert_eq!(runtime.activated_at(), None);
  assert_eq!(runtime.timeout_timer(), None);
  assert_eq!(runtime.debounce_timer(), None);

  // The cancelled timeout never fires later.
  env.advance(10.0);
  assert_eq!(log.outcomes().len(), 1);
}

#[test]
#[serial]
fn test_timeout_completes_with_cascade_flag() {
  setup_tracing();
  let env = Env::new();
  let (step, log) = env.recorded_step(debounced_cascading_task("open_inventory"));
  step.activate().unwrap();

  env.clock.advance(Duration::from_millis(4_999));
  assert_eq!(step.state(), StepState::Active);

  env.clock.advance(Duration::from_millis(1));
  assert_eq!(step.state(), StepState::Completed);
  assert_eq!(step.outcome(), Some(StepOutcome::Completed { cascade: true }));
  assert_eq!(log.outcomes(), vec![StepOutcome::Completed { cascade: true }]);
  assert_eq!(step.runtime().timeout_timer(), None);
}

#[test]
#[serial]
fn test_timeout_without_cascade_flag_reports_plain_completion() {
  setup_tracing();
  let env = Env::new();
  let (step, log) = env.recorded_step(manual_task("tap_button").timeout_seconds(3.0));
  step.activate().unwrap();

  env.advance(3.0);
  assert_eq!(log.outcomes(), vec![StepOutcome::Completed { cascade: false }]);
}

#[test]
#[serial]
fn test_zero_timeout_never_self_completes() {
  setup_tracing();
  let env = Env::new();
  let (step, log) = env.recorded_step(manual_task("read_dialog").complete_tutorial_if_timeout(true));
  step.activate().unwrap();
  assert_eq!(step.runtime().timeout_timer(), None);
  assert_eq!(env.clock.pending_timers(), 0);

  env.advance(86_400.0);
  assert_eq!(step.state(), StepState::Active);
  assert!(log.outcomes().is_empty());

  assert_eq!(
    step.request_complete().unwrap(),
    StepTransition::Finished(StepOutcome::Completed { cascade: false })
  );
}

#[test]
#[serial]
fn test_completion_after_min_enabled_is_immediate() {
  setup_tracing();
  let env = Env::new();
  let (step, log) = env.recorded_step(manual_task("swipe").min_enabled_seconds(2.0));
  step.activate().unwrap();

  env.advance(2.5);
  assert_eq!(
    step.request_complete().unwrap(),
    StepTransition::Finished(StepOutcome::Completed { cascade: false })
  );
  assert_eq!(log.outcomes().len(), 1);
  assert_eq!(env.clock.pending_timers(), 0);
}

#[test]
#[serial]
fn test_min_enabled_holds_for_any_early_request() {
  setup_tracing();
  for request_at in [0.0, 0.25, 1.0, 2.5] {
    let env = Env::new();
    let (step, log) = env.recorded_step(manual_task("hold").min_enabled_seconds(3.0));
    step.activate().unwrap();

    env.advance(request_at);
    assert!(matches!(step.request_complete().unwrap(), StepTransition::Deferred { .. }));

    env.clock.advance_to(Timestamp::from_origin(secs(3.0) - Duration::from_nanos(1)));
    assert_eq!(step.state(), StepState::Active, "request at {request_at}s");

    env.clock.advance_to(Timestamp::from_origin(secs(3.0)));
    assert_eq!(step.state(), StepState::Completed, "request at {request_at}s");
    assert_eq!(log.outcomes(), vec![StepOutcome::Completed { cascade: false }]);
  }
}

#[test]
#[serial]
fn test_repeated_early_requests_keep_a_single_debounce_wait() {
  setup_tracing();
  let env = Env::new();
  let (step, log) = env.recorded_step(manual_task("double_tap").min_enabled_seconds(2.0));
  step.activate().unwrap();

  env.advance(0.5);
  assert_eq!(
    step.request_complete().unwrap(),
    StepTransition::Deferred { remaining: secs(1.5) }
  );
  let first_wait = step.runtime().debounce_timer().unwrap();

  env.advance(1.0);
  assert_eq!(
    step.request_complete().unwrap(),
    StepTransition::Deferred { remaining: secs(0.5) }
  );
  assert!(!env.clock.is_pending(first_wait));
  assert_eq!(env.clock.pending_timers(), 1);

  env.advance(0.5);
  assert_eq!(log.outcomes(), vec![StepOutcome::Completed { cascade: false }]);
}

#[test]
#[serial]
fn test_timeout_beats_pending_debounce() {
  setup_tracing();
  let env = Env::new();
  let config = manual_task("slow")
    .timeout_seconds(3.0)
    .complete_tutorial_if_timeout(true)
    .min_enabled_seconds(10.0);
  let (step, log) = env.recorded_step(config);
  step.activate().unwrap();

  env.advance(1.0);
  assert!(matches!(step.request_complete().unwrap(), StepTransition::Deferred { .. }));
  assert_eq!(env.clock.pending_timers(), 2);

  env.advance(2.0);
  assert_eq!(log.outcomes(), vec![StepOutcome::Completed { cascade: true }]);
  assert!(!step.runtime().pending_completion());
  assert_eq!(env.clock.pending_timers(), 0);

  env.advance(20.0);
  assert_eq!(log.outcomes().len(), 1);
}

#[test]
#[serial]
fn test_skip_state_matches_at_activation() {
  setup_tracing();
  let env = Env::new();
  env.oracle.set("InGame");
  let (step, log) = env.recorded_step(debounced_cascading_task("menu_hint").skip_state("InGame"));

  assert_eq!(
    step.activate().unwrap(),
    StepTransition::Finished(StepOutcome::Skipped)
  );
  assert_eq!(step.state(), StepState::Skipped);
  assert_eq!(step.runtime().activated_at(), None);
  assert_eq!(env.clock.pending_timers(), 0);
  assert_eq!(log.outcomes(), vec![StepOutcome::Skipped]);

  let err = step.request_complete().unwrap_err();
  assert!(err.is_invalid_transition());
}

#[test]
#[serial]
fn test_skip_state_is_not_reevaluated_after_activation() {
  setup_tracing();
  let env = Env::new();
  let (step, log) = env.recorded_step(manual_task("menu_hint").skip_state("InGame"));
  step.activate().unwrap();

  env.oracle.set("InGame");
  env.advance(100.0);
  assert_eq!(step.state(), StepState::Active);
  assert!(log.outcomes().is_empty());
}

#[test]
#[serial]
fn test_invalid_transitions_leave_runtime_untouched() {
  setup_tracing();
  let env = Env::new();
  let step = env.step(manual_task("guarded").timeout_seconds(5.0));

  match step.request_complete() {
    Err(WaypostError::InvalidTransition { subject, operation, state }) => {
      assert_eq!(subject, "guarded");
      assert_eq!(operation, "request completion");
      assert_eq!(state, "Pending");
    }
    other => panic!("Expected InvalidTransition, got {:?}", other),
  }
  assert_eq!(step.state(), StepState::Pending);

  step.activate().unwrap();
  let before = step.runtime();
  assert!(step.activate().unwrap_err().is_invalid_transition());
  let after = step.runtime();
  assert_eq!(before.state(), after.state());
  assert_eq!(before.timeout_timer(), after.timeout_timer());
  assert_eq!(before.activated_at(), after.activated_at());

  step.request_complete().unwrap();
  assert!(step.activate().unwrap_err().is_invalid_transition());
  assert!(step.request_complete().unwrap_err().is_invalid_transition());
  assert_eq!(step.outcome(), Some(StepOutcome::Completed { cascade: false }));
}

#[test]
#[serial]
fn test_invalid_config_is_rejected_at_construction() {
  setup_tracing();
  let env = Env::new();
  let result = waypost::TaskStep::new(
    TaskConfig::new("broken").timeout_seconds(-1.0),
    env.clock(),
    env.oracle(),
  );
  assert!(matches!(result, Err(WaypostError::InvalidConfig { .. })));
}

#[test]
#[serial]
fn test_dropping_a_step_cancels_its_timers() {
  setup_tracing();
  let env = Env::new();
  let step = env.step(manual_task("discarded").timeout_seconds(5.0).min_enabled_seconds(2.0));
  step.activate().unwrap();
  step.request_complete().unwrap();
  assert_eq!(env.clock.pending_timers(), 2);

  drop(step);
  assert_eq!(env.clock.pending_timers(), 0);
  env.advance(10.0);
}

#[test]
#[serial]
fn test_watch_state_follows_transitions() {
  setup_tracing();
  let env = Env::new();
  let step = env.step(manual_task("watched").timeout_seconds(1.0));
  let states = step.watch_state();
  assert_eq!(*states.borrow(), StepState::Pending);

  step.activate().unwrap();
  assert_eq!(*states.borrow(), StepState::Active);

  env.advance(1.0);
  assert_eq!(*states.borrow(), StepState::Completed);
}

#[test]
#[serial]
fn test_oracle_may_inspect_the_step_it_activates() {
  setup_tracing();
  let env = Env::new();
  let slot: Arc<Mutex<Option<TaskStep>>> = Arc::new(Mutex::new(None));
  let observed = slot.clone();
  let oracle = Arc::new(move || {
    let state = observed.lock().as_ref().map(|step| step.state());
    assert_eq!(state, Some(StepState::Pending));
    StateTag::from("Menu")
  });

  let step = TaskStep::new(manual_task("self_aware"), env.clock(), oracle).unwrap();
  *slot.lock() = Some(step.clone());
  assert_eq!(step.activate().unwrap(), StepTransition::Activated);
  assert_eq!(step.state(), StepState::Active);
  slot.lock().take();
}
