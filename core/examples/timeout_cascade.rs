// waypost/examples/timeout_cascade.rs

use std::sync::Arc;
use tracing::{info, warn};
use waypost::{SequenceOutcome, StateTag, TaskConfig, TokioClock, TriggerKind, TutorialSequence, WaypostError};

#[tokio::main]
async fn main() -> Result<(), WaypostError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();
  info!("--- Timeout Cascade Example ---");

  // Scenario 1: a plain timeout just moves the tutorial along.
  info!("\nScenario 1: timeout advances");
  let outcome = run(false).await?;
  assert_eq!(outcome, SequenceOutcome::Finished);

  // Scenario 2: a cascading timeout ends the whole tutorial.
  info!("\nScenario 2: timeout force-finishes");
  let outcome = run(true).await?;
  assert_eq!(outcome, SequenceOutcome::ForceFinished);
  Ok(())
}

async fn run(cascade: bool) -> Result<SequenceOutcome, WaypostError> {
  let configs = vec![
    TaskConfig::new("idle_hint")
      .trigger(TriggerKind::Manual)
      .timeout_seconds(0.5)
      .complete_tutorial_if_timeout(cascade),
    TaskConfig::new("follow_up").trigger(TriggerKind::Manual).timeout_seconds(0.5),
  ];

  // A closure works as a state oracle too.
  let oracle = Arc::new(|| StateTag::from("Menu"));
  let tutorial = TutorialSequence::new("idle", configs, Arc::new(TokioClock::current()?), oracle)?;
  tutorial.start()?;

  // Nobody touches anything; both steps are left to their timers.
  let outcome = tutorial.finished().await?;
  match outcome {
    SequenceOutcome::ForceFinished => warn!(report = ?tutorial.report(), "Tutorial force-finished by a timeout."),
    _ => info!(report = ?tutorial.report(), "Tutorial finished."),
  }
  Ok(outcome)
}
