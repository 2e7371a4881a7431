// waypost/examples/basic_tutorial.rs

use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use waypost::{SequenceOutcome, SharedStateOracle, TaskConfig, TokioClock, TriggerKind, TutorialSequence, WaypostError};

#[tokio::main]
async fn main() -> Result<(), WaypostError> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Tutorial Example ---");

  // 1. The application's current screen, updated by the host.
  let screen = SharedStateOracle::new("Menu");

  // 2. Three manual steps. The first stays visible for at least 1s even if
  //    the player reacts immediately.
  let configs = vec![
    TaskConfig::new("open_map")
      .trigger(TriggerKind::Manual)
      .min_enabled_seconds(1.0),
    // Skipped when the player is already in game by the time it would show.
    TaskConfig::new("press_play")
      .trigger(TriggerKind::Manual)
      .skip_state("InGame"),
    TaskConfig::new("jump").trigger(TriggerKind::Manual),
  ];

  let clock = Arc::new(TokioClock::current()?);
  let tutorial = TutorialSequence::new("first_run", configs, clock, Arc::new(screen.clone()))?;
  tutorial.on_finished(|outcome| info!(?outcome, "Tutorial finished callback."));

  // 3. Run it.
  tutorial.start()?;
  info!(status = %tutorial.status(), "Started.");

  // The player opens the map straight away: the request is held back.
  let transition = tutorial.request_complete()?;
  info!(?transition, "open_map requested.");

  // Meanwhile they found the play button on their own.
  screen.set("InGame");
  tokio::time::sleep(Duration::from_millis(1100)).await;
  info!(status = %tutorial.status(), "After the debounce.");

  tutorial.request_complete()?; // jump
  let outcome = tutorial.finished().await?;

  // 4. Inspect the results
  for record in tutorial.report() {
    info!("- {} #{}: {:?}", record.name, record.index, record.outcome);
  }
  assert_eq!(outcome, SequenceOutcome::Finished);
  Ok(())
}
