// waypost/examples/auto_trigger.rs

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use waypost::{FnPredicate, SharedStateOracle, TaskConfig, TokioClock, TutorialSequence};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Auto Trigger Example ---");

  // Coins the player has collected, bumped by some game system.
  let coins = Arc::new(AtomicU32::new(0));
  let collector = coins.clone();
  tokio::spawn(async move {
    for _ in 0..5 {
      tokio::time::sleep(Duration::from_millis(100)).await;
      collector.fetch_add(1, Ordering::SeqCst);
    }
  });

  let tutorial = TutorialSequence::new(
    "collect_coins",
    vec![TaskConfig::new("collect_five").min_enabled_seconds(0.2).timeout_seconds(10.0)],
    Arc::new(TokioClock::current()?),
    Arc::new(SharedStateOracle::new("InGame")),
  )?;
  tutorial.start()?;

  let step = tutorial.active_step().ok_or("step should be active after start")?;
  let watched = coins.clone();
  let enough_coins = FnPredicate::new(move || {
    let watched = watched.clone();
    async move {
      while watched.load(Ordering::SeqCst) < 5 {
        tokio::time::sleep(Duration::from_millis(20)).await;
      }
      Ok::<(), anyhow::Error>(())
    }
  });

  match step.run_auto(&enough_coins).await {
    Ok(transition) => info!(?transition, "Predicate resolved."),
    Err(e) => error!("Auto trigger failed: {}", e),
  }

  let outcome = tutorial.finished().await?;
  info!(?outcome, coins = coins.load(Ordering::SeqCst), "Done.");
  Ok(())
}
