// waypost/src/registry.rs

//! Defines `TutorialRegistry`, a name-keyed store of tutorial sequences.

use crate::core::control::SequenceStatus;
use crate::error::{WaypostError, WaypostResult};
use crate::sequence::TutorialSequence;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::{event, instrument, Level};

/// Holds every tutorial an application knows about, so hosts can start or
/// abort them by name.
#[derive(Default)]
pub struct TutorialRegistry {
  tutorials: Mutex<BTreeMap<String, TutorialSequence>>,
}

impl TutorialRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `sequence` under its own name.
  pub fn register(&self, sequence: TutorialSequence) -> WaypostResult<()> {
    let mut tutorials = self.tutorials.lock();
    let name = sequence.name().to_string();
    if tutorials.contains_key(&name) {
      return Err(WaypostError::DuplicateName { name });
    }
    event!(Level::DEBUG, tutorial = %name, num_steps = sequence.len(), "Registering tutorial.");
    tutorials.insert(name, sequence);
    Ok(())
  }

  pub fn get(&self, name: &str) -> WaypostResult<TutorialSequence> {
    self
      .tutorials
      .lock()
      .get(name)
      .cloned()
      .ok_or_else(|| WaypostError::NotFound { name: name.to_string() })
  }

  /// Starts the named tutorial. The registry lock is not held while it starts.
  #[instrument(name = "TutorialRegistry::start", skip(self), err(Display))]
  pub fn start(&self, name: &str) -> WaypostResult<TutorialSequence> {
    let sequence = self.get(name)?;
    sequence.start()?;
    Ok(sequence)
  }

  /// Aborts every running tutorial, returning how many were aborted.
  pub fn abort_all(&self) -> usize {
    let running: Vec<TutorialSequence> = self
      .tutorials
      .lock()
      .values()
      .filter(|sequence| matches!(sequence.status(), SequenceStatus::Running { .. }))
      .cloned()
      .collect();

    let mut aborted = 0;
    for sequence in running {
      match sequence.abort() {
        Ok(()) => aborted += 1,
        // Finished between the scan and the abort.
        Err(err) => event!(Level::DEBUG, tutorial = %sequence.name(), error = %err, "Tutorial not aborted."),
      }
    }
    aborted
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<String> {
    self.tutorials.lock().keys().cloned().collect()
  }

  pub fn running(&self) -> Vec<String> {
    self
      .tutorials
      .lock()
      .values()
      .filter(|sequence| matches!(sequence.status(), SequenceStatus::Running { .. }))
      .map(|sequence| sequence.name().to_string())
      .collect()
  }
}
