// waypost/src/core/oracle.rs

//! The state oracle: a read-only view of the application's current high-level state,
//! consulted once per step activation to decide whether the step is skipped.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Opaque tag naming an application state (e.g. `"InGame"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateTag(String);

impl StateTag {
  pub fn new(tag: impl Into<String>) -> Self {
    StateTag(tag.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for StateTag {
  fn from(tag: &str) -> Self {
    StateTag(tag.to_string())
  }
}

impl From<String> for StateTag {
  fn from(tag: String) -> Self {
    StateTag(tag)
  }
}

impl fmt::Display for StateTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Source of the application's current state. Must be a pure read.
pub trait StateOracle: Send + Sync {
  fn current_state(&self) -> StateTag;
}

impl<F> StateOracle for F
where
  F: Fn() -> StateTag + Send + Sync,
{
  fn current_state(&self) -> StateTag {
    self()
  }
}

/// An oracle whose state the host updates in place.
///
/// Clones share the same underlying tag. The lock is only held for the
/// duration of a read or a swap.
#[derive(Debug, Clone)]
pub struct SharedStateOracle(Arc<RwLock<StateTag>>);

impl SharedStateOracle {
  pub fn new(initial: impl Into<StateTag>) -> Self {
    SharedStateOracle(Arc::new(RwLock::new(initial.into())))
  }

  /// Replaces the current state, returning the previous one.
  pub fn set(&self, tag: impl Into<StateTag>) -> StateTag {
    std::mem::replace(&mut *self.0.write(), tag.into())
  }

  pub fn get(&self) -> StateTag {
    self.0.read().clone()
  }
}

impl StateOracle for SharedStateOracle {
  fn current_state(&self) -> StateTag {
    self.get()
  }
}
