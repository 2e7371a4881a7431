// waypost/src/core/config.rs

//! Defines `TaskConfig`, the immutable parameter record of a single tutorial step.

use crate::core::oracle::StateTag;
use crate::error::{WaypostError, WaypostResult};
use std::fmt;
use std::time::Duration;

/// How a step decides that it is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerKind {
  /// The step completes itself once its own predicate holds.
  #[default]
  Auto,
  /// An external caller must invoke completion.
  Manual,
}

impl fmt::Display for TriggerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TriggerKind::Auto => f.write_str("Auto"),
      TriggerKind::Manual => f.write_str("Manual"),
    }
  }
}

/// Configuration of one tutorial step, supplied as plain data.
///
/// Built fluently and checked with [`TaskConfig::validate`]; steps and sequences
/// refuse to be constructed from an invalid record.
///
/// ```
/// use waypost::{TaskConfig, TriggerKind};
///
/// let config = TaskConfig::new("open_inventory")
///   .trigger(TriggerKind::Manual)
///   .timeout_seconds(5.0)
///   .complete_tutorial_if_timeout(true)
///   .min_enabled_seconds(2.0);
/// assert!(config.validate().is_ok());
/// assert!(config.cascades_on_timeout());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
  pub name: String,
  /// When the oracle reports this tag at activation, the step is skipped.
  pub skip_state: Option<StateTag>,
  pub complete_trigger: TriggerKind,
  /// `0` means "no timeout".
  pub timeout_seconds: f64,
  /// Only meaningful when `timeout_seconds > 0`.
  pub complete_tutorial_if_timeout: bool,
  /// Minimum time the step stays active before a completion is honoured.
  pub min_enabled_seconds: f64,
}

impl TaskConfig {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      skip_state: None,
      complete_trigger: TriggerKind::Auto,
      timeout_seconds: 0.0,
      complete_tutorial_if_timeout: false,
      min_enabled_seconds: 0.0,
    }
  }

  pub fn skip_state(mut self, tag: impl Into<StateTag>) -> Self {
    self.skip_state = Some(tag.into());
    self
  }

  pub fn trigger(mut self, trigger: TriggerKind) -> Self {
    self.complete_trigger = trigger;
    self
  }

  pub fn timeout_seconds(mut self, seconds: f64) -> Self {
    self.timeout_seconds = seconds;
    self
  }

  pub fn complete_tutorial_if_timeout(mut self, cascade: bool) -> Self {
    self.complete_tutorial_if_timeout = cascade;
    self
  }

  pub fn min_enabled_seconds(mut self, seconds: f64) -> Self {
    self.min_enabled_seconds = seconds;
    self
  }

  /// Rejects empty names and negative or non-finite durations.
  pub fn validate(&self) -> WaypostResult<()> {
    if self.name.trim().is_empty() {
      return Err(WaypostError::InvalidConfig {
        task: self.name.clone(),
        message: "task name must not be empty".to_string(),
      });
    }
    check_seconds(&self.name, "timeout_seconds", self.timeout_seconds)?;
    check_seconds(&self.name, "min_enabled_seconds", self.min_enabled_seconds)?;
    Ok(())
  }

  /// The timeout window, or `None` when the step never times out.
  pub fn timeout(&self) -> Option<Duration> {
    if self.timeout_seconds > 0.0 {
      Duration::try_from_secs_f64(self.timeout_seconds).ok()
    } else {
      None
    }
  }

  pub fn min_enabled(&self) -> Duration {
    Duration::try_from_secs_f64(self.min_enabled_seconds).unwrap_or_default()
  }

  /// Whether a timeout of this step force-finishes the whole tutorial.
  pub fn cascades_on_timeout(&self) -> bool {
    self.complete_tutorial_if_timeout && self.timeout().is_some()
  }
}

fn check_seconds(task: &str, field: &str, value: f64) -> WaypostResult<()> {
  if !value.is_finite() || value < 0.0 {
    return Err(WaypostError::InvalidConfig {
      task: task.to_string(),
      message: format!("{field} must be a finite value >= 0, got {value}"),
    });
  }
  // Reject values that fit f64 but overflow Duration.
  if Duration::try_from_secs_f64(value).is_err() {
    return Err(WaypostError::InvalidConfig {
      task: task.to_string(),
      message: format!("{field} is out of range: {value}"),
    });
  }
  Ok(())
}
