// waypost/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaypostError {
  /// An operation was attempted from a state that does not accept it.
  /// The runtime is left untouched; the caller decides whether to retry or ignore.
  #[error("Invalid transition for '{subject}': cannot {operation} while {state}")]
  InvalidTransition {
    subject: String,
    operation: &'static str,
    state: String,
  },

  #[error("Invalid configuration for task '{task}': {message}")]
  InvalidConfig { task: String, message: String },

  #[error("Task '{task}' is configured with the {actual} trigger, operation requires {expected}")]
  TriggerMismatch {
    task: String,
    expected: String,
    actual: String,
  },

  #[error("Completion predicate for task '{task}' failed. Source: {source}")]
  PredicateFailure {
    task: String,
    #[source]
    source: AnyhowError,
  },

  #[error("No tutorial registered under '{name}'")]
  NotFound { name: String },

  #[error("A tutorial named '{name}' is already registered")]
  DuplicateName { name: String },

  #[error("Async runtime unavailable: {0}")]
  Runtime(String),

  #[error("Internal waypost error: {0}")]
  Internal(String),
}

impl WaypostError {
  pub(crate) fn invalid_transition(
    subject: impl Into<String>,
    operation: &'static str,
    state: impl std::fmt::Display,
  ) -> Self {
    WaypostError::InvalidTransition {
      subject: subject.into(),
      operation,
      state: state.to_string(),
    }
  }

  /// `true` for the recoverable "wrong state" family of errors.
  pub fn is_invalid_transition(&self) -> bool {
    matches!(self, WaypostError::InvalidTransition { .. })
  }
}

pub type WaypostResult<T, E = WaypostError> = std::result::Result<T, E>;
