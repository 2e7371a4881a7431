pub mod config;
pub mod control;
pub mod oracle;
pub mod predicate;

// Re-export key types for easier access from other waypost modules (and lib.rs)
pub use config::{TaskConfig, TriggerKind};
pub use control::{SequenceOutcome, SequenceStatus, StepOutcome, StepState, StepTransition};
pub use oracle::{SharedStateOracle, StateOracle, StateTag};
pub use predicate::{CompletionPredicate, FnPredicate};
