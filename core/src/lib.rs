// src/lib.rs

//! Waypost: a race-free runtime for tutorial and onboarding steps.
//!
//! A tutorial is an ordered sequence of tasks. Each task:
//!  - is skipped outright when the application is in its configured skip state
//!    at the moment it would start;
//!  - completes when its trigger fires (an automatic predicate or an explicit
//!    host call), but never before it has been visible for a minimum time;
//!  - can be force-completed by a timeout, optionally ending the whole tutorial.
//!
//! Completion requests, timeout timers and debounce timers may arrive in any
//! order and from any thread; each step resolves them to exactly one terminal
//! transition.

pub mod clock;
pub mod core;
pub mod error;
pub mod registry;
pub mod sequence;
pub mod step;

// --- Re-exports for the Public API ---

pub use crate::clock::{Clock, ManualClock, TimerCallback, TimerHandle, Timestamp, TokioClock};
pub use crate::core::config::{TaskConfig, TriggerKind};
pub use crate::core::control::{SequenceOutcome, SequenceStatus, StepOutcome, StepState, StepTransition};
pub use crate::core::oracle::{SharedStateOracle, StateOracle, StateTag};
pub use crate::core::predicate::{CompletionPredicate, FnPredicate};

pub use crate::step::{OutcomeListener, StepRuntime, TaskStep};
pub use crate::sequence::{FinishListener, StepRecord, TutorialSequence};

pub use crate::error::{WaypostError, WaypostResult};

pub use crate::registry::TutorialRegistry;

/*
    Typical host loop:
    1. Build `TaskConfig`s for each step of the tutorial.
    2. Pick a clock (`TokioClock::current()?` in an async app, `ManualClock` when the
       host drives time itself, e.g. once per frame).
    3. Provide a `StateOracle` (a `SharedStateOracle` the app updates, or a closure).
    4. `TutorialSequence::new(name, configs, clock, oracle)?` and `start()`.
    5. Call `request_complete()` on the sequence (or `run_auto` on its active step)
       when the player does what the step asks.
    6. React to `on_finished` / `finished().await`: `Finished`, `ForceFinished`, `Aborted`.
*/
