// waypost/src/sequence/mod.rs

//! The sequence controller: owns an ordered list of steps, keeps at most one of
//! them active, and turns each step's terminal outcome into "advance" or
//! "force-finish the whole tutorial".

pub mod definition;
pub mod execution;

pub use definition::{FinishListener, StepRecord, TutorialSequence};
