pub mod machine;
pub mod runtime;

pub use machine::{OutcomeListener, TaskStep};
pub use runtime::StepRuntime;
