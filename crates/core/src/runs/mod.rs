pub mod engine;
pub mod states;

pub use engine::{ExecutionRun, RunId, RunTransitionError};
pub use states::{RunEvent, RunState, TransitionOutcome};
