//! Agent runtime - routes goals to agents and drives their workflows
//!
//! This crate is the async half of relay. `relay-core` owns the pure pieces
//! (registry, classifier, planner, synthesizer); this crate runs them:
//!
//! 1. **Routing** (`runtime`) - classify a goal or accept a pre-resolved agent id
//! 2. **Tool access** (`guardrails`) - compare requested tools with the agent catalog
//! 3. **Execution** (`executor`) - walk the plan with simulated latency and cancellation
//! 4. **Progress** (`progress`) - stream ordered per-step events to the caller
//!
//! # Key Types
//!
//! - `AgentRuntime` - entry point returning a `WorkflowOutcome`
//! - `WorkflowExecutor` - one sequential run per call
//! - `ProgressSink` - pluggable progress consumer; `progress_channel` gives a bounded one

pub mod executor;
pub mod guardrails;
pub mod progress;
pub mod runtime;

pub use executor::{ExecutionError, ExecutorSettings, RunRequest, WorkflowExecutor};
pub use guardrails::{ToolAccessDecision, ToolAccessPolicy};
pub use progress::{
    progress_channel, CallbackProgressSink, ChannelProgressSink, InMemoryProgressSink,
    ProgressError, ProgressEvent, ProgressPhase, ProgressSink, ProgressUpdate,
};
pub use runtime::{AgentRuntime, RunTarget, WorkflowOutcome};
