pub mod audit;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod errors;
pub mod optimizer;
pub mod planner;
pub mod registry;
pub mod runs;
pub mod synthesizer;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use classifier::{classify, classify_detailed, Classification, MatchedOn};
pub use domain::agent::{AgentProfile, AgentVariant};
pub use domain::goal::Goal;
pub use domain::result::{AgentDetails, AgentResult};
pub use errors::RegistryError;
pub use optimizer::{ComplexityLevel, ModelConfig, PromptAugmentation, TaskType};
pub use planner::{plan, WorkflowStep};
pub use registry::AgentRegistry;
pub use runs::{ExecutionRun, RunEvent, RunId, RunState};
pub use synthesizer::{synthesize, SynthesisError};
