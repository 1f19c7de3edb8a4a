use std::sync::Arc;

use relay_core::audit::{AuditCategory, AuditOutcome};
use relay_core::config::{AppConfig, ModelSettings};
use relay_core::optimizer::{model_config, ComplexityLevel, TaskType};
use relay_core::{
    classify_detailed, AgentProfile, AgentRegistry, AgentResult, AuditEvent, AuditSink, Goal,
    ModelConfig, RunId, TracingAuditSink,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::executor::{ExecutionError, ExecutorSettings, RunRequest, WorkflowExecutor};
use crate::guardrails::{ToolAccessDecision, ToolAccessPolicy};
use crate::progress::{progress_channel, ProgressEvent, ProgressSink};

const ACTOR: &str = "agent-runtime";

/// What a caller asks the runtime to work on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunTarget {
    /// Routed through the classifier.
    Goal(Goal),
    /// Already-resolved agent id; may be unknown.
    Agent(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkflowOutcome {
    #[serde(skip)]
    pub run_id: RunId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Sampling parameters chosen for the run; absent when the agent was
    /// never resolved.
    #[serde(skip)]
    pub model: Option<ModelConfig>,
}

impl WorkflowOutcome {
    pub fn completed(run_id: RunId, data: AgentResult) -> Self {
        Self { run_id, success: true, data: Some(data), error: None, model: None }
    }

    pub fn failed(run_id: RunId, error: &ExecutionError) -> Self {
        Self {
            run_id,
            success: false,
            data: None,
            error: Some(error.user_message()),
            model: None,
        }
    }

    pub fn from_result(run_id: RunId, result: Result<AgentResult, ExecutionError>) -> Self {
        match result {
            Ok(data) => Self::completed(run_id, data),
            Err(error) => Self::failed(run_id, &error),
        }
    }

    pub fn with_model(mut self, model: Option<ModelConfig>) -> Self {
        self.model = model;
        self
    }
}

struct ResolvedTarget {
    agent_id: String,
    input: Value,
    complexity: ComplexityLevel,
    tools_needed: Vec<String>,
}

pub struct AgentRuntime {
    executor: WorkflowExecutor,
    guardrails: ToolAccessPolicy,
    audit: Arc<dyn AuditSink>,
    model: ModelSettings,
    progress_buffer: usize,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl AgentRuntime {
    pub fn new(config: &AppConfig) -> Self {
        let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
        Self {
            executor: WorkflowExecutor::new(ExecutorSettings::from(&config.executor))
                .with_audit_sink(audit.clone()),
            guardrails: ToolAccessPolicy::default(),
            audit,
            model: config.model.clone(),
            progress_buffer: config.executor.progress_buffer,
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.executor = self.executor.with_audit_sink(audit.clone());
        self.audit = audit;
        self
    }

    pub fn with_guardrails(mut self, guardrails: ToolAccessPolicy) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.executor = WorkflowExecutor::new(settings).with_audit_sink(self.audit.clone());
        self
    }

    pub fn executor(&self) -> &WorkflowExecutor {
        &self.executor
    }

    pub async fn run_agent_workflow(
        &self,
        target: RunTarget,
        input: Value,
        progress: Option<&dyn ProgressSink>,
    ) -> WorkflowOutcome {
        self.run_agent_workflow_with_cancel(target, input, progress, &CancellationToken::new())
            .await
    }

    pub async fn run_agent_workflow_with_cancel(
        &self,
        target: RunTarget,
        input: Value,
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> WorkflowOutcome {
        let run_id = RunId::generate();
        let resolved = self.resolve(&run_id, target, input);

        info!(
            event_name = "run.started",
            run_id = %run_id,
            agent_id = %resolved.agent_id,
            complexity = resolved.complexity.as_str(),
            "agent run started"
        );
        self.audit.emit(
            self.audit_event(&run_id, "run.started", AuditCategory::Run, AuditOutcome::Success)
                .with_metadata("agent", resolved.agent_id.clone()),
        );

        let mut model = None;
        if let Ok(profile) = AgentRegistry::global().lookup(&resolved.agent_id) {
            if let Err(error) = self.check_tools(&run_id, profile, &resolved.tools_needed) {
                return WorkflowOutcome::failed(run_id, &error);
            }
            model = Some(self.select_model(&run_id, profile, resolved.complexity));
        }

        let request = RunRequest {
            run_id: run_id.clone(),
            agent_id: resolved.agent_id,
            input: resolved.input,
        };
        let result = self.executor.execute(request, progress, cancel).await;
        WorkflowOutcome::from_result(run_id, result).with_model(model)
    }

    /// Spawns the run and hands back its progress stream. The run fails if the
    /// receiver is dropped before the run finishes.
    pub fn run_with_channel(
        self: Arc<Self>,
        target: RunTarget,
        input: Value,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<ProgressEvent>, JoinHandle<WorkflowOutcome>) {
        let (sink, receiver) = progress_channel(self.progress_buffer);
        let handle = tokio::spawn(async move {
            self.run_agent_workflow_with_cancel(target, input, Some(&sink), &cancel).await
        });
        (receiver, handle)
    }

    fn resolve(&self, run_id: &RunId, target: RunTarget, input: Value) -> ResolvedTarget {
        match target {
            RunTarget::Goal(goal) => {
                let classification = classify_detailed(&goal);
                info!(
                    event_name = "run.classified",
                    run_id = %run_id,
                    agent = classification.variant.as_str(),
                    matched_on = classification.matched_on.as_str(),
                    "goal classified"
                );
                self.audit.emit(
                    self.audit_event(
                        run_id,
                        "run.classified",
                        AuditCategory::Classification,
                        AuditOutcome::Success,
                    )
                    .with_metadata("agent", classification.variant.as_str())
                    .with_metadata("matched_on", classification.matched_on.as_str()),
                );

                let input = if input.is_null() {
                    serde_json::to_value(&goal).unwrap_or(Value::Null)
                } else {
                    input
                };
                ResolvedTarget {
                    agent_id: classification.variant.as_str().to_string(),
                    input,
                    complexity: ComplexityLevel::assess(&goal),
                    tools_needed: goal.tools_needed,
                }
            }
            RunTarget::Agent(agent_id) => ResolvedTarget {
                agent_id,
                input,
                complexity: self.model.default_complexity,
                tools_needed: Vec::new(),
            },
        }
    }

    fn check_tools(
        &self,
        run_id: &RunId,
        profile: &AgentProfile,
        tools_needed: &[String],
    ) -> Result<(), ExecutionError> {
        let decision = self.guardrails.evaluate(profile, tools_needed);
        match decision {
            ToolAccessDecision::Allow => Ok(()),
            ToolAccessDecision::Degrade { reason_code, user_message, unsupported_tools } => {
                warn!(
                    event_name = "run.tools_degraded",
                    run_id = %run_id,
                    agent = profile.id(),
                    reason_code,
                    unsupported = %unsupported_tools.join(","),
                    "{user_message}"
                );
                self.audit.emit(
                    self.audit_event(
                        run_id,
                        "guardrail.degraded",
                        AuditCategory::Guardrail,
                        AuditOutcome::Success,
                    )
                    .with_metadata("reason_code", reason_code)
                    .with_metadata("unsupported_tools", unsupported_tools.join(",")),
                );
                Ok(())
            }
            ToolAccessDecision::Deny { reason_code, user_message, unsupported_tools } => {
                warn!(
                    event_name = "run.tools_denied",
                    run_id = %run_id,
                    agent = profile.id(),
                    reason_code,
                    "{user_message}"
                );
                self.audit.emit(
                    self.audit_event(
                        run_id,
                        "guardrail.denied",
                        AuditCategory::Guardrail,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("reason_code", reason_code)
                    .with_metadata("unsupported_tools", unsupported_tools.join(",")),
                );
                Err(ExecutionError::ToolAccessDenied(user_message))
            }
        }
    }

    fn select_model(
        &self,
        run_id: &RunId,
        profile: &AgentProfile,
        complexity: ComplexityLevel,
    ) -> ModelConfig {
        let task = TaskType::from(profile.variant);
        let config = model_config(&self.model.base_model, task, complexity);
        info!(
            event_name = "run.model_selected",
            run_id = %run_id,
            model = %config.model,
            temperature = config.temperature,
            max_tokens = config.max_tokens,
            reasoning_steps = config.reasoning_steps,
            "model configuration attached"
        );
        self.audit.emit(
            self.audit_event(
                run_id,
                "run.model_selected",
                AuditCategory::Model,
                AuditOutcome::Success,
            )
            .with_metadata("model", config.model.clone())
            .with_metadata("complexity", complexity.as_str())
            .with_metadata("max_tokens", config.max_tokens.to_string()),
        );
        config
    }

    fn audit_event(
        &self,
        run_id: &RunId,
        event_type: &str,
        category: AuditCategory,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        AuditEvent::new(run_id.clone(), run_id.to_string(), event_type, category, ACTOR, outcome)
    }
}
