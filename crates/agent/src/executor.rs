//! Sequential workflow execution.
//!
//! A run walks `Initializing -> Running(0..N-1) -> Completed`, emitting one
//! progress event per step (plus an occasional "Processing..." sub-update)
//! and sleeping a jittered delay between steps. Any sink, synthesis or
//! state error fails the run; cancellation is checked before every step and
//! raced against every wait.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relay_core::audit::{AuditContext, AuditSink, TracingAuditSink};
use relay_core::config::{ExecutorConfig, PROCESSING_UPDATE_PROBABILITY};
use relay_core::planner::{plan, WorkflowStep};
use relay_core::runs::{ExecutionRun, RunEvent, RunId, RunTransitionError};
use relay_core::synthesizer::{synthesize, SynthesisError};
use relay_core::{AgentProfile, AgentRegistry, AgentResult, AgentVariant, RegistryError};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::progress::{ProgressError, ProgressEvent, ProgressPhase, ProgressSink, ProgressUpdate};

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error(transparent)]
    UnknownAgent(#[from] RegistryError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Transition(#[from] RunTransitionError),
    #[error("{0}")]
    ToolAccessDenied(String),
    #[error("Run cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Log event that closes a run ending in this error.
    pub fn terminal_event_name(&self) -> &'static str {
        match self {
            Self::Cancelled => "run.cancelled",
            _ => "run.failed",
        }
    }

    /// Text surfaced to callers as the outcome `error`.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutorSettings {
    pub init_pause: Duration,
    pub step_delay_min: Duration,
    pub step_delay_max: Duration,
    pub processing_probability: f64,
    pub processing_pause: Duration,
    pub seed: Option<u64>,
    pub announce_plan: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from(&ExecutorConfig::default())
    }
}

impl From<&ExecutorConfig> for ExecutorSettings {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            init_pause: Duration::from_millis(config.init_pause_ms),
            step_delay_min: Duration::from_millis(config.step_delay_min_ms),
            step_delay_max: Duration::from_millis(config.step_delay_max_ms),
            processing_probability: config.processing_probability,
            processing_pause: Duration::from_millis(config.processing_pause_ms),
            seed: config.seed,
            announce_plan: config.announce_plan,
        }
    }
}

impl ExecutorSettings {
    /// No simulated latency; useful for tests and batch callers.
    pub fn immediate() -> Self {
        Self::default().without_latency()
    }

    /// Zeroes every pause and keeps the rest of the settings.
    pub fn without_latency(self) -> Self {
        Self {
            init_pause: Duration::ZERO,
            step_delay_min: Duration::ZERO,
            step_delay_max: Duration::ZERO,
            processing_pause: Duration::ZERO,
            ..self
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_processing_probability(mut self, probability: f64) -> Self {
        self.processing_probability = probability;
        self
    }

    fn processing_probability(&self) -> f64 {
        if (0.0..=1.0).contains(&self.processing_probability) {
            self.processing_probability
        } else {
            PROCESSING_UPDATE_PROBABILITY
        }
    }

    /// Jittered delay inside the base window, capped by the step's nominal
    /// duration when that falls inside the window.
    fn step_delay<R>(&self, step: &WorkflowStep, rng: &mut R) -> Duration
    where
        R: Rng + ?Sized,
    {
        let low = self.step_delay_min.as_millis() as u64;
        let high = (self.step_delay_max.as_millis() as u64).max(low);
        let cap = (step.nominal_duration.as_millis() as u64).clamp(low, high);
        Duration::from_millis(rng.gen_range(low..=cap))
    }
}

#[derive(Clone, Debug)]
pub struct RunRequest {
    pub run_id: RunId,
    pub agent_id: String,
    pub input: Value,
}

impl RunRequest {
    pub fn new(agent_id: impl Into<String>, input: Value) -> Self {
        Self { run_id: RunId::generate(), agent_id: agent_id.into(), input }
    }
}

pub struct WorkflowExecutor {
    settings: ExecutorSettings,
    registry: &'static AgentRegistry,
    audit: Arc<dyn AuditSink>,
}

impl Default for WorkflowExecutor {
    fn default() -> Self {
        Self::new(ExecutorSettings::default())
    }
}

impl WorkflowExecutor {
    pub fn new(settings: ExecutorSettings) -> Self {
        Self { settings, registry: AgentRegistry::global(), audit: Arc::new(TracingAuditSink) }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub async fn execute(
        &self,
        request: RunRequest,
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<AgentResult, ExecutionError> {
        let profile = match self.registry.lookup(&request.agent_id) {
            Ok(profile) => profile,
            Err(error) => {
                warn!(
                    event_name = "run.agent_not_found",
                    run_id = %request.run_id,
                    agent_id = %request.agent_id,
                    "agent id is not registered"
                );
                return Err(error.into());
            }
        };

        let steps = plan(profile.variant);
        let mut run =
            ExecutionRun::with_id(request.run_id, profile.variant, request.input, steps.len());
        let audit = AuditContext::new(run.id.clone(), run.id.to_string(), "workflow-executor");
        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut reporter = Reporter::new(progress, run.id.clone(), profile.variant);

        let outcome = self.drive(&mut run, profile, &steps, &mut reporter, &mut rng, cancel).await;

        match outcome {
            Ok(result) => {
                info!(
                    event_name = "run.completed",
                    run_id = %run.id,
                    agent = profile.id(),
                    execution_time_ms = result.execution_time,
                    "agent run completed"
                );
                Ok(result)
            }
            Err(error) => {
                let event = match error {
                    ExecutionError::Cancelled => RunEvent::Cancel,
                    _ => RunEvent::Fail,
                };
                if !run.state().is_terminal() {
                    let _ = run.apply_with_audit(event, self.audit.as_ref(), &audit);
                }
                let event_name = error.terminal_event_name();
                if error == ExecutionError::Cancelled {
                    info!(
                        event_name,
                        run_id = %run.id,
                        agent = profile.id(),
                        state = run.state().as_str(),
                        "agent run cancelled"
                    );
                } else {
                    warn!(
                        event_name,
                        run_id = %run.id,
                        agent = profile.id(),
                        state = run.state().as_str(),
                        error = %error,
                        "agent run did not complete"
                    );
                }
                Err(error)
            }
        }
    }

    async fn drive(
        &self,
        run: &mut ExecutionRun,
        profile: &AgentProfile,
        steps: &[WorkflowStep],
        reporter: &mut Reporter<'_>,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<AgentResult, ExecutionError> {
        let audit = AuditContext::new(run.id.clone(), run.id.to_string(), "workflow-executor");

        if self.settings.announce_plan {
            let labels = steps.iter().map(|step| step.label.to_string()).collect();
            reporter.emit(ProgressPhase::Planned, None, ProgressUpdate::Steps(labels)).await?;
        }

        reporter
            .emit(
                ProgressPhase::Initializing,
                None,
                ProgressUpdate::Text(format!("Initializing {}...", profile.name)),
            )
            .await?;
        pause(self.settings.init_pause, cancel).await?;
        run.apply_with_audit(RunEvent::Initialized, self.audit.as_ref(), &audit)?;

        let processing_probability = self.settings.processing_probability();
        for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled);
            }

            debug!(run_id = %run.id, step_index = index, step = step.label, "running step");
            reporter
                .emit(ProgressPhase::Step, Some(index), ProgressUpdate::Text(step.label.to_string()))
                .await?;
            pause(self.settings.step_delay(step, rng), cancel).await?;

            if rng.gen_bool(processing_probability) {
                reporter
                    .emit(
                        ProgressPhase::Processing,
                        Some(index),
                        ProgressUpdate::Text(format!("{} - Processing...", step.label)),
                    )
                    .await?;
                pause(self.settings.processing_pause, cancel).await?;
            }

            if index + 1 < steps.len() {
                run.apply_with_audit(RunEvent::StepFinished, self.audit.as_ref(), &audit)?;
            }
        }

        reporter
            .emit(
                ProgressPhase::Completed,
                steps.len().checked_sub(1),
                ProgressUpdate::Text(format!("{} completed successfully", profile.name)),
            )
            .await?;
        let result = synthesize(profile, &run.input, rng)?;

        if run.state().step_index().is_some() {
            run.apply_with_audit(RunEvent::StepFinished, self.audit.as_ref(), &audit)?;
        }
        Ok(result)
    }
}

struct Reporter<'a> {
    sink: Option<&'a dyn ProgressSink>,
    run_id: RunId,
    agent: AgentVariant,
    sequence: usize,
}

impl<'a> Reporter<'a> {
    fn new(sink: Option<&'a dyn ProgressSink>, run_id: RunId, agent: AgentVariant) -> Self {
        Self { sink, run_id, agent, sequence: 0 }
    }

    async fn emit(
        &mut self,
        phase: ProgressPhase,
        step_index: Option<usize>,
        update: ProgressUpdate,
    ) -> Result<(), ProgressError> {
        let Some(sink) = self.sink else {
            return Ok(());
        };

        let event = ProgressEvent {
            run_id: self.run_id.clone(),
            agent: self.agent,
            sequence: self.sequence,
            phase,
            step_index,
            update,
        };
        self.sequence += 1;
        sink.report(event).await
    }
}

async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), ExecutionError> {
    if duration.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
            _ = tokio::time::sleep(duration) => {}
        }
    }

    if cancel.is_cancelled() {
        return Err(ExecutionError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use relay_core::audit::InMemoryAuditSink;
    use relay_core::config::ExecutorConfig;
    use relay_core::planner::{plan, PLAN_LENGTH};
    use relay_core::runs::RunId;
    use relay_core::{AgentDetails, AgentVariant};
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use super::{ExecutionError, ExecutorSettings, RunRequest, WorkflowExecutor};
    use crate::progress::{
        CallbackProgressSink, InMemoryProgressSink, ProgressError, ProgressEvent, ProgressPhase,
        ProgressUpdate,
    };

    fn executor(probability: f64) -> WorkflowExecutor {
        WorkflowExecutor::new(
            ExecutorSettings::immediate().with_seed(11).with_processing_probability(probability),
        )
    }

    #[tokio::test]
    async fn run_reports_every_step_in_plan_order() {
        let sink = InMemoryProgressSink::default();
        let result = executor(0.0)
            .execute(RunRequest::new("sdr", json!({})), Some(&sink), &CancellationToken::new())
            .await
            .expect("sdr run succeeds");

        let mut expected = vec!["Initializing SDR Agent...".to_string()];
        expected.extend(plan(AgentVariant::Sdr).iter().map(|step| step.label.to_string()));
        expected.push("SDR Agent completed successfully".to_string());

        assert_eq!(sink.messages(), expected);
        assert!(matches!(result.details, AgentDetails::Sdr(_)));
    }

    #[tokio::test]
    async fn processing_updates_follow_their_step() {
        let sink = InMemoryProgressSink::default();
        executor(1.0)
            .execute(RunRequest::new("email", json!({})), Some(&sink), &CancellationToken::new())
            .await
            .expect("email run succeeds");

        let events = sink.events();
        let processing: Vec<&ProgressEvent> =
            events.iter().filter(|event| event.phase == ProgressPhase::Processing).collect();
        assert_eq!(processing.len(), PLAN_LENGTH);

        for window in events.windows(2) {
            if window[1].phase == ProgressPhase::Processing {
                assert_eq!(window[0].phase, ProgressPhase::Step);
                assert_eq!(window[0].step_index, window[1].step_index);
                let label = window[0].update.as_text().expect("step text");
                assert_eq!(
                    window[1].update.as_text(),
                    Some(format!("{label} - Processing...").as_str())
                );
            }
        }
    }

    #[tokio::test]
    async fn step_indices_never_decrease_and_cover_the_plan() {
        let sink = InMemoryProgressSink::default();
        WorkflowExecutor::new(ExecutorSettings::immediate())
            .execute(RunRequest::new("analysis", json!({})), Some(&sink), &CancellationToken::new())
            .await
            .expect("analysis run succeeds");

        let events = sink.events();
        let indices: Vec<usize> = events.iter().filter_map(|event| event.step_index).collect();
        assert!(indices.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(events.len() >= PLAN_LENGTH);

        let sequences: Vec<usize> = events.iter().map(|event| event.sequence).collect();
        assert_eq!(sequences, (0..events.len()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn unknown_agent_fails_without_progress() {
        let sink = InMemoryProgressSink::default();
        let error = executor(0.3)
            .execute(RunRequest::new("ghost", json!({})), Some(&sink), &CancellationToken::new())
            .await
            .expect_err("ghost is not registered");

        assert_eq!(error.user_message(), "Agent ghost not found");
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn sink_failure_fails_the_run_with_its_message() {
        let audit = InMemoryAuditSink::default();
        let sink = CallbackProgressSink::new(|event: &ProgressEvent| {
            if event.step_index == Some(2) {
                Err(ProgressError::Rejected("progress consumer crashed".to_owned()))
            } else {
                Ok(())
            }
        });

        let error = executor(0.0)
            .with_audit_sink(Arc::new(audit.clone()))
            .execute(RunRequest::new("content", json!({})), Some(&sink), &CancellationToken::new())
            .await
            .expect_err("sink error is fatal");

        assert_eq!(error.user_message(), "progress consumer crashed");
        let events = audit.events();
        assert_eq!(events.last().map(|event| event.event_type.as_str()), Some("run.failed"));
    }

    #[tokio::test]
    async fn empty_error_text_becomes_unknown_error() {
        let sink =
            CallbackProgressSink::new(|_: &ProgressEvent| Err(ProgressError::Rejected(String::new())));

        let error = executor(0.0)
            .execute(RunRequest::new("planning", json!({})), Some(&sink), &CancellationToken::new())
            .await
            .expect_err("sink rejects everything");

        assert_eq!(error.user_message(), "Unknown error");
    }

    #[tokio::test]
    async fn null_input_fails_during_synthesis() {
        let error = executor(0.0)
            .execute(
                RunRequest::new("research", serde_json::Value::Null),
                None,
                &CancellationToken::new(),
            )
            .await
            .expect_err("input is required");

        assert!(matches!(error, ExecutionError::Synthesis(_)));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_first_step() {
        let sink = InMemoryProgressSink::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = executor(0.0)
            .execute(RunRequest::new("calendar", json!({})), Some(&sink), &cancel)
            .await
            .expect_err("cancelled");

        assert_eq!(error, ExecutionError::Cancelled);
        assert_eq!(error.user_message(), "Run cancelled");
        assert_eq!(error.terminal_event_name(), "run.cancelled");
        assert!(sink.events().iter().all(|event| event.phase == ProgressPhase::Initializing));
    }

    #[test]
    fn only_cancellation_closes_as_cancelled() {
        let failure = ExecutionError::ToolAccessDenied("no".to_owned());
        assert_eq!(failure.terminal_event_name(), "run.failed");
        assert_eq!(ExecutionError::Cancelled.terminal_event_name(), "run.cancelled");
    }

    #[test]
    fn dropping_latency_keeps_configured_behavior() {
        let config = ExecutorConfig {
            processing_probability: 0.0,
            seed: Some(4),
            announce_plan: true,
            ..ExecutorConfig::default()
        };
        let settings = ExecutorSettings::from(&config).without_latency();

        assert_eq!(settings.processing_probability, 0.0);
        assert_eq!(settings.seed, Some(4));
        assert!(settings.announce_plan);
        assert_eq!(settings.init_pause, Duration::ZERO);
        assert_eq!(settings.step_delay_max, Duration::ZERO);
        assert_eq!(settings.processing_pause, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_pending_wait() {
        let cancel = CancellationToken::new();
        let sink = InMemoryProgressSink::default();
        let executor = WorkflowExecutor::new(ExecutorSettings::default().with_seed(5));

        let trigger = cancel.clone();
        let canceller = async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            trigger.cancel();
        };
        let (outcome, ()) = tokio::join!(
            executor.execute(RunRequest::new("automation", json!({})), Some(&sink), &cancel),
            canceller
        );

        assert_eq!(outcome.expect_err("run was cancelled"), ExecutionError::Cancelled);
        let completed =
            sink.events().iter().any(|event| event.phase == ProgressPhase::Completed);
        assert!(!completed);
    }

    #[tokio::test(start_paused = true)]
    async fn default_timing_runs_through_with_paused_clock() {
        let sink = InMemoryProgressSink::default();
        let started = tokio::time::Instant::now();
        let result = WorkflowExecutor::new(ExecutorSettings::default().with_seed(21))
            .execute(RunRequest::new("execution", json!({})), Some(&sink), &CancellationToken::new())
            .await
            .expect("execution run succeeds");

        // seven steps of at least one second each, plus the init pause
        assert!(started.elapsed() >= Duration::from_millis(7_500));
        assert!(matches!(result.details, AgentDetails::Execution(_)));
    }

    #[tokio::test]
    async fn announced_plan_is_sent_as_structured_steps() {
        let sink = InMemoryProgressSink::default();
        let settings = ExecutorSettings { announce_plan: true, ..ExecutorSettings::immediate() };
        WorkflowExecutor::new(settings)
            .execute(RunRequest::new("sdr", json!({})), Some(&sink), &CancellationToken::new())
            .await
            .expect("sdr run succeeds");

        let first = sink.events().into_iter().next().expect("at least one event");
        assert_eq!(first.phase, ProgressPhase::Planned);
        assert!(matches!(first.update, ProgressUpdate::Steps(ref labels) if labels.len() == PLAN_LENGTH));
    }

    #[test]
    fn step_delay_stays_inside_the_window() {
        let settings = ExecutorSettings::default();
        let mut rng = StdRng::seed_from_u64(1);
        for variant in AgentVariant::ALL {
            for step in plan(variant) {
                let delay = settings.step_delay(&step, &mut rng);
                assert!(delay >= Duration::from_millis(1_000));
                assert!(delay <= Duration::from_millis(3_000));
                assert!(delay <= step.nominal_duration.max(Duration::from_millis(1_000)));
            }
        }
    }

    #[tokio::test]
    async fn seeded_runs_are_reproducible() {
        let first = executor(0.3)
            .execute(
                RunRequest { run_id: RunId("a".to_owned()), ..RunRequest::new("email", json!({})) },
                None,
                &CancellationToken::new(),
            )
            .await
            .expect("first");
        let second = executor(0.3)
            .execute(
                RunRequest { run_id: RunId("b".to_owned()), ..RunRequest::new("email", json!({})) },
                None,
                &CancellationToken::new(),
            )
            .await
            .expect("second");

        assert_eq!(first, second);
    }
}
