use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::agent::AgentVariant;
use crate::runs::states::{RunEvent, RunState, TransitionOutcome};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RunTransitionError {
    #[error("invalid run transition from {from:?} using event {event:?}")]
    InvalidTransition { from: RunState, event: RunEvent },
}

/// One in-flight invocation of an agent workflow.
///
/// A run is owned by exactly one executor call. Its step index only moves
/// forward, and once a terminal state is reached every further event is
/// rejected.
#[derive(Clone, Debug)]
pub struct ExecutionRun {
    pub id: RunId,
    pub variant: AgentVariant,
    pub input: Value,
    pub started_at: DateTime<Utc>,
    step_count: usize,
    state: RunState,
}

impl ExecutionRun {
    pub fn new(variant: AgentVariant, input: Value, step_count: usize) -> Self {
        Self::with_id(RunId::generate(), variant, input, step_count)
    }

    pub fn with_id(id: RunId, variant: AgentVariant, input: Value, step_count: usize) -> Self {
        Self { id, variant, input, started_at: Utc::now(), step_count, state: RunState::Initializing }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn apply(&mut self, event: RunEvent) -> Result<TransitionOutcome, RunTransitionError> {
        let outcome = transition(&self.state, event, self.step_count)?;
        self.state = outcome.to.clone();
        Ok(outcome)
    }

    pub fn apply_with_audit<S>(
        &mut self,
        event: RunEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, RunTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(event);
        match &result {
            Ok(outcome) if outcome.to.is_terminal() => {
                let (event_type, audit_outcome) = match outcome.to {
                    RunState::Completed => ("run.completed", AuditOutcome::Success),
                    RunState::Cancelled => ("run.cancelled", AuditOutcome::Rejected),
                    _ => ("run.failed", AuditOutcome::Failed),
                };
                sink.emit(
                    AuditEvent::new(
                        audit.run_id.clone(),
                        audit.correlation_id.clone(),
                        event_type,
                        AuditCategory::Run,
                        audit.actor.clone(),
                        audit_outcome,
                    )
                    .with_metadata("agent", self.variant.as_str())
                    .with_metadata("from", outcome.from.as_str()),
                );
            }
            Ok(_) => {}
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.run_id.clone(),
                        audit.correlation_id.clone(),
                        "run.transition_rejected",
                        AuditCategory::Run,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

fn transition(
    current: &RunState,
    event: RunEvent,
    step_count: usize,
) -> Result<TransitionOutcome, RunTransitionError> {
    use RunEvent::{Cancel, Fail, Initialized, StepFinished};
    use RunState::{Cancelled, Completed, Failed, Initializing, Running};

    let to = match (current, &event) {
        (Initializing, Initialized) if step_count == 0 => Completed,
        (Initializing, Initialized) => Running { step_index: 0 },
        (Running { step_index }, StepFinished) if step_index + 1 < step_count => {
            Running { step_index: step_index + 1 }
        }
        (Running { .. }, StepFinished) => Completed,
        (Initializing | Running { .. }, Fail) => Failed,
        (Initializing | Running { .. }, Cancel) => Cancelled,
        _ => {
            return Err(RunTransitionError::InvalidTransition { from: current.clone(), event });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::agent::AgentVariant;
    use crate::runs::engine::{ExecutionRun, RunId, RunTransitionError};
    use crate::runs::states::{RunEvent, RunState};

    fn run(step_count: usize) -> ExecutionRun {
        ExecutionRun::with_id(RunId("run-1".to_owned()), AgentVariant::Sdr, json!({}), step_count)
    }

    #[test]
    fn happy_path_walks_every_step_in_order() {
        let mut run = run(3);
        let mut seen = Vec::new();

        run.apply(RunEvent::Initialized).expect("initializing -> running");
        while let RunState::Running { step_index } = run.state().clone() {
            seen.push(step_index);
            run.apply(RunEvent::StepFinished).expect("step advances");
        }

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(run.state(), &RunState::Completed);
    }

    #[test]
    fn empty_plan_completes_right_after_initialization() {
        let mut run = run(0);
        let outcome = run.apply(RunEvent::Initialized).expect("initialize");
        assert_eq!(outcome.to, RunState::Completed);
    }

    #[test]
    fn terminal_states_reject_further_events() {
        let mut run = run(2);
        run.apply(RunEvent::Initialized).expect("initialize");
        run.apply(RunEvent::Fail).expect("running -> failed");

        let error = run.apply(RunEvent::StepFinished).expect_err("failed is terminal");
        assert!(matches!(
            error,
            RunTransitionError::InvalidTransition { from: RunState::Failed, event: RunEvent::StepFinished }
        ));
        assert_eq!(run.state(), &RunState::Failed);
    }

    #[test]
    fn step_finished_before_initialization_is_rejected() {
        let mut run = run(2);
        assert!(run.apply(RunEvent::StepFinished).is_err());
        assert_eq!(run.state(), &RunState::Initializing);
    }

    #[test]
    fn cancel_is_allowed_from_any_live_state() {
        let mut waiting = run(2);
        assert_eq!(waiting.apply(RunEvent::Cancel).expect("cancel").to, RunState::Cancelled);

        let mut running = run(2);
        running.apply(RunEvent::Initialized).expect("initialize");
        assert_eq!(running.apply(RunEvent::Cancel).expect("cancel").to, RunState::Cancelled);
    }

    #[test]
    fn terminal_transition_emits_audit_event() {
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(RunId("run-9".to_owned()), "req-9", "executor");
        let mut run = run(1);

        run.apply_with_audit(RunEvent::Initialized, &sink, &audit).expect("initialize");
        run.apply_with_audit(RunEvent::StepFinished, &sink, &audit).expect("complete");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "run.completed");
        assert_eq!(events[0].metadata.get("agent").map(String::as_str), Some("sdr"));
    }

    #[test]
    fn rejected_transition_is_audited() {
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(RunId("run-10".to_owned()), "req-10", "executor");
        let mut run = run(1);

        let _ = run.apply_with_audit(RunEvent::StepFinished, &sink, &audit);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "run.transition_rejected");
    }
}
