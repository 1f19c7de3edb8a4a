use std::time::Duration;

use serde::Serialize;

use crate::domain::agent::AgentVariant;

pub const INITIALIZATION_STEP_COUNT: usize = 3;
pub const AGENT_STEP_COUNT: usize = 4;
pub const PLAN_LENGTH: usize = INITIALIZATION_STEP_COUNT + AGENT_STEP_COUNT;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkflowStep {
    pub label: &'static str,
    /// Upper bound for the simulated latency of this step, not a schedule.
    #[serde(rename = "nominal_duration_ms", serialize_with = "serialize_millis")]
    pub nominal_duration: Duration,
}

impl WorkflowStep {
    const fn new(label: &'static str, millis: u64) -> Self {
        Self { label, nominal_duration: Duration::from_millis(millis) }
    }
}

const INITIALIZATION_STEPS: [WorkflowStep; INITIALIZATION_STEP_COUNT] = [
    WorkflowStep::new("Analyzing input parameters", 1_000),
    WorkflowStep::new("Initializing agent capabilities", 1_500),
    WorkflowStep::new("Connecting to required tools", 1_200),
];

/// Builds the ordered step sequence for a variant: the fixed initialization
/// prefix followed by the four variant-specific steps.
pub fn plan(variant: AgentVariant) -> Vec<WorkflowStep> {
    let mut steps = Vec::with_capacity(PLAN_LENGTH);
    steps.extend_from_slice(&INITIALIZATION_STEPS);
    steps.extend_from_slice(&agent_steps(variant));
    steps
}

pub fn initialization_steps() -> &'static [WorkflowStep] {
    &INITIALIZATION_STEPS
}

fn agent_steps(variant: AgentVariant) -> [WorkflowStep; AGENT_STEP_COUNT] {
    match variant {
        AgentVariant::Planning => [
            WorkflowStep::new("Decomposing goal into milestones", 2_000),
            WorkflowStep::new("Creating task breakdown", 2_500),
            WorkflowStep::new("Mapping task dependencies", 1_800),
            WorkflowStep::new("Estimating timeline", 1_500),
        ],
        AgentVariant::Research => [
            WorkflowStep::new("Gathering data sources", 2_500),
            WorkflowStep::new("Analyzing competitor landscape", 3_000),
            WorkflowStep::new("Extracting key insights", 2_000),
            WorkflowStep::new("Compiling research summary", 1_500),
        ],
        AgentVariant::Content => [
            WorkflowStep::new("Researching topic and audience", 2_000),
            WorkflowStep::new("Drafting content outline", 1_500),
            WorkflowStep::new("Writing content pieces", 3_000),
            WorkflowStep::new("Optimizing for SEO and engagement", 1_800),
        ],
        AgentVariant::Execution => [
            WorkflowStep::new("Preparing task queue", 1_200),
            WorkflowStep::new("Executing integration calls", 2_500),
            WorkflowStep::new("Verifying task outcomes", 1_800),
            WorkflowStep::new("Resolving execution errors", 1_500),
        ],
        AgentVariant::Sdr => [
            WorkflowStep::new("Researching prospect profile", 2_000),
            WorkflowStep::new("Crafting personalized outreach message", 2_500),
            WorkflowStep::new("Scheduling connection request", 1_500),
            WorkflowStep::new("Setting up follow-up sequence", 1_800),
        ],
        AgentVariant::Email => [
            WorkflowStep::new("Segmenting target audience", 1_800),
            WorkflowStep::new("Composing email content", 2_500),
            WorkflowStep::new("Configuring drip sequence", 1_500),
            WorkflowStep::new("Scheduling campaign delivery", 1_200),
        ],
        AgentVariant::Calendar => [
            WorkflowStep::new("Checking participant availability", 1_500),
            WorkflowStep::new("Resolving scheduling conflicts", 2_000),
            WorkflowStep::new("Booking meeting slots", 1_200),
            WorkflowStep::new("Sending calendar invitations", 1_000),
        ],
        AgentVariant::Analysis => [
            WorkflowStep::new("Collecting performance data", 2_000),
            WorkflowStep::new("Running statistical analysis", 3_000),
            WorkflowStep::new("Identifying trends and insights", 2_200),
            WorkflowStep::new("Generating analysis report", 1_800),
        ],
        AgentVariant::Automation => [
            WorkflowStep::new("Mapping current process", 2_000),
            WorkflowStep::new("Designing automation workflow", 2_500),
            WorkflowStep::new("Configuring triggers and actions", 1_800),
            WorkflowStep::new("Testing automated workflow", 500),
        ],
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::{initialization_steps, plan, PLAN_LENGTH};
    use crate::domain::agent::AgentVariant;

    #[test]
    fn every_variant_plans_seven_steps_with_the_shared_prefix() {
        let prefix: Vec<&str> = initialization_steps().iter().map(|step| step.label).collect();
        assert_eq!(
            prefix,
            vec![
                "Analyzing input parameters",
                "Initializing agent capabilities",
                "Connecting to required tools"
            ]
        );

        for variant in AgentVariant::ALL {
            let steps = plan(variant);
            assert_eq!(steps.len(), PLAN_LENGTH, "{variant}");
            let labels: Vec<&str> = steps.iter().take(3).map(|step| step.label).collect();
            assert_eq!(labels, prefix, "{variant}");
        }
    }

    #[test]
    fn sdr_plan_follows_prospecting_sequence() {
        let labels: Vec<&str> =
            plan(AgentVariant::Sdr).iter().skip(3).map(|step| step.label).collect();

        assert_eq!(
            labels,
            vec![
                "Researching prospect profile",
                "Crafting personalized outreach message",
                "Scheduling connection request",
                "Setting up follow-up sequence",
            ]
        );
    }

    #[test]
    fn nominal_durations_stay_within_bounds() {
        for variant in AgentVariant::ALL {
            for step in plan(variant) {
                assert!(step.nominal_duration >= Duration::from_millis(500), "{}", step.label);
                assert!(step.nominal_duration <= Duration::from_millis(3_000), "{}", step.label);
            }
        }
    }

    #[test]
    fn planning_is_deterministic_and_variant_specific() {
        let mut tails = HashSet::new();
        for variant in AgentVariant::ALL {
            assert_eq!(plan(variant), plan(variant));
            let tail: Vec<&str> = plan(variant).iter().skip(3).map(|step| step.label).collect();
            tails.insert(tail);
        }
        assert_eq!(tails.len(), AgentVariant::ALL.len());
    }

    #[test]
    fn steps_serialize_duration_as_millis() {
        let value = serde_json::to_value(&plan(AgentVariant::Email)[0]).expect("serialize step");
        assert_eq!(value["nominal_duration_ms"], 1_000);
        assert_eq!(value["label"], "Analyzing input parameters");
    }
}
