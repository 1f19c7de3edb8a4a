//! Builds the structured result of a finished run.
//!
//! Numeric values are bounded placeholders for what real tool invocations
//! would report. Only the field set of each record is a contract: consumers
//! key on those names.

use rand::Rng;
use serde_json::Value;
use thiserror::Error;

use crate::domain::agent::{AgentProfile, AgentVariant};
use crate::domain::result::{
    AgentDetails, AgentResult, AnalysisDetails, AutomationDetails, CalendarDetails,
    ContentDetails, EmailDetails, ExecutionDetails, PlanningDetails, ResearchDetails, SdrDetails,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("input payload is required for agent {0}")]
    MissingInput(AgentVariant),
}

pub fn synthesize<R>(
    profile: &AgentProfile,
    input: &Value,
    rng: &mut R,
) -> Result<AgentResult, SynthesisError>
where
    R: Rng + ?Sized,
{
    if input.is_null() {
        return Err(SynthesisError::MissingInput(profile.variant));
    }

    Ok(AgentResult {
        execution_time: rng.gen_range(2_000..=10_000),
        success_rate: fraction(rng, 0.90, 1.00),
        tools_used: profile.tool_names(),
        details: details_for(profile.variant, rng),
    })
}

fn details_for<R>(variant: AgentVariant, rng: &mut R) -> AgentDetails
where
    R: Rng + ?Sized,
{
    match variant {
        AgentVariant::Planning => AgentDetails::Planning(PlanningDetails {
            milestones_defined: rng.gen_range(3..=8),
            tasks_created: rng.gen_range(12..=40),
            dependencies_mapped: rng.gen_range(5..=20),
            estimated_completion_days: rng.gen_range(7..=60),
        }),
        AgentVariant::Research => AgentDetails::Research(ResearchDetails {
            sources_analyzed: rng.gen_range(15..=60),
            insights_generated: rng.gen_range(5..=15),
            competitors_tracked: rng.gen_range(3..=10),
            confidence_score: fraction(rng, 0.75, 0.95),
        }),
        AgentVariant::Content => AgentDetails::Content(ContentDetails {
            content_pieces: rng.gen_range(3..=10),
            word_count: rng.gen_range(800..=5_000),
            seo_score: fraction(rng, 0.70, 0.95),
            engagement_prediction: fraction(rng, 0.05, 0.25),
        }),
        AgentVariant::Execution => AgentDetails::Execution(ExecutionDetails {
            tasks_completed: rng.gen_range(8..=25),
            integrations_successful: rng.gen_range(2..=6),
            errors_resolved: rng.gen_range(0..=3),
            automation_rate: fraction(rng, 0.80, 0.98),
        }),
        AgentVariant::Sdr => {
            let outreach_sent: u32 = rng.gen_range(25..=100);
            AgentDetails::Sdr(SdrDetails {
                outreach_sent,
                connection_requests: rng.gen_range(15..=outreach_sent.min(60)),
                response_rate: fraction(rng, 0.08, 0.35),
                qualified_leads: rng.gen_range(2..=15),
            })
        }
        AgentVariant::Email => AgentDetails::Email(EmailDetails {
            emails_sent: rng.gen_range(500..=5_000),
            open_rate: fraction(rng, 0.18, 0.45),
            click_rate: fraction(rng, 0.02, 0.12),
            conversions: rng.gen_range(5..=80),
        }),
        AgentVariant::Calendar => {
            let meetings_scheduled: u32 = rng.gen_range(3..=15);
            AgentDetails::Calendar(CalendarDetails {
                meetings_scheduled,
                conflicts_resolved: rng.gen_range(0..=5),
                reminders_sent: meetings_scheduled * 2,
                attendance_rate: fraction(rng, 0.80, 0.98),
            })
        }
        AgentVariant::Analysis => AgentDetails::Analysis(AnalysisDetails {
            data_points_analyzed: rng.gen_range(1_000..=50_000),
            insights_discovered: rng.gen_range(4..=12),
            reports_generated: rng.gen_range(1..=5),
            accuracy_score: fraction(rng, 0.85, 0.98),
        }),
        AgentVariant::Automation => AgentDetails::Automation(AutomationDetails {
            workflows_created: rng.gen_range(2..=8),
            processes_automated: rng.gen_range(3..=12),
            time_saved_hours: rng.gen_range(5..=40),
            efficiency_gain: fraction(rng, 0.20, 0.60),
        }),
    }
}

// Three decimals keeps serialized payloads stable for display.
fn fraction<R>(rng: &mut R, low: f64, high: f64) -> f64
where
    R: Rng + ?Sized,
{
    (rng.gen_range(low..=high) * 1_000.0).round() / 1_000.0
}
