use serde::Serialize;

use crate::domain::agent::AgentVariant;

/// Structured output of one agent run: base metrics plus exactly one
/// variant-specific extension record, flattened into the same object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentResult {
    /// Simulated wall time in milliseconds.
    pub execution_time: u64,
    pub success_rate: f64,
    pub tools_used: Vec<String>,
    #[serde(flatten)]
    pub details: AgentDetails,
}

impl AgentResult {
    pub fn variant(&self) -> AgentVariant {
        self.details.variant()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgentDetails {
    Planning(PlanningDetails),
    Research(ResearchDetails),
    Content(ContentDetails),
    Execution(ExecutionDetails),
    Sdr(SdrDetails),
    Email(EmailDetails),
    Calendar(CalendarDetails),
    Analysis(AnalysisDetails),
    Automation(AutomationDetails),
}

impl AgentDetails {
    pub fn variant(&self) -> AgentVariant {
        match self {
            Self::Planning(_) => AgentVariant::Planning,
            Self::Research(_) => AgentVariant::Research,
            Self::Content(_) => AgentVariant::Content,
            Self::Execution(_) => AgentVariant::Execution,
            Self::Sdr(_) => AgentVariant::Sdr,
            Self::Email(_) => AgentVariant::Email,
            Self::Calendar(_) => AgentVariant::Calendar,
            Self::Analysis(_) => AgentVariant::Analysis,
            Self::Automation(_) => AgentVariant::Automation,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanningDetails {
    pub milestones_defined: u32,
    pub tasks_created: u32,
    pub dependencies_mapped: u32,
    pub estimated_completion_days: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResearchDetails {
    pub sources_analyzed: u32,
    pub insights_generated: u32,
    pub competitors_tracked: u32,
    pub confidence_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContentDetails {
    pub content_pieces: u32,
    pub word_count: u32,
    pub seo_score: f64,
    pub engagement_prediction: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutionDetails {
    pub tasks_completed: u32,
    pub integrations_successful: u32,
    pub errors_resolved: u32,
    pub automation_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SdrDetails {
    pub outreach_sent: u32,
    pub connection_requests: u32,
    pub response_rate: f64,
    pub qualified_leads: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmailDetails {
    pub emails_sent: u32,
    pub open_rate: f64,
    pub click_rate: f64,
    pub conversions: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalendarDetails {
    pub meetings_scheduled: u32,
    pub conflicts_resolved: u32,
    pub reminders_sent: u32,
    pub attendance_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisDetails {
    pub data_points_analyzed: u32,
    pub insights_discovered: u32,
    pub reports_generated: u32,
    pub accuracy_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AutomationDetails {
    pub workflows_created: u32,
    pub processes_automated: u32,
    pub time_saved_hours: u32,
    pub efficiency_gain: f64,
}

#[cfg(test)]
mod tests {
    use super::{AgentDetails, AgentResult, SdrDetails};
    use crate::domain::agent::AgentVariant;

    #[test]
    fn extension_record_is_flattened_next_to_base_metrics() {
        let result = AgentResult {
            execution_time: 4_200,
            success_rate: 0.95,
            tools_used: vec!["linkedin".to_string()],
            details: AgentDetails::Sdr(SdrDetails {
                outreach_sent: 40,
                connection_requests: 25,
                response_rate: 0.2,
                qualified_leads: 6,
            }),
        };

        let value = serde_json::to_value(&result).expect("serialize result");
        assert_eq!(value["execution_time"], 4_200);
        assert_eq!(value["outreach_sent"], 40);
        assert_eq!(value["tools_used"][0], "linkedin");
        assert!(value.get("Sdr").is_none());
        assert_eq!(result.variant(), AgentVariant::Sdr);
    }
}
