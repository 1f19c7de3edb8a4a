//! Goal routing.
//!
//! Rules are evaluated in declaration order and the first match wins, so a
//! goal that mentions both outreach and a meeting resolves to the SDR agent.
//! Goals that match nothing fall back to the execution agent.

use serde::Serialize;

use crate::domain::agent::AgentVariant;
use crate::domain::goal::Goal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedOn {
    Title,
    Description,
    Tools,
    Fallback,
}

impl MatchedOn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Tools => "tools",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub variant: AgentVariant,
    pub matched_on: MatchedOn,
}

struct RoutingRule {
    variant: AgentVariant,
    title_keywords: &'static [&'static str],
    description_keywords: &'static [&'static str],
    tools: &'static [&'static str],
}

const ROUTING_RULES: [RoutingRule; 6] = [
    RoutingRule {
        variant: AgentVariant::Sdr,
        title_keywords: &["lead", "prospect", "outreach"],
        description_keywords: &["linkedin", "cold"],
        tools: &["linkedin", "prospecting"],
    },
    RoutingRule {
        variant: AgentVariant::Email,
        title_keywords: &["email", "campaign", "newsletter"],
        description_keywords: &["email", "drip"],
        tools: &["email", "mailchimp"],
    },
    RoutingRule {
        variant: AgentVariant::Calendar,
        title_keywords: &["meeting", "schedule", "calendar"],
        description_keywords: &["appointment", "booking"],
        tools: &["calendar", "scheduling"],
    },
    RoutingRule {
        variant: AgentVariant::Analysis,
        title_keywords: &["analysis", "insight", "report"],
        description_keywords: &["analytics", "metrics"],
        tools: &["analytics", "reporting"],
    },
    RoutingRule {
        variant: AgentVariant::Content,
        title_keywords: &["content", "blog", "social"],
        description_keywords: &["writing", "content"],
        tools: &["content", "social-media"],
    },
    RoutingRule {
        variant: AgentVariant::Automation,
        title_keywords: &["automat", "workflow", "process"],
        description_keywords: &["automat", "workflow"],
        tools: &["automation", "workflow"],
    },
];

pub const FALLBACK_VARIANT: AgentVariant = AgentVariant::Execution;

/// Maps a goal to exactly one agent variant. Never fails.
pub fn classify(goal: &Goal) -> AgentVariant {
    classify_detailed(goal).variant
}

pub fn classify_detailed(goal: &Goal) -> Classification {
    let title = goal.title.to_lowercase();
    let description = goal.description.to_lowercase();
    let tools: Vec<String> = goal.tools_needed.iter().map(|tool| tool.to_lowercase()).collect();

    for rule in &ROUTING_RULES {
        if let Some(matched_on) = rule.match_against(&title, &description, &tools) {
            return Classification { variant: rule.variant, matched_on };
        }
    }

    Classification { variant: FALLBACK_VARIANT, matched_on: MatchedOn::Fallback }
}

impl RoutingRule {
    fn match_against(&self, title: &str, description: &str, tools: &[String]) -> Option<MatchedOn> {
        if self.title_keywords.iter().any(|keyword| title.contains(keyword)) {
            return Some(MatchedOn::Title);
        }
        if self.description_keywords.iter().any(|keyword| description.contains(keyword)) {
            return Some(MatchedOn::Description);
        }
        if tools.iter().any(|tool| self.tools.contains(&tool.as_str())) {
            return Some(MatchedOn::Tools);
        }
        None
    }
}
