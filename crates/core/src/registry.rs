//! Static catalog of the agent variants.
//!
//! The registry is built once per process and never mutated, so it can be
//! read from any number of concurrent runs without synchronization.

use std::sync::OnceLock;

use crate::domain::agent::{AgentProfile, AgentVariant};
use crate::errors::RegistryError;

static GLOBAL: OnceLock<AgentRegistry> = OnceLock::new();

#[derive(Clone, Debug)]
pub struct AgentRegistry {
    profiles: [AgentProfile; 9],
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self { profiles: AgentVariant::ALL.map(catalog_entry) }
    }
}

impl AgentRegistry {
    /// Process-wide registry, initialized on first use.
    pub fn global() -> &'static AgentRegistry {
        GLOBAL.get_or_init(AgentRegistry::default)
    }

    pub fn lookup(&self, variant_id: &str) -> Result<&AgentProfile, RegistryError> {
        AgentVariant::parse(variant_id)
            .map(|variant| self.get(variant))
            .ok_or_else(|| RegistryError::NotFound(variant_id.to_string()))
    }

    pub fn get(&self, variant: AgentVariant) -> &AgentProfile {
        &self.profiles[variant as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn catalog_entry(variant: AgentVariant) -> AgentProfile {
    match variant {
        AgentVariant::Planning => AgentProfile {
            variant,
            name: "Planning Agent",
            description: "Breaks business goals into milestones, tasks and dependencies",
            capabilities: &["goal_decomposition", "task_planning", "dependency_mapping"],
            specializations: &["project_planning", "roadmapping"],
            tools: &["project-management", "calendar", "documents"],
        },
        AgentVariant::Research => AgentProfile {
            variant,
            name: "Research Agent",
            description: "Gathers market, competitor and account intelligence",
            capabilities: &["web_research", "competitor_tracking", "summarization"],
            specializations: &["market_research", "account_research"],
            tools: &["web-search", "crm", "documents"],
        },
        AgentVariant::Content => AgentProfile {
            variant,
            name: "Content Agent",
            description: "Drafts blog posts, social updates and marketing copy",
            capabilities: &["copywriting", "seo_optimization", "tone_adaptation"],
            specializations: &["blog_writing", "social_media"],
            tools: &["content", "social-media", "seo"],
        },
        AgentVariant::Execution => AgentProfile {
            variant,
            name: "Execution Agent",
            description: "Carries out general tasks across connected integrations",
            capabilities: &["task_execution", "integration_orchestration", "error_recovery"],
            specializations: &["general_operations"],
            tools: &["crm", "tasks", "webhooks"],
        },
        AgentVariant::Sdr => AgentProfile {
            variant,
            name: "SDR Agent",
            description: "Prospects, qualifies and runs outreach to new leads",
            capabilities: &["lead_prospecting", "outreach_personalization", "lead_qualification"],
            specializations: &["linkedin_outreach", "cold_outreach"],
            tools: &["linkedin", "prospecting", "email", "crm"],
        },
        AgentVariant::Email => AgentProfile {
            variant,
            name: "Email Agent",
            description: "Builds and sends email campaigns, newsletters and drip sequences",
            capabilities: &["campaign_design", "audience_segmentation", "send_optimization"],
            specializations: &["drip_campaigns", "newsletters"],
            tools: &["email", "mailchimp", "crm"],
        },
        AgentVariant::Calendar => AgentProfile {
            variant,
            name: "Calendar Agent",
            description: "Schedules meetings and manages appointments and bookings",
            capabilities: &["availability_matching", "conflict_resolution", "reminders"],
            specializations: &["meeting_scheduling", "appointment_booking"],
            tools: &["calendar", "scheduling", "email"],
        },
        AgentVariant::Analysis => AgentProfile {
            variant,
            name: "Analysis Agent",
            description: "Turns pipeline and campaign metrics into reports and insights",
            capabilities: &["data_analysis", "trend_detection", "report_generation"],
            specializations: &["sales_analytics", "performance_reporting"],
            tools: &["analytics", "reporting", "crm"],
        },
        AgentVariant::Automation => AgentProfile {
            variant,
            name: "Automation Agent",
            description: "Designs workflows that automate repetitive business processes",
            capabilities: &["workflow_design", "process_mapping", "trigger_configuration"],
            specializations: &["workflow_automation", "process_optimization"],
            tools: &["automation", "workflow", "webhooks"],
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::AgentRegistry;
    use crate::domain::agent::AgentVariant;
    use crate::errors::RegistryError;

    #[test]
    fn registry_holds_exactly_the_nine_variants() {
        let registry = AgentRegistry::default();
        let ids: HashSet<&str> = registry.iter().map(|profile| profile.id()).collect();

        assert_eq!(registry.len(), 9);
        assert_eq!(ids.len(), 9);
        for variant in AgentVariant::ALL {
            assert!(ids.contains(variant.as_str()), "missing {variant}");
        }
    }

    #[test]
    fn get_returns_the_profile_for_the_requested_variant() {
        let registry = AgentRegistry::global();
        for variant in AgentVariant::ALL {
            assert_eq!(registry.get(variant).variant, variant);
        }
    }

    #[test]
    fn lookup_by_id_finds_known_variants() {
        let profile = AgentRegistry::global().lookup("sdr").expect("sdr is registered");

        assert_eq!(profile.name, "SDR Agent");
        assert!(profile.permits_tool("LinkedIn"));
    }

    #[test]
    fn lookup_of_unknown_id_is_not_found() {
        let error = AgentRegistry::global().lookup("ghost").expect_err("ghost is unknown");
        assert_eq!(error, RegistryError::NotFound("ghost".to_string()));
    }

    #[test]
    fn every_profile_declares_tools_and_capabilities() {
        for profile in AgentRegistry::global().iter() {
            assert!(!profile.tools.is_empty(), "{} has no tools", profile.id());
            assert!(!profile.capabilities.is_empty(), "{} has no capabilities", profile.id());
            assert!(!profile.specializations.is_empty());
        }
    }
}
