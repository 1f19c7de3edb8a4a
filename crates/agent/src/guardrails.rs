use relay_core::AgentProfile;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolAccessDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, unsupported_tools: Vec<String> },
    Degrade { reason_code: &'static str, user_message: String, unsupported_tools: Vec<String> },
}

impl ToolAccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::Deny { reason_code, .. } | Self::Degrade { reason_code, .. } => Some(reason_code),
        }
    }
}

/// Checks a goal's requested tools against the selected agent's catalog.
///
/// Requested tools the agent does not list are reported, never invoked. By
/// default the run carries on with the agent's own tools; `strict` refuses
/// the run instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolAccessPolicy {
    pub strict: bool,
}

impl ToolAccessPolicy {
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn evaluate(&self, profile: &AgentProfile, tools_needed: &[String]) -> ToolAccessDecision {
        let mut unsupported: Vec<String> = Vec::new();
        for tool in tools_needed {
            let tool = tool.trim().to_lowercase();
            if tool.is_empty() || profile.permits_tool(&tool) || unsupported.contains(&tool) {
                continue;
            }
            unsupported.push(tool);
        }

        if unsupported.is_empty() {
            return ToolAccessDecision::Allow;
        }

        let listed = unsupported.join(", ");
        if self.strict {
            ToolAccessDecision::Deny {
                reason_code: "tool_not_permitted",
                user_message: format!(
                    "Agent {} is not permitted to use tools: {listed}",
                    profile.id()
                ),
                unsupported_tools: unsupported,
            }
        } else {
            ToolAccessDecision::Degrade {
                reason_code: "tool_not_in_catalog",
                user_message: format!(
                    "{} will proceed without unsupported tools: {listed}",
                    profile.name
                ),
                unsupported_tools: unsupported,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use relay_core::{AgentRegistry, AgentVariant};

    use super::{ToolAccessDecision, ToolAccessPolicy};

    fn tools(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn catalog_tools_are_allowed() {
        let profile = AgentRegistry::global().get(AgentVariant::Sdr);
        let decision =
            ToolAccessPolicy::default().evaluate(profile, &tools(&["LinkedIn", "crm", ""]));
        assert_eq!(decision, ToolAccessDecision::Allow);
        assert!(decision.is_allowed());
    }

    #[test]
    fn foreign_tools_degrade_by_default() {
        let profile = AgentRegistry::global().get(AgentVariant::Email);
        let decision = ToolAccessPolicy::default()
            .evaluate(profile, &tools(&["email", "zapier", "Zapier", "figma"]));

        let (reason_code, user_message, unsupported_tools) = match decision {
            ToolAccessDecision::Degrade { reason_code, user_message, unsupported_tools } => {
                (reason_code, user_message, unsupported_tools)
            }
            _ => ("", String::new(), Vec::new()),
        };

        assert_eq!(reason_code, "tool_not_in_catalog");
        assert!(user_message.starts_with("Email Agent will proceed"));
        assert_eq!(unsupported_tools, tools(&["zapier", "figma"]));
    }

    #[test]
    fn strict_policy_denies_foreign_tools() {
        let profile = AgentRegistry::global().get(AgentVariant::Calendar);
        let decision = ToolAccessPolicy::strict().evaluate(profile, &tools(&["slack"]));

        let user_message = match &decision {
            ToolAccessDecision::Deny { user_message, .. } => user_message.clone(),
            _ => String::new(),
        };

        assert_eq!(decision.reason_code(), Some("tool_not_permitted"));
        assert_eq!(user_message, "Agent calendar is not permitted to use tools: slack");
    }
}
