use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RegistryError;

/// The nine fixed agent specializations a goal can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentVariant {
    Planning,
    Research,
    Content,
    Execution,
    Sdr,
    Email,
    Calendar,
    Analysis,
    Automation,
}

impl AgentVariant {
    pub const ALL: [AgentVariant; 9] = [
        Self::Planning,
        Self::Research,
        Self::Content,
        Self::Execution,
        Self::Sdr,
        Self::Email,
        Self::Calendar,
        Self::Analysis,
        Self::Automation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Research => "research",
            Self::Content => "content",
            Self::Execution => "execution",
            Self::Sdr => "sdr",
            Self::Email => "email",
            Self::Calendar => "calendar",
            Self::Analysis => "analysis",
            Self::Automation => "automation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planning" => Some(Self::Planning),
            "research" => Some(Self::Research),
            "content" => Some(Self::Content),
            "execution" => Some(Self::Execution),
            "sdr" => Some(Self::Sdr),
            "email" => Some(Self::Email),
            "calendar" => Some(Self::Calendar),
            "analysis" => Some(Self::Analysis),
            "automation" => Some(Self::Automation),
            _ => None,
        }
    }
}

impl fmt::Display for AgentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentVariant {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| RegistryError::NotFound(value.to_string()))
    }
}

/// Immutable catalog entry describing one agent variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    pub variant: AgentVariant,
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: &'static [&'static str],
    pub specializations: &'static [&'static str],
    pub tools: &'static [&'static str],
}

impl AgentProfile {
    pub fn id(&self) -> &'static str {
        self.variant.as_str()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| (*tool).to_string()).collect()
    }

    pub fn permits_tool(&self, tool: &str) -> bool {
        let tool = tool.trim().to_ascii_lowercase();
        self.tools.iter().any(|allowed| *allowed == tool)
    }
}

#[cfg(test)]
mod tests {
    use super::AgentVariant;
    use crate::errors::RegistryError;

    #[test]
    fn variant_ids_round_trip_through_parse() {
        for variant in AgentVariant::ALL {
            assert_eq!(AgentVariant::parse(variant.as_str()), Some(variant));
        }
    }

    #[test]
    fn parse_ignores_case_and_whitespace() {
        assert_eq!(AgentVariant::parse("  SDR "), Some(AgentVariant::Sdr));
    }

    #[test]
    fn unknown_id_fails_from_str_with_not_found() {
        let error = "ghost".parse::<AgentVariant>().expect_err("ghost is not a variant");
        assert_eq!(error, RegistryError::NotFound("ghost".to_string()));
        assert_eq!(error.to_string(), "Agent ghost not found");
    }

    #[test]
    fn variant_serializes_as_snake_case_id() {
        let json = serde_json::to_string(&AgentVariant::Sdr).expect("serialize");
        assert_eq!(json, "\"sdr\"");
    }
}
