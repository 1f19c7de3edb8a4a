use serde::{Deserialize, Serialize};

/// A caller-supplied unit of intent to be routed to an agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tools_needed: Vec<String>,
}

impl Goal {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools_needed.push(tool.into());
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools_needed.extend(tools.into_iter().map(Into::into));
        self
    }
}
