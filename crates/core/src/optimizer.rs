//! Model tuning for the text-generation backend used by agent integrations.
//!
//! One table keyed by `(TaskType, ComplexityLevel)` yields the sampling
//! parameters, and prompts are assembled from composable augmentations
//! instead of ad hoc string concatenation.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentProfile, AgentVariant};
use crate::domain::goal::Goal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Planning,
    Research,
    Content,
    Execution,
    Conversation,
    Analysis,
}

impl From<AgentVariant> for TaskType {
    fn from(variant: AgentVariant) -> Self {
        match variant {
            AgentVariant::Planning => Self::Planning,
            AgentVariant::Research => Self::Research,
            AgentVariant::Content => Self::Content,
            AgentVariant::Execution | AgentVariant::Automation => Self::Execution,
            AgentVariant::Sdr | AgentVariant::Email | AgentVariant::Calendar => Self::Conversation,
            AgentVariant::Analysis => Self::Analysis,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityLevel {
    /// Rough estimate from how much the goal asks for.
    pub fn assess(goal: &Goal) -> Self {
        let words = goal.title.split_whitespace().count()
            + goal.description.split_whitespace().count();
        let tools = goal.tools_needed.len();

        if tools >= 4 || words > 60 {
            Self::Complex
        } else if tools >= 2 || words > 15 {
            Self::Moderate
        } else {
            Self::Simple
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "moderate" => Some(Self::Moderate),
            "complex" => Some(Self::Complex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub reasoning_steps: u8,
}

struct Tuning {
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

fn base_tuning(task: TaskType) -> Tuning {
    match task {
        TaskType::Planning => Tuning { temperature: 0.3, top_p: 0.85, max_tokens: 1_024 },
        TaskType::Research => Tuning { temperature: 0.2, top_p: 0.80, max_tokens: 1_536 },
        TaskType::Content => Tuning { temperature: 0.8, top_p: 0.95, max_tokens: 2_048 },
        TaskType::Execution => Tuning { temperature: 0.1, top_p: 0.75, max_tokens: 768 },
        TaskType::Conversation => Tuning { temperature: 0.6, top_p: 0.90, max_tokens: 512 },
        TaskType::Analysis => Tuning { temperature: 0.2, top_p: 0.80, max_tokens: 1_536 },
    }
}

pub fn model_config(base_model: &str, task: TaskType, complexity: ComplexityLevel) -> ModelConfig {
    let tuning = base_tuning(task);
    let (token_scale, temperature_shift, reasoning_steps) = match complexity {
        ComplexityLevel::Simple => (1, 0.0, 1),
        ComplexityLevel::Moderate => (2, -0.05, 3),
        ComplexityLevel::Complex => (4, -0.1, 5),
    };

    ModelConfig {
        model: base_model.to_string(),
        temperature: (tuning.temperature + temperature_shift).clamp(0.0, 1.0),
        top_p: tuning.top_p,
        max_tokens: tuning.max_tokens * token_scale,
        reasoning_steps,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    PlainText,
    Markdown,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptAugmentation {
    RolePreamble { agent_name: String, description: String },
    ReasoningScaffold { steps: u8 },
    OutputFormat(OutputFormat),
    Constraints(Vec<String>),
}

/// Composes augmentations over a base prompt. The role preamble is always
/// placed first; everything else is appended in the given order.
pub fn augment_prompt(base_prompt: &str, augmentations: &[PromptAugmentation]) -> String {
    let mut prompt = String::new();

    for augmentation in augmentations {
        if let PromptAugmentation::RolePreamble { agent_name, description } = augmentation {
            let _ = writeln!(prompt, "You are the {agent_name}. {description}.\n");
        }
    }

    prompt.push_str(base_prompt.trim_end());

    for augmentation in augmentations {
        match augmentation {
            PromptAugmentation::RolePreamble { .. } => {}
            PromptAugmentation::ReasoningScaffold { steps } if *steps > 1 => {
                let _ = write!(
                    prompt,
                    "\n\nWork through the problem in {steps} explicit steps before answering."
                );
            }
            PromptAugmentation::ReasoningScaffold { .. } => {
                prompt.push_str("\n\nThink briefly before answering.");
            }
            PromptAugmentation::OutputFormat(format) => {
                let instruction = match format {
                    OutputFormat::PlainText => "Respond in plain text.",
                    OutputFormat::Markdown => "Respond in Markdown.",
                    OutputFormat::Json => "Respond with a single valid JSON object.",
                };
                let _ = write!(prompt, "\n\n{instruction}");
            }
            PromptAugmentation::Constraints(constraints) if !constraints.is_empty() => {
                prompt.push_str("\n\nConstraints:");
                for constraint in constraints {
                    let _ = write!(prompt, "\n- {constraint}");
                }
            }
            PromptAugmentation::Constraints(_) => {}
        }
    }

    prompt
}

pub fn default_augmentations(
    profile: &AgentProfile,
    config: &ModelConfig,
) -> Vec<PromptAugmentation> {
    let format = match TaskType::from(profile.variant) {
        TaskType::Content | TaskType::Conversation => OutputFormat::Markdown,
        _ => OutputFormat::Json,
    };

    vec![
        PromptAugmentation::RolePreamble {
            agent_name: profile.name.to_string(),
            description: profile.description.to_string(),
        },
        PromptAugmentation::ReasoningScaffold { steps: config.reasoning_steps },
        PromptAugmentation::OutputFormat(format),
        PromptAugmentation::Constraints(vec![format!(
            "Only use these tools: {}",
            profile.tools.join(", ")
        )]),
    ]
}

#[cfg(test)]
mod tests {
    use super::{
        augment_prompt, default_augmentations, model_config, ComplexityLevel, OutputFormat,
        PromptAugmentation, TaskType,
    };
    use crate::domain::agent::AgentVariant;
    use crate::domain::goal::Goal;
    use crate::registry::AgentRegistry;

    #[test]
    fn complexity_grows_with_tools_and_description() {
        assert_eq!(ComplexityLevel::assess(&Goal::new("Ping")), ComplexityLevel::Simple);
        assert_eq!(
            ComplexityLevel::assess(&Goal::new("Sync").with_tools(["crm", "email"])),
            ComplexityLevel::Moderate
        );
        assert_eq!(
            ComplexityLevel::assess(&Goal::new("Sync").with_tools(["a", "b", "c", "d"])),
            ComplexityLevel::Complex
        );
    }

    #[test]
    fn harder_tasks_get_more_tokens_and_cooler_sampling() {
        let simple = model_config("gemma-2-9b-it", TaskType::Research, ComplexityLevel::Simple);
        let complex = model_config("gemma-2-9b-it", TaskType::Research, ComplexityLevel::Complex);

        assert!(complex.max_tokens > simple.max_tokens);
        assert!(complex.temperature < simple.temperature);
        assert!(complex.reasoning_steps > simple.reasoning_steps);
        assert_eq!(complex.model, "gemma-2-9b-it");
    }

    #[test]
    fn table_covers_every_task_and_complexity() {
        let complexities =
            [ComplexityLevel::Simple, ComplexityLevel::Moderate, ComplexityLevel::Complex];
        for variant in AgentVariant::ALL {
            for complexity in complexities {
                let config = model_config("m", TaskType::from(variant), complexity);
                assert!((0.0..=1.0).contains(&config.temperature));
                assert!(config.max_tokens > 0);
            }
        }
    }

    #[test]
    fn content_samples_hotter_than_execution() {
        let content = model_config("m", TaskType::Content, ComplexityLevel::Moderate);
        let execution = model_config("m", TaskType::Execution, ComplexityLevel::Moderate);
        assert!(content.temperature > execution.temperature);
    }

    #[test]
    fn role_preamble_is_placed_before_the_base_prompt() {
        let prompt = augment_prompt(
            "Draft a follow-up.",
            &[
                PromptAugmentation::OutputFormat(OutputFormat::Json),
                PromptAugmentation::RolePreamble {
                    agent_name: "SDR Agent".to_string(),
                    description: "Prospects new leads".to_string(),
                },
            ],
        );

        assert!(prompt.starts_with("You are the SDR Agent. Prospects new leads."));
        assert!(prompt.contains("Draft a follow-up."));
        assert!(prompt.ends_with("Respond with a single valid JSON object."));
    }

    #[test]
    fn empty_augmentations_leave_prompt_untouched() {
        assert_eq!(augment_prompt("Summarize.", &[]), "Summarize.");
        assert_eq!(
            augment_prompt("Summarize.", &[PromptAugmentation::Constraints(Vec::new())]),
            "Summarize."
        );
    }

    #[test]
    fn default_augmentations_restrict_tools_to_catalog() {
        let profile = AgentRegistry::global().get(AgentVariant::Email);
        let config = model_config("m", TaskType::from(profile.variant), ComplexityLevel::Complex);
        let prompt = augment_prompt("Plan the campaign.", &default_augmentations(profile, &config));

        assert!(prompt.contains("Only use these tools: email, mailchimp, crm"));
        assert!(prompt.contains("in 5 explicit steps"));
        assert!(prompt.contains("Respond in Markdown."));
    }
}
