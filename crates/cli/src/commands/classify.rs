use clap::Args;
use relay_core::config::{AppConfig, LoadOptions};
use relay_core::optimizer::{augment_prompt, default_augmentations, model_config, TaskType};
use relay_core::{classify_detailed, plan, AgentRegistry, ComplexityLevel, Goal};
use serde_json::json;

use crate::commands::{CommandResult, EXIT_INVALID_INPUT};

const COMMAND: &str = "classify";

#[derive(Debug, Clone, Default, Args)]
pub struct ClassifyArgs {
    #[arg(help = "Goal title")]
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long = "tool", help = "Tool the goal needs (repeatable)")]
    pub tools: Vec<String>,
}

pub fn run(args: ClassifyArgs, options: LoadOptions) -> CommandResult {
    if args.title.trim().is_empty() && args.description.trim().is_empty() && args.tools.is_empty()
    {
        return CommandResult::failure(
            COMMAND,
            "invalid_input",
            "goal needs a title, a description or at least one tool",
            EXIT_INVALID_INPUT,
        );
    }
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, error),
    };

    let goal = Goal::new(args.title)
        .with_description(args.description)
        .with_tools(args.tools);
    let classification = classify_detailed(&goal);
    let steps: Vec<&str> = plan(classification.variant).iter().map(|step| step.label).collect();

    let complexity = ComplexityLevel::assess(&goal);
    let profile = AgentRegistry::global().get(classification.variant);
    let model = model_config(&config.model.base_model, TaskType::from(profile.variant), complexity);
    let prompt = augment_prompt(&goal_prompt(&goal), &default_augmentations(profile, &model));

    CommandResult::success_with_data(
        COMMAND,
        format!("goal routed to {}", classification.variant),
        json!({
            "agent": classification.variant,
            "matched_on": classification.matched_on,
            "complexity": complexity,
            "steps": steps,
            "model": model,
            "prompt": prompt,
        }),
    )
}

fn goal_prompt(goal: &Goal) -> String {
    let mut prompt = format!("Goal: {}", goal.title.trim());
    if !goal.description.trim().is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(goal.description.trim());
    }
    prompt
}
