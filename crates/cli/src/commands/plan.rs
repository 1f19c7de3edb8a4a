use relay_core::{plan, AgentVariant};
use serde_json::json;

use crate::commands::{CommandResult, EXIT_INVALID_INPUT};

const COMMAND: &str = "plan";

pub fn run(agent_id: &str) -> CommandResult {
    let variant = match agent_id.parse::<AgentVariant>() {
        Ok(variant) => variant,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_input",
                error.to_string(),
                EXIT_INVALID_INPUT,
            );
        }
    };

    let steps = plan(variant);
    let nominal_ms: u128 = steps.iter().map(|step| step.nominal_duration.as_millis()).sum();
    CommandResult::success_with_data(
        COMMAND,
        format!("{} steps planned for {variant}", steps.len()),
        json!({ "agent": variant, "nominal_total_ms": nominal_ms as u64, "steps": steps }),
    )
}
