use relay_core::AgentRegistry;
use serde_json::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let registry = AgentRegistry::global();
    let profiles: Vec<Value> =
        registry.iter().filter_map(|profile| serde_json::to_value(profile).ok()).collect();

    CommandResult::success_with_data(
        "agents",
        format!("{} agents registered", registry.len()),
        Value::Array(profiles),
    )
}
