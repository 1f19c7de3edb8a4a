use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use relay_agent::{AgentRuntime, ExecutorSettings, RunTarget, ToolAccessPolicy};
use relay_core::config::{AppConfig, LoadOptions};
use relay_core::Goal;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::commands::{CommandResult, EXIT_INVALID_INPUT, EXIT_RUN_FAILED};

const COMMAND: &str = "run";

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    #[arg(long, conflicts_with = "agent", help = "Goal title to classify and run")]
    pub goal: Option<String>,
    #[arg(long, default_value = "", help = "Goal description used for routing")]
    pub description: String,
    #[arg(long = "tool", help = "Tool the goal needs (repeatable)")]
    pub tools: Vec<String>,
    #[arg(long, help = "Run a specific agent id and skip classification")]
    pub agent: Option<String>,
    #[arg(long, help = "Opaque JSON input forwarded to the agent")]
    pub input: Option<String>,
    #[arg(long, help = "Seed the run for reproducible timing and results")]
    pub seed: Option<u64>,
    #[arg(long, help = "Skip simulated latency")]
    pub fast: bool,
    #[arg(long, help = "Fail runs that request tools outside the agent catalog")]
    pub strict_tools: bool,
    #[arg(long, help = "Print progress events as JSON lines before the result")]
    pub stream: bool,
}

pub fn run(args: RunArgs, options: LoadOptions) -> CommandResult {
    run_with_output(args, options, &mut std::io::stdout())
}

/// Same as [`run`], with streamed progress lines written to `events_out`.
pub fn run_with_output<W: Write>(
    args: RunArgs,
    mut options: LoadOptions,
    events_out: &mut W,
) -> CommandResult {
    if args.seed.is_some() {
        options.overrides.seed = args.seed;
    }
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, error),
    };

    let (target, input) = match resolve_target(&args) {
        Ok(resolved) => resolved,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_input",
                format!("{error:#}"),
                EXIT_INVALID_INPUT,
            );
        }
    };

    let mut runtime = AgentRuntime::new(&config);
    if args.fast {
        runtime =
            runtime.with_settings(ExecutorSettings::from(&config.executor).without_latency());
    }
    if args.strict_tools {
        runtime = runtime.with_guardrails(ToolAccessPolicy::strict());
    }

    let async_runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUN_FAILED,
            );
        }
    };

    let stream = args.stream;
    let outcome = async_runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!(event_name = "cli.run.interrupted", "cancelling run");
                interrupt.cancel();
            }
        });

        let (mut receiver, handle) = Arc::new(runtime).run_with_channel(target, input, cancel);
        while let Some(event) = receiver.recv().await {
            if stream {
                write_event(events_out, &event);
            }
        }
        let outcome = handle.await;
        signal.abort();
        outcome
    });

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "run_aborted",
                format!("run task did not finish: {error}"),
                EXIT_RUN_FAILED,
            );
        }
    };

    let run_id = outcome.run_id.to_string();
    match outcome.data {
        Some(data) if outcome.success => CommandResult::success_with_data(
            COMMAND,
            format!("run {run_id} completed"),
            json!({ "run_id": run_id, "model": outcome.model, "result": data }),
        ),
        _ => CommandResult::failure(
            COMMAND,
            "run_failed",
            outcome.error.unwrap_or_else(|| "Unknown error".to_string()),
            EXIT_RUN_FAILED,
        ),
    }
}

/// Agent targets default to an empty object; goal targets forward the goal.
pub fn resolve_target(args: &RunArgs) -> anyhow::Result<(RunTarget, Value)> {
    let input = match args.input.as_deref() {
        Some(raw) => serde_json::from_str(raw).context("`--input` must be valid JSON")?,
        None => Value::Null,
    };

    match (&args.goal, &args.agent) {
        (Some(title), None) => {
            let goal = Goal::new(title.as_str())
                .with_description(args.description.as_str())
                .with_tools(args.tools.iter().cloned());
            Ok((RunTarget::Goal(goal), input))
        }
        (None, Some(agent)) => {
            let input = if input.is_null() { json!({}) } else { input };
            Ok((RunTarget::Agent(agent.trim().to_string()), input))
        }
        (Some(_), Some(_)) => anyhow::bail!("pass either `--goal` or `--agent`, not both"),
        (None, None) => anyhow::bail!("one of `--goal` or `--agent` is required"),
    }
}

fn write_event<W: Write>(out: &mut W, event: &relay_agent::ProgressEvent) {
    let Ok(line) = serde_json::to_string(event) else {
        return;
    };
    let _ = writeln!(out, "{line}");
}
