pub mod commands;

use clap::{Parser, Subcommand};
use relay_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "relay",
    about = "Relay agent orchestration CLI",
    long_about = "Route goals to specialized agents, run their simulated workflows, and inspect the catalog and configuration.",
    after_help = "Examples:\n  relay run --goal \"Cold outreach to fintech CTOs\" --tool linkedin\n  relay classify \"Weekly newsletter\"\n  relay plan sdr\n  relay agents"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a relay.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[arg(long, global = true, value_parser = parse_log_format, help = "Override logging.format")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Classify a goal (or pick an agent) and run its workflow")]
    Run(commands::run::RunArgs),
    #[command(about = "Show which agent a goal routes to and the plan it would run")]
    Classify(commands::classify::ClassifyArgs),
    #[command(about = "Print the ordered workflow steps for an agent id")]
    Plan {
        #[arg(help = "Agent id, e.g. sdr or calendar")]
        agent: String,
    },
    #[command(about = "List the registered agents with their capabilities and tools")]
    Agents,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Run(args) => commands::run::run(args, options),
        Command::Classify(args) => commands::classify::run(args, options),
        Command::Plan { agent } => commands::plan::run(&agent),
        Command::Agents => commands::agents::run(),
        Command::Config => commands::config::run(options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays machine-readable.
pub fn init_logging(config: &LoggingConfig) {
    use relay_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse::<LogFormat>().map_err(|error| error.to_string())
}
