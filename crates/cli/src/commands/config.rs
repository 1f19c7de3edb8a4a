use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use relay_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_OK};

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let explicit_path = options.config_path.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: EXIT_CONFIG,
                output: format!("config validation failed: {error}"),
            };
        }
    };

    CommandResult { exit_code: EXIT_OK, output: render(&config, explicit_path.as_deref()) }
}

pub fn render(config: &AppConfig, explicit_path: Option<&Path>) -> String {
    let config_file_path = detect_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let executor = &config.executor;
    let fields = [
        Field {
            key: "executor.init_pause_ms",
            env_keys: &["RELAY_EXECUTOR_INIT_PAUSE_MS"],
            value: executor.init_pause_ms.to_string(),
        },
        Field {
            key: "executor.step_delay_min_ms",
            env_keys: &["RELAY_EXECUTOR_STEP_DELAY_MIN_MS"],
            value: executor.step_delay_min_ms.to_string(),
        },
        Field {
            key: "executor.step_delay_max_ms",
            env_keys: &["RELAY_EXECUTOR_STEP_DELAY_MAX_MS"],
            value: executor.step_delay_max_ms.to_string(),
        },
        Field {
            key: "executor.processing_probability",
            env_keys: &["RELAY_EXECUTOR_PROCESSING_PROBABILITY"],
            value: executor.processing_probability.to_string(),
        },
        Field {
            key: "executor.processing_pause_ms",
            env_keys: &["RELAY_EXECUTOR_PROCESSING_PAUSE_MS"],
            value: executor.processing_pause_ms.to_string(),
        },
        Field {
            key: "executor.seed",
            env_keys: &["RELAY_EXECUTOR_SEED"],
            value: executor.seed.map_or_else(|| "<unset>".to_string(), |seed| seed.to_string()),
        },
        Field {
            key: "executor.progress_buffer",
            env_keys: &["RELAY_EXECUTOR_PROGRESS_BUFFER"],
            value: executor.progress_buffer.to_string(),
        },
        Field {
            key: "executor.announce_plan",
            env_keys: &["RELAY_EXECUTOR_ANNOUNCE_PLAN"],
            value: executor.announce_plan.to_string(),
        },
        Field {
            key: "model.base_model",
            env_keys: &["RELAY_MODEL_BASE_MODEL"],
            value: config.model.base_model.clone(),
        },
        Field {
            key: "model.default_complexity",
            env_keys: &["RELAY_MODEL_DEFAULT_COMPLEXITY"],
            value: config.model.default_complexity.as_str().to_string(),
        },
        Field {
            key: "logging.level",
            env_keys: &["RELAY_LOGGING_LEVEL", "RELAY_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_keys: &["RELAY_LOGGING_FORMAT", "RELAY_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn detect_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    ["relay.toml", "config/relay.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
