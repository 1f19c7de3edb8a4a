use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimizer::ComplexityLevel;

/// Chance that a step emits an extra "Processing..." update.
pub const PROCESSING_UPDATE_PROBABILITY: f64 = 0.3;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub executor: ExecutorConfig,
    pub model: ModelSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    pub init_pause_ms: u64,
    pub step_delay_min_ms: u64,
    pub step_delay_max_ms: u64,
    pub processing_probability: f64,
    pub processing_pause_ms: u64,
    pub seed: Option<u64>,
    pub progress_buffer: usize,
    pub announce_plan: bool,
}

#[derive(Clone, Debug)]
pub struct ModelSettings {
    pub base_model: String,
    pub default_complexity: ComplexityLevel,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub seed: Option<u64>,
    pub step_delay_min_ms: Option<u64>,
    pub step_delay_max_ms: Option<u64>,
    pub init_pause_ms: Option<u64>,
    pub processing_pause_ms: Option<u64>,
    pub base_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            init_pause_ms: 500,
            step_delay_min_ms: 1_000,
            step_delay_max_ms: 3_000,
            processing_probability: PROCESSING_UPDATE_PROBABILITY,
            processing_pause_ms: 500,
            seed: None,
            progress_buffer: 32,
            announce_plan: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            model: ModelSettings {
                base_model: "gemma-2-9b-it".to_string(),
                default_complexity: ComplexityLevel::Moderate,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("relay.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(executor) = patch.executor {
            if let Some(init_pause_ms) = executor.init_pause_ms {
                self.executor.init_pause_ms = init_pause_ms;
            }
            if let Some(step_delay_min_ms) = executor.step_delay_min_ms {
                self.executor.step_delay_min_ms = step_delay_min_ms;
            }
            if let Some(step_delay_max_ms) = executor.step_delay_max_ms {
                self.executor.step_delay_max_ms = step_delay_max_ms;
            }
            if let Some(processing_probability) = executor.processing_probability {
                self.executor.processing_probability = processing_probability;
            }
            if let Some(processing_pause_ms) = executor.processing_pause_ms {
                self.executor.processing_pause_ms = processing_pause_ms;
            }
            if let Some(seed) = executor.seed {
                self.executor.seed = Some(seed);
            }
            if let Some(progress_buffer) = executor.progress_buffer {
                self.executor.progress_buffer = progress_buffer;
            }
            if let Some(announce_plan) = executor.announce_plan {
                self.executor.announce_plan = announce_plan;
            }
        }

        if let Some(model) = patch.model {
            if let Some(base_model) = model.base_model {
                self.model.base_model = base_model;
            }
            if let Some(default_complexity) = model.default_complexity {
                self.model.default_complexity = parse_complexity(&default_complexity)?;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RELAY_EXECUTOR_INIT_PAUSE_MS") {
            self.executor.init_pause_ms = parse_u64("RELAY_EXECUTOR_INIT_PAUSE_MS", &value)?;
        }
        if let Some(value) = read_env("RELAY_EXECUTOR_STEP_DELAY_MIN_MS") {
            self.executor.step_delay_min_ms =
                parse_u64("RELAY_EXECUTOR_STEP_DELAY_MIN_MS", &value)?;
        }
        if let Some(value) = read_env("RELAY_EXECUTOR_STEP_DELAY_MAX_MS") {
            self.executor.step_delay_max_ms =
                parse_u64("RELAY_EXECUTOR_STEP_DELAY_MAX_MS", &value)?;
        }
        if let Some(value) = read_env("RELAY_EXECUTOR_PROCESSING_PROBABILITY") {
            self.executor.processing_probability =
                parse_f64("RELAY_EXECUTOR_PROCESSING_PROBABILITY", &value)?;
        }
        if let Some(value) = read_env("RELAY_EXECUTOR_PROCESSING_PAUSE_MS") {
            self.executor.processing_pause_ms =
                parse_u64("RELAY_EXECUTOR_PROCESSING_PAUSE_MS", &value)?;
        }
        if let Some(value) = read_env("RELAY_EXECUTOR_SEED") {
            self.executor.seed = Some(parse_u64("RELAY_EXECUTOR_SEED", &value)?);
        }
        if let Some(value) = read_env("RELAY_EXECUTOR_PROGRESS_BUFFER") {
            self.executor.progress_buffer =
                parse_usize("RELAY_EXECUTOR_PROGRESS_BUFFER", &value)?;
        }
        if let Some(value) = read_env("RELAY_EXECUTOR_ANNOUNCE_PLAN") {
            self.executor.announce_plan = parse_bool("RELAY_EXECUTOR_ANNOUNCE_PLAN", &value)?;
        }

        if let Some(value) = read_env("RELAY_MODEL_BASE_MODEL") {
            self.model.base_model = value;
        }
        if let Some(value) = read_env("RELAY_MODEL_DEFAULT_COMPLEXITY") {
            self.model.default_complexity = parse_complexity(&value)?;
        }

        let log_level = read_env("RELAY_LOGGING_LEVEL").or_else(|| read_env("RELAY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("RELAY_LOGGING_FORMAT").or_else(|| read_env("RELAY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(seed) = overrides.seed {
            self.executor.seed = Some(seed);
        }
        if let Some(step_delay_min_ms) = overrides.step_delay_min_ms {
            self.executor.step_delay_min_ms = step_delay_min_ms;
        }
        if let Some(step_delay_max_ms) = overrides.step_delay_max_ms {
            self.executor.step_delay_max_ms = step_delay_max_ms;
        }
        if let Some(init_pause_ms) = overrides.init_pause_ms {
            self.executor.init_pause_ms = init_pause_ms;
        }
        if let Some(processing_pause_ms) = overrides.processing_pause_ms {
            self.executor.processing_pause_ms = processing_pause_ms;
        }
        if let Some(base_model) = overrides.base_model {
            self.model.base_model = base_model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_executor(&self.executor)?;
        validate_model(&self.model)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("relay.toml"), PathBuf::from("config/relay.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_executor(executor: &ExecutorConfig) -> Result<(), ConfigError> {
    if executor.step_delay_min_ms > executor.step_delay_max_ms {
        return Err(ConfigError::Validation(
            "executor.step_delay_min_ms must not exceed executor.step_delay_max_ms".to_string(),
        ));
    }

    if executor.step_delay_max_ms > 60_000 {
        return Err(ConfigError::Validation(
            "executor.step_delay_max_ms must be in range 0..=60000".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&executor.processing_probability) {
        return Err(ConfigError::Validation(
            "executor.processing_probability must be in range 0.0..=1.0".to_string(),
        ));
    }

    if executor.progress_buffer == 0 {
        return Err(ConfigError::Validation(
            "executor.progress_buffer must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_model(model: &ModelSettings) -> Result<(), ConfigError> {
    if model.base_model.trim().is_empty() {
        return Err(ConfigError::Validation("model.base_model must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_complexity(value: &str) -> Result<ComplexityLevel, ConfigError> {
    ComplexityLevel::parse(value).ok_or_else(|| {
        ConfigError::Validation(format!(
            "unsupported complexity `{value}` (expected simple|moderate|complex)"
        ))
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    executor: Option<ExecutorPatch>,
    model: Option<ModelPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ExecutorPatch {
    init_pause_ms: Option<u64>,
    step_delay_min_ms: Option<u64>,
    step_delay_max_ms: Option<u64>,
    processing_probability: Option<f64>,
    processing_pause_ms: Option<u64>,
    seed: Option<u64>,
    progress_buffer: Option<usize>,
    announce_plan: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelPatch {
    base_model: Option<String>,
    default_complexity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
