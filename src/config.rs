use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::view::ViewName;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_EXPAND_DELAY_MS: u64 = 300;
const DEFAULT_COLLAPSE_DELAY_MS: u64 = 200;
const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 500;
const DEFAULT_STORAGE_KEY_PREFIX: &str = "view-config";

/// Engine configuration with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Delay before an expanding row settles as expanded
    #[serde(default = "default_expand_delay_ms")]
    #[validate(range(min = 1, max = 10000))]
    pub expand_delay_ms: u64,

    /// Delay before a collapsing row settles as collapsed
    #[serde(default = "default_collapse_delay_ms")]
    #[validate(range(min = 1, max = 10000))]
    pub collapse_delay_ms: u64,

    /// Quiet period after the last configuration edit before it is saved
    #[serde(default = "default_save_debounce_ms")]
    #[validate(range(min = 1, max = 60000))]
    pub save_debounce_ms: u64,

    /// Prefix of the persistence key, `<prefix>:<view>`
    #[serde(default = "default_storage_key_prefix")]
    #[validate(length(min = 1, max = 64))]
    pub storage_key_prefix: String,

    /// Directory for the JSON file backend; in-memory storage when absent
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expand_delay_ms: DEFAULT_EXPAND_DELAY_MS,
            collapse_delay_ms: DEFAULT_COLLAPSE_DELAY_MS,
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            storage_key_prefix: default_storage_key_prefix(),
            storage_dir: None,
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl EngineConfig {
    pub fn expand_delay(&self) -> Duration {
        Duration::from_millis(self.expand_delay_ms)
    }

    pub fn collapse_delay(&self) -> Duration {
        Duration::from_millis(self.collapse_delay_ms)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Persistence key of a view, e.g. `view-config:pedidos`
    pub fn storage_key(&self, view: ViewName) -> String {
        format!("{}:{}", self.storage_key_prefix, view.as_str())
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.collapse_delay_ms >= self.expand_delay_ms {
            let mut err = ValidationError::new("collapse_delay_not_shorter");
            err.message =
                Some("collapse_delay_ms must be strictly shorter than expand_delay_ms".into());
            errors.add("collapse_delay_ms", err);
        }

        if self.storage_key_prefix.contains(':') {
            let mut err = ValidationError::new("storage_key_prefix_separator");
            err.message = Some("storage_key_prefix must not contain ':'".into());
            errors.add("storage_key_prefix", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Runs field validation followed by the cross-field checks.
    pub fn validate_all(&self) -> Result<(), EngineConfigError> {
        self.validate()?;
        self.validate_additional_constraints()?;
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_expand_delay_ms() -> u64 {
    DEFAULT_EXPAND_DELAY_MS
}

fn default_collapse_delay_ms() -> u64 {
    DEFAULT_COLLAPSE_DELAY_MS
}

fn default_save_debounce_ms() -> u64 {
    DEFAULT_SAVE_DEBOUNCE_MS
}

fn default_storage_key_prefix() -> String {
    DEFAULT_STORAGE_KEY_PREFIX.to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("order_view_engine={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads engine configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (VIEWS__*)
pub fn load_config() -> Result<EngineConfig, EngineConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("expand_delay_ms", DEFAULT_EXPAND_DELAY_MS)?
        .set_default("collapse_delay_ms", DEFAULT_COLLAPSE_DELAY_MS)?
        .set_default("save_debounce_ms", DEFAULT_SAVE_DEBOUNCE_MS)?
        .set_default("storage_key_prefix", DEFAULT_STORAGE_KEY_PREFIX)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("VIEWS").separator("__"))
        .build()?;

    let engine_config: EngineConfig = config.try_deserialize()?;

    engine_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        EngineConfigError::Validation(e)
    })?;

    engine_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        EngineConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(engine_config)
}
