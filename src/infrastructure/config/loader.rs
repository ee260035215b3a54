use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::infrastructure::logging::DEBUG_SUBSYSTEMS;

/// Directory holding the project's config files
pub const CONFIG_DIR: &str = ".attestor";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Unknown debug subsystem: {0}")]
    UnknownDebugSubsystem(String),

    #[error("State directory cannot be empty")]
    EmptyStateDir,

    #[error("Agent program cannot be empty")]
    EmptyAgentProgram,

    #[error("Invalid {0} timeout: must be at least 1 second")]
    InvalidTimeout(&'static str),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the project rooted at `project`
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .attestor/config.yaml (project config)
    /// 3. .attestor/local.yaml (project local overrides, optional)
    /// 4. Environment variables (ATTESTOR_* prefix, `__` for nesting)
    pub fn load(project: &Path) -> Result<Config> {
        let dir = project.join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("ATTESTOR_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.state_dir.trim().is_empty() {
            return Err(ConfigError::EmptyStateDir);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        for subsystem in &config.logging.debug {
            if subsystem != "all" && !DEBUG_SUBSYSTEMS.iter().any(|(name, _)| name == subsystem) {
                return Err(ConfigError::UnknownDebugSubsystem(subsystem.clone()));
            }
        }

        if config.agent.program.trim().is_empty() {
            return Err(ConfigError::EmptyAgentProgram);
        }
        if config.agent.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("agent"));
        }
        if config.agent.initial_backoff_ms >= config.agent.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.agent.initial_backoff_ms,
                config.agent.max_backoff_ms,
            ));
        }

        if config.checks.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("check"));
        }
        if config.checks.max_output_chars == 0 {
            return Err(ConfigError::ValidationFailed(
                "checks.max_output_chars must be positive".to_string(),
            ));
        }
        if config.verification.max_diff_chars == 0 {
            return Err(ConfigError::ValidationFailed(
                "verification.max_diff_chars must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
