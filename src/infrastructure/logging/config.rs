use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::models::LoggingConfig;

/// Environment variable holding a comma separated list of debug subsystems
pub const DEBUG_ENV_VAR: &str = "ATTESTOR_DEBUG";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stderr)
    pub log_dir: Option<PathBuf>,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,

    /// Subsystems raised to debug level
    #[serde(default)]
    pub debug_subsystems: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            log_dir: None,
            rotation: RotationPolicy::default(),
            debug_subsystems: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Build from the `logging` config section plus the `ATTESTOR_DEBUG`
    /// variable, if set.
    pub fn from_settings(settings: &LoggingConfig, debug_env: Option<&str>) -> Self {
        let mut debug_subsystems = settings.debug.clone();
        for name in parse_debug_list(debug_env.unwrap_or_default()) {
            if !debug_subsystems.contains(&name) {
                debug_subsystems.push(name);
            }
        }
        Self {
            level: settings.level.clone(),
            format: if settings.format == "json" {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            log_dir: settings.log_dir.as_ref().map(PathBuf::from),
            rotation: match settings.rotation.as_str() {
                "hourly" => RotationPolicy::Hourly,
                "never" => RotationPolicy::Never,
                _ => RotationPolicy::Daily,
            },
            debug_subsystems,
        }
    }
}

/// Split `cache, store` style lists, lower-cased and without blanks.
pub fn parse_debug_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_format() -> LogFormat {
    LogFormat::Pretty
}
