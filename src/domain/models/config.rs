use serde::{Deserialize, Serialize};

use super::verification_mode::TestMode;

/// Main configuration structure for Attestor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Directory (relative to the project root) holding all persisted state
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// AI agent invocation settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Automated check execution settings
    #[serde(default)]
    pub checks: ChecksConfig,

    /// Verification behaviour
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Capability cache settings
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

fn default_state_dir() -> String {
    ".attestor".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            logging: LoggingConfig::default(),
            agent: AgentConfig::default(),
            checks: ChecksConfig::default(),
            verification: VerificationConfig::default(),
            capabilities: CapabilitiesConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Subsystems logged at debug level (cache, discovery, store, ...)
    #[serde(default)]
    pub debug: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            debug: Vec::new(),
        }
    }
}

/// AI agent CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Agent executable
    #[serde(default = "default_agent_program")]
    pub program: String,

    /// Arguments passed before the prompt is piped on stdin
    #[serde(default = "default_agent_args")]
    pub args: Vec<String>,

    /// Per-invocation timeout in seconds
    #[serde(default = "default_agent_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a failed (non-timeout) invocation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_agent_program() -> String {
    "claude".to_string()
}

fn default_agent_args() -> Vec<String> {
    vec!["--print".to_string()]
}

const fn default_agent_timeout_secs() -> u64 {
    300
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            program: default_agent_program(),
            args: default_agent_args(),
            timeout_secs: default_agent_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Automated check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChecksConfig {
    /// Per-check timeout in seconds
    #[serde(default = "default_check_timeout_secs")]
    pub timeout_secs: u64,

    /// Run test, typecheck, lint and build concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Export CI=true to check commands
    #[serde(default = "default_true")]
    pub ci_mode: bool,

    /// Output kept per check, in characters
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

const fn default_check_timeout_secs() -> u64 {
    600
}

const fn default_true() -> bool {
    true
}

const fn default_max_output_chars() -> usize {
    20_000
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_check_timeout_secs(),
            parallel: false,
            ci_mode: default_true(),
            max_output_chars: default_max_output_chars(),
        }
    }
}

/// Verification behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VerificationConfig {
    /// Project-wide strict TDD: every feature is judged by its tests alone
    #[serde(default)]
    pub strict_tdd: bool,

    /// Diff characters handed to the agent
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,

    /// Test mode used when the caller does not choose one
    #[serde(default)]
    pub test_mode: TestMode,
}

const fn default_max_diff_chars() -> usize {
    40_000
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            strict_tdd: false,
            max_diff_chars: default_max_diff_chars(),
            test_mode: TestMode::default(),
        }
    }
}

/// Capability cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CapabilitiesConfig {
    /// Memory tier time-to-live in milliseconds
    #[serde(default = "default_memory_ttl_ms")]
    pub memory_ttl_ms: u64,

    /// Ask the agent to explore the project before falling back to manifests
    #[serde(default = "default_true")]
    pub agent_discovery: bool,
}

const fn default_memory_ttl_ms() -> u64 {
    60_000
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            memory_ttl_ms: default_memory_ttl_ms(),
            agent_discovery: default_true(),
        }
    }
}
