use super::config::{LogConfig, LogFormat, RotationPolicy};
use anyhow::{Context, Result};
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Subsystems that can be raised to debug level, with their log targets
pub const DEBUG_SUBSYSTEMS: &[(&str, &[&str])] = &[
    ("cache", &["attestor::services::capability_cache"]),
    (
        "discovery",
        &[
            "attestor::services::test_discovery",
            "attestor::infrastructure::discovery",
        ],
    ),
    (
        "store",
        &[
            "attestor::services::verification_store",
            "attestor::services::persistence",
        ],
    ),
    (
        "checks",
        &["attestor::services::checks", "attestor::infrastructure::executor"],
    ),
    ("judgment", &["attestor::services::judgment"]),
    ("orchestrator", &["attestor::services::orchestrator"]),
    ("git", &["attestor::infrastructure::git"]),
    ("agent", &["attestor::infrastructure::agent"]),
];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logger implementation using tracing
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Initialize the global subscriber with the given configuration
    ///
    /// Logs go to stderr so command output on stdout stays machine readable.
    ///
    /// # Errors
    /// Returns an error if the level is invalid or a subscriber is already set
    pub fn init(config: &LogConfig) -> Result<Self> {
        let filter = build_filter(config)?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let guard = if let Some(ref log_dir) = config.log_dir {
            let file_appender = match config.rotation {
                RotationPolicy::Daily => rolling::daily(log_dir, "attestor.log"),
                RotationPolicy::Hourly => rolling::hourly(log_dir, "attestor.log"),
                RotationPolicy::Never => rolling::never(log_dir, "attestor.log"),
            };
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            // File layer - always JSON for structured logging
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking_file)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .boxed(),
            );
            Some(guard)
        } else {
            None
        };

        layers.push(match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_span_events(FmtSpan::NONE)
                .boxed(),
        });

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::debug!(
            level = %config.level,
            format = ?config.format,
            file_output = config.log_dir.is_some(),
            debug = ?config.debug_subsystems,
            "logger initialized"
        );

        Ok(Self { _guard: guard })
    }
}

/// Env filter: `RUST_LOG` if set, else the configured level, plus a debug
/// directive for every target of each requested subsystem
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    let default_level = parse_log_level(&config.level)?;
    let mut filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    for target in debug_targets(&config.debug_subsystems) {
        let directive = format!("{target}=debug")
            .parse()
            .with_context(|| format!("Invalid log directive for {target}"))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

/// Log targets for the named subsystems; `all` selects every subsystem
pub fn debug_targets(subsystems: &[String]) -> Vec<&'static str> {
    let all = subsystems.iter().any(|s| s == "all");
    DEBUG_SUBSYSTEMS
        .iter()
        .filter(|(name, _)| all || subsystems.iter().any(|s| s == name))
        .flat_map(|(_, targets)| targets.iter().copied())
        .collect()
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::logging::config::parse_debug_list;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));
        assert!(matches!(parse_log_level("TRACE"), Ok(Level::TRACE)));
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_debug_targets() {
        let targets = debug_targets(&parse_debug_list("cache, git"));
        assert_eq!(
            targets,
            vec!["attestor::services::capability_cache", "attestor::infrastructure::git"]
        );
        assert_eq!(
            debug_targets(&["all".to_string()]).len(),
            DEBUG_SUBSYSTEMS.iter().map(|(_, t)| t.len()).sum::<usize>()
        );
        assert!(debug_targets(&[]).is_empty());
    }

    #[test]
    fn test_build_filter_with_subsystems() {
        let config = LogConfig {
            debug_subsystems: vec!["store".to_string()],
            ..LogConfig::default()
        };
        let filter = temp_env::with_var_unset("RUST_LOG", || build_filter(&config).unwrap());
        let rendered = filter.to_string();
        assert!(rendered.contains("attestor::services::verification_store=debug"));
        assert!(rendered.contains("info"));
    }

    #[test]
    fn test_logger_init_stdout_only() {
        let config = LogConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            log_dir: None,
            rotation: RotationPolicy::Never,
            debug_subsystems: vec!["cache".to_string()],
        };

        // Installs the global subscriber; the only test in this crate that does
        let result = LoggerImpl::init(&config);
        assert!(result.is_ok());
    }
}
