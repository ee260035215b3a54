//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty output on stderr
//! - Optional rolling JSON file output
//! - Per-subsystem debug toggles (`ATTESTOR_DEBUG=cache,store`)

pub mod config;
pub mod logger;

pub use config::{parse_debug_list, LogConfig, LogFormat, RotationPolicy, DEBUG_ENV_VAR};
pub use logger::{build_filter, debug_targets, LoggerImpl, DEBUG_SUBSYSTEMS};
