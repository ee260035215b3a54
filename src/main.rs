//! Attestor CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use attestor::cli::{handle_error, run, AppContext, Cli};
use attestor::infrastructure::logging::{LogConfig, LoggerImpl, DEBUG_ENV_VAR};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    let ctx = match AppContext::load(&cli.project) {
        Ok(ctx) => ctx,
        Err(err) => return handle_error(&err, json),
    };

    let debug_env = std::env::var(DEBUG_ENV_VAR).ok();
    let log_config = LogConfig::from_settings(&ctx.config.logging, debug_env.as_deref());
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => logger,
        Err(err) => return handle_error(&err, json),
    };

    match run(cli, &ctx).await {
        Ok(code) => code,
        Err(err) => handle_error(&err, json),
    }
}
