//! Command-line interface
//!
//! `attestor` verifies features against a project and inspects the stored
//! results. Every command accepts `--json` for machine-readable output and
//! `--project` to point at a project other than the current directory.

pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "attestor")]
#[command(about = "Attestor - feature verification with cached capabilities and durable results", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Project root
    #[arg(short, long, global = true, default_value = ".", env = "ATTESTOR_PROJECT")]
    pub project: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify a feature and record the result
    Verify(commands::verify::VerifyArgs),

    /// Show how the project is tested, type-checked, linted and built
    Capabilities(commands::capabilities::CapabilitiesArgs),

    /// Capability cache maintenance
    Cache(commands::capabilities::CacheArgs),

    /// Every recorded run of a feature
    History {
        /// Feature id
        feature_id: String,
    },

    /// The latest result of a feature
    Last {
        /// Feature id
        feature_id: String,
    },

    /// Feature counts by latest verdict
    Stats,

    /// Delete every recorded run of a feature
    Clear {
        /// Feature id
        feature_id: String,
    },

    /// Migrate a legacy results file into the run store
    Migrate,
}

/// Dispatch a parsed command.
pub async fn run(cli: Cli, ctx: &AppContext) -> Result<ExitCode> {
    let json = cli.json;
    match cli.command {
        Commands::Verify(args) => commands::verify::execute(args, ctx, json).await,
        Commands::Capabilities(args) => {
            commands::capabilities::execute(args, ctx, json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cache(args) => {
            commands::capabilities::execute_cache(args, ctx, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::History { feature_id } => {
            commands::results::history(ctx, &feature_id, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Last { feature_id } => commands::results::last(ctx, &feature_id, json),
        Commands::Stats => {
            commands::results::stats(ctx, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Clear { feature_id } => {
            commands::results::clear(ctx, &feature_id, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Migrate => {
            commands::results::migrate(ctx, json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Report a fatal error in the selected output format.
pub fn handle_error(err: &anyhow::Error, json: bool) -> ExitCode {
    if json {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["attestor", "history", "auth.login", "--json", "-p", "/tmp"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.project, PathBuf::from("/tmp"));
        assert!(matches!(cli.command, Commands::History { feature_id } if feature_id == "auth.login"));
    }

    #[test]
    fn verify_flags_parse() {
        let cli = Cli::try_parse_from([
            "attestor",
            "verify",
            "feature.json",
            "--test-mode",
            "full",
            "--skip-e2e",
        ])
        .unwrap();
        let Commands::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert!(args.skip_e2e);
        assert!(!args.skip_checks);
        assert_eq!(args.feature, PathBuf::from("feature.json"));
    }
}
