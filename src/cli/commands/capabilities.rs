//! `attestor capabilities` and `attestor cache`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{CapabilitySnapshot, CapabilitySource};
use crate::services::DetectOptions;

#[derive(Args, Debug)]
pub struct CapabilitiesArgs {
    /// Ignore cached capabilities and rediscover
    #[arg(short, long)]
    pub force: bool,

    /// Log cache tier decisions
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Drop the memory and disk capability cache
    Clear,
}

#[derive(Debug, Serialize)]
pub struct CapabilitiesOutput {
    pub project: String,
    #[serde(flatten)]
    pub capabilities: CapabilitySnapshot,
}

impl CommandOutput for CapabilitiesOutput {
    fn to_human(&self) -> String {
        let source = match self.capabilities.source {
            CapabilitySource::Cached => "cached",
            CapabilitySource::Discovered => "discovered",
        };
        let mut lines = vec![
            format!("Project: {}", self.project),
            format!(
                "Source: {source} at {}",
                self.capabilities.detected_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        ];
        if !self.capabilities.languages.is_empty() {
            lines.push(format!("Languages: {}", self.capabilities.languages.join(", ")));
        }
        lines.push(TableFormatter::new().format_capabilities(&self.capabilities));
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct CacheClearOutput {
    pub cleared: bool,
    pub path: String,
}

impl CommandOutput for CacheClearOutput {
    fn to_human(&self) -> String {
        format!("Capability cache cleared ({})", self.path)
    }
}

pub async fn execute(args: CapabilitiesArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let capabilities = ctx
        .capabilities
        .detect(
            &ctx.project,
            DetectOptions {
                force: args.force,
                verbose: args.verbose,
            },
        )
        .await
        .context("Capability detection failed")?;

    let out = CapabilitiesOutput {
        project: ctx.project.display().to_string(),
        capabilities,
    };
    output(&out, json_mode);
    Ok(())
}

pub fn execute_cache(args: CacheArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        CacheCommands::Clear => {
            ctx.capabilities
                .invalidate(&ctx.project)
                .context("Failed to clear capability cache")?;
            let out = CacheClearOutput {
                cleared: true,
                path: ctx.capabilities.disk().path(&ctx.project).display().to_string(),
            };
            output(&out, json_mode);
        }
    }
    Ok(())
}
