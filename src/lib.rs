//! Attestor - feature verification orchestrator
//!
//! Attestor decides whether a feature of a codebase is verified. It works out
//! how a project is tested, type-checked, linted and built (and caches that),
//! maps changed files to the tests worth running, runs the checks, asks an AI
//! agent for a judgment when tests alone cannot decide, and appends every
//! result to a durable, per-feature run history.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, port traits and errors
//! - **Service Layer** (`services`): Capability cache, test discovery, checks,
//!   judgment, verification store and orchestrator
//! - **Infrastructure Layer** (`infrastructure`): Git, agent CLI, shell
//!   execution, capability discovery, configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use attestor::cli::AppContext;
//! use attestor::domain::models::Feature;
//! use attestor::services::VerifyOptions;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = AppContext::load(std::path::Path::new("."))?;
//!     let feature = Feature::new("auth.login", "Users can log in");
//!     let outcome = ctx
//!         .orchestrator()
//!         .verify(&ctx.project, &feature, VerifyOptions::default())
//!         .await?;
//!     println!("{}", outcome.result.verdict);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    CapabilitySnapshot, Config, Feature, Verdict, VerificationMetadata, VerificationResult,
};
pub use domain::ports::{AgentProvider, CapabilityDiscovery, CheckExecutor, VersionControl};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CapabilityCache, TestDiscovery, VerificationOrchestrator, VerificationStore,
};
