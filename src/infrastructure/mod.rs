//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports:
//! - Git version control (`git` CLI)
//! - Agent CLI invocation with timeout and retry
//! - Shell execution of check commands
//! - Capability discovery (manifests, agent)
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod agent;
pub mod config;
pub mod discovery;
pub mod executor;
pub mod git;
pub mod logging;

pub use agent::AgentCli;
pub use discovery::{AgentCapabilityDiscovery, ManifestCapabilityDiscovery};
pub use executor::ShellCheckExecutor;
pub use git::GitCli;
