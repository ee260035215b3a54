//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that infrastructure adapters implement:
//! - VersionControl: commit hash, changed files and diffs
//! - CapabilityDiscovery: how to test/typecheck/lint/build a project
//! - AgentProvider: "ask an agent" with timeout
//! - CheckExecutor: run a verification command
//! - Clock: time source for cache TTLs
//!
//! These traits keep the services independent of git, subprocesses and the
//! wall clock.

pub mod agent;
pub mod capability_discovery;
pub mod check_executor;
pub mod clock;
pub mod version_control;

pub use agent::{AgentProvider, AgentRequest, AgentResponse};
pub use capability_discovery::{CapabilityDiscovery, DiscoveredCapabilities};
pub use check_executor::CheckExecutor;
pub use clock::{Clock, SystemClock};
pub use version_control::VersionControl;
