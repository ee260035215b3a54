//! AI agent port - "ask an agent" as a black box.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// A single prompt for the agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

/// What came back from the agent. Failures are values, never panics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentResponse {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub timed_out: bool,
}

impl AgentResponse {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            timed_out: false,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            timed_out: false,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(format!("agent timed out after {}s", after.as_secs())),
            timed_out: true,
        }
    }
}

/// Invokes an AI agent. Retry, timeout and process cleanup are the
/// implementation's responsibility.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn ask(&self, request: AgentRequest) -> AgentResponse;
}
