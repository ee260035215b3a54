//! Agent CLI provider
//!
//! Shells out to an agent binary (the `claude` CLI by default), pipes the
//! prompt on stdin and reads the answer from stdout. The binary must be
//! installed and authenticated separately.
//!
//! Failed invocations are retried with exponential backoff. A timeout is
//! final: the child is killed and the caller gets a timed-out response.

use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::domain::models::AgentConfig;
use crate::domain::ports::{AgentProvider, AgentRequest, AgentResponse};

#[derive(Debug, Error)]
enum InvokeError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("agent I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("agent exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("agent produced no output")]
    Empty,

    #[error("timed out")]
    Timeout,
}

/// Agent CLI invocation with retry
#[derive(Debug, Clone)]
pub struct AgentCli {
    program: String,
    args: Vec<String>,
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl AgentCli {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// One attempt: spawn, write the prompt, wait for exit within the timeout.
    async fn invoke(&self, request: &AgentRequest) -> Result<String, InvokeError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&request.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvokeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let prompt = request.prompt.as_bytes();
        let run = async move {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(prompt).await?;
                stdin.shutdown().await?;
            }
            child.wait_with_output().await
        };

        // Dropping the future on timeout drops the child, which kills it
        let output = match timeout(request.timeout, run).await {
            Ok(output) => output?,
            Err(_) => return Err(InvokeError::Timeout),
        };

        if !output.status.success() {
            return Err(InvokeError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(InvokeError::Empty);
        }
        Ok(stdout)
    }
}

#[async_trait]
impl AgentProvider for AgentCli {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self, request), fields(agent = %self.program, timeout_secs = request.timeout.as_secs()))]
    async fn ask(&self, request: AgentRequest) -> AgentResponse {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build();

        let attempts = AtomicU32::new(0);
        let (this, request_ref, attempts_ref) = (self, &request, &attempts);
        let result = backoff::future::retry(policy, || async move {
            let attempt = attempts_ref.fetch_add(1, Ordering::SeqCst);
            debug!(attempt, "invoking agent");
            match this.invoke(request_ref).await {
                Ok(output) => Ok(output),
                Err(InvokeError::Timeout) => Err(backoff::Error::permanent(InvokeError::Timeout)),
                Err(err) if attempt >= this.max_retries => Err(backoff::Error::permanent(err)),
                Err(err) => {
                    warn!(attempt, error = %err, "agent invocation failed; retrying");
                    Err(backoff::Error::transient(err))
                }
            }
        })
        .await;

        match result {
            Ok(output) => AgentResponse::ok(output),
            Err(InvokeError::Timeout) => {
                warn!("agent timed out; child process killed");
                AgentResponse::timeout(request.timeout)
            }
            Err(err) => {
                warn!(error = %err, attempts = attempts.load(Ordering::SeqCst), "agent invocation failed");
                AgentResponse::failed(err.to_string())
            }
        }
    }
}
