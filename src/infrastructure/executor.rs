//! Shell-backed [`CheckExecutor`].

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::domain::models::{AutomatedCheckResult, CheckType, ChecksConfig};
use crate::domain::ports::CheckExecutor;
use crate::services::checks::parse_error_count;

/// Runs check commands through the platform shell.
#[derive(Debug, Clone)]
pub struct ShellCheckExecutor {
    timeout: Duration,
    max_output_chars: usize,
}

impl ShellCheckExecutor {
    pub fn new(config: &ChecksConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_output_chars: config.max_output_chars,
        }
    }

    fn shell(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }

    /// Keep the tail of long output; failures are reported at the end.
    fn clip(&self, output: String) -> String {
        let total = output.chars().count();
        if total <= self.max_output_chars {
            return output;
        }
        let skip = total - self.max_output_chars;
        let tail: String = output.chars().skip(skip).collect();
        format!("... [{skip} characters omitted]\n{tail}")
    }
}

#[async_trait]
impl CheckExecutor for ShellCheckExecutor {
    #[instrument(skip(self, env), fields(check = %check_type))]
    async fn run(
        &self,
        cwd: &Path,
        check_type: CheckType,
        command: &str,
        env: &[(String, String)],
    ) -> AutomatedCheckResult {
        let started = Instant::now();
        let elapsed_ms = || u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let child = Self::shell(command)
            .current_dir(cwd)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(err) => {
                warn!(%command, error = %err, "failed to spawn check");
                return AutomatedCheckResult::failed(
                    check_type,
                    format!("failed to spawn `{command}`: {err}"),
                    Some(elapsed_ms()),
                );
            }
        };

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return AutomatedCheckResult::failed(
                    check_type,
                    format!("`{command}` failed: {err}"),
                    Some(elapsed_ms()),
                );
            }
            Err(_) => {
                warn!(%command, timeout_secs = self.timeout.as_secs(), "check timed out");
                return AutomatedCheckResult::failed(
                    check_type,
                    format!("`{command}` timed out after {}s", self.timeout.as_secs()),
                    Some(elapsed_ms()),
                );
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        let success = output.status.success();
        let error_count = parse_error_count(check_type, &combined);
        let duration = elapsed_ms();
        debug!(%command, success, ?error_count, duration_ms = duration, "check finished");

        AutomatedCheckResult {
            check_type,
            success,
            duration: Some(duration),
            error_count,
            output: Some(self.clip(combined)),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn executor(timeout_secs: u64, max_output_chars: usize) -> ShellCheckExecutor {
        ShellCheckExecutor::new(&ChecksConfig {
            timeout_secs,
            max_output_chars,
            ..ChecksConfig::default()
        })
    }

    #[tokio::test]
    async fn successful_command_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let result = executor(10, 1_000)
            .run(dir.path(), CheckType::Build, "echo built", &[])
            .await;
        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("built\n"));
        assert!(result.duration.is_some());
    }

    #[tokio::test]
    async fn failing_command_reports_stderr_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let env = vec![("CI".to_string(), "true".to_string())];
        let result = executor(10, 1_000)
            .run(dir.path(), CheckType::Lint, "echo \"ci=$CI\" >&2; exit 1", &env)
            .await;
        assert!(!result.success);
        assert!(result.output.unwrap().contains("ci=true"));
    }

    #[tokio::test]
    async fn error_count_is_parsed_from_output() {
        let dir = tempfile::tempdir().unwrap();
        let result = executor(10, 1_000)
            .run(dir.path(), CheckType::Typecheck, "echo 'Found 4 errors.'; exit 2", &[])
            .await;
        assert_eq!(result.error_count, Some(4));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let exec = ShellCheckExecutor {
            timeout: Duration::from_millis(100),
            max_output_chars: 1_000,
        };
        let result = exec.run(dir.path(), CheckType::Test, "sleep 5", &[]).await;
        assert!(!result.success);
        assert!(result.output.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn long_output_keeps_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        let result = executor(10, 5)
            .run(dir.path(), CheckType::Test, "printf 'abcdefghij'", &[])
            .await;
        let output = result.output.unwrap();
        assert!(output.starts_with("... [5 characters omitted]"));
        assert!(output.ends_with("fghij"));
    }
}
