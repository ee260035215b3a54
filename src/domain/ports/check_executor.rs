//! Check executor port.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::models::{AutomatedCheckResult, CheckType};

/// Runs one verification command and reports its outcome.
///
/// A failing or unspawnable command is a failed result, not an error.
#[async_trait]
pub trait CheckExecutor: Send + Sync {
    async fn run(
        &self,
        cwd: &Path,
        check_type: CheckType,
        command: &str,
        env: &[(String, String)],
    ) -> AutomatedCheckResult;
}
