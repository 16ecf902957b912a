//! Write side of the platform API.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::command::RemediationCommand;
use crate::error::TriageResult;
use crate::kubectl::run_program;

/// Applies an approved command. One attempt; failures are returned as-is.
#[async_trait]
pub trait PlatformWriter: Send + Sync {
    /// Execute the command and return its output.
    async fn apply(&self, command: &RemediationCommand) -> TriageResult<String>;
}

/// Executes commands as kubectl argv.
#[derive(Debug, Clone)]
pub struct KubectlWriter {
    timeout: Duration,
}

impl KubectlWriter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PlatformWriter for KubectlWriter {
    async fn apply(&self, command: &RemediationCommand) -> TriageResult<String> {
        info!(command = %command, "Applying fix");
        run_program(command.program(), command.args(), self.timeout).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::WorkloadConfig;
    use crate::error::TriageError;
    use crate::translator::FixTranslator;

    #[tokio::test]
    async fn test_apply_runs_argv() {
        // `echo` stands in for kubectl and prints the argv it received
        let cmd = FixTranslator::new(WorkloadConfig::new("shop", "web", "web"), "echo")
            .translate("SET_ENV", "GREETING=hello world")
            .unwrap();
        let out = KubectlWriter::new(Duration::from_secs(5)).apply(&cmd).await.unwrap();
        assert_eq!(out.trim(), "set env deployment/web GREETING=hello world -n shop");
    }

    #[tokio::test]
    async fn test_apply_failure_is_execution_error() {
        let cmd = FixTranslator::new(WorkloadConfig::default(), "false")
            .translate("SET_IMAGE", "nginx:latest")
            .unwrap();
        let err = KubectlWriter::new(Duration::from_secs(5)).apply(&cmd).await.unwrap_err();
        match err {
            TriageError::Execution { command, .. } => {
                assert!(command.starts_with("false set image deployment/demo-app"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
