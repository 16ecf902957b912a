//! Thin async wrapper over the kubectl binary.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::command::quote_arg;
use crate::error::{TriageError, TriageResult};

/// Runs kubectl invocations as argv with a deadline.
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: String,
}

impl Kubectl {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run kubectl and return stdout.
    ///
    /// A non-zero exit becomes [`TriageError::Execution`] carrying the
    /// process's own output. The child is killed if the deadline passes.
    pub async fn run<S: AsRef<str>>(&self, args: &[S], limit: Duration) -> TriageResult<String> {
        run_program(&self.binary, args, limit).await
    }
}

/// Shell-style rendering of an invocation, for messages.
pub(crate) fn render<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|a| a.as_ref()))
        .map(quote_arg)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) async fn run_program<S: AsRef<str>>(
    program: &str,
    args: &[S],
    limit: Duration,
) -> TriageResult<String> {
    let rendered = render(program, args);
    debug!(command = %rendered, "Running");

    let child = Command::new(program)
        .args(args.iter().map(|a| a.as_ref()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| TriageError::Execution {
            command: rendered.clone(),
            output: format!("failed to start {program}: {e}"),
        })?;

    let output = tokio::time::timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| TriageError::Timeout {
            operation: rendered.clone(),
            secs: limit.as_secs(),
        })??;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut text = [stderr.trim(), stdout.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        text = format!("{program} exited with {}", output.status);
    }

    Err(TriageError::Execution {
        command: rendered,
        output: text,
    })
}
