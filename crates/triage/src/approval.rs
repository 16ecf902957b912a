//! Operator approval for a proposed command.

use async_trait::async_trait;
use colored::Colorize;
use std::collections::VecDeque;
use std::io::Write as _;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::command::RemediationCommand;

/// The single accepted affirmative word.
pub const AFFIRMATIVE: &str = "yes";

/// Operator decision on a proposed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

/// Whether operator input approves the command.
///
/// Only `yes` in any letter case counts; surrounding whitespace, including
/// the trailing newline, is ignored. Everything else rejects.
#[must_use]
pub fn is_affirmative(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(AFFIRMATIVE)
}

impl Decision {
    #[must_use]
    pub fn from_input(input: &str) -> Self {
        if is_affirmative(input) {
            Self::Approve
        } else {
            Self::Reject
        }
    }
}

/// Blocking accept/reject port in front of command execution.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Present the exact command and wait for a decision.
    async fn decide(&self, command: &RemediationCommand) -> Decision;
}

/// Prompts on stdout and reads one line from stdin. No timeout.
#[derive(Debug, Default)]
pub struct StdinApproval;

#[async_trait]
impl ApprovalGate for StdinApproval {
    async fn decide(&self, command: &RemediationCommand) -> Decision {
        println!("\n{}", "Proposed fix:".bold());
        println!("  {}", command.to_string().yellow());
        print!("Apply this fix? Type '{AFFIRMATIVE}' to confirm: ");
        if let Err(e) = std::io::stdout().flush() {
            warn!(error = %e, "Failed to flush approval prompt");
        }

        let mut input = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut input).await {
            Ok(_) => Decision::from_input(&input),
            Err(e) => {
                warn!(error = %e, "Failed to read approval input, treating as rejection");
                Decision::Reject
            }
        }
    }
}

/// Replays scripted operator input and records every presented command.
///
/// Once the script is exhausted each further prompt reads as empty input.
#[derive(Debug, Default)]
pub struct ScriptedApproval {
    inputs: Mutex<VecDeque<String>>,
    presented: Mutex<Vec<String>>,
}

impl ScriptedApproval {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: Mutex::new(inputs.into_iter().map(Into::into).collect()),
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Commands shown to the operator so far.
    #[must_use]
    pub fn presented(&self) -> Vec<String> {
        self.presented
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ApprovalGate for ScriptedApproval {
    async fn decide(&self, command: &RemediationCommand) -> Decision {
        if let Ok(mut presented) = self.presented.lock() {
            presented.push(command.to_string());
        }
        let input = self
            .inputs
            .lock()
            .ok()
            .and_then(|mut inputs| inputs.pop_front())
            .unwrap_or_default();
        Decision::from_input(&input)
    }
}
