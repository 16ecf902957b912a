//! Error types for the triage crate.

use thiserror::Error;

/// Errors surfaced by the triage pipeline.
///
/// Most pipeline stages never return these: read failures degrade into
/// signal text and parse failures degrade into an empty intent. Only the
/// backend call, configuration loading and command execution are fallible.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Reasoning backend error: {reason}")]
    Backend { reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Prompt template error: {reason}")]
    Template { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command `{command}` failed: {output}")]
    Execution { command: String, output: String },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },
}

/// Result type alias for triage operations
pub type TriageResult<T> = Result<T, TriageError>;

impl TriageError {
    /// Build a backend error from any displayable reason.
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    /// Build a configuration error from any displayable reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Text describing the failure, preferring the failing tool's own output.
    #[must_use]
    pub fn diagnostic_text(&self) -> String {
        match self {
            Self::Execution { output, .. } if !output.trim().is_empty() => output.clone(),
            other => other.to_string(),
        }
    }
}
