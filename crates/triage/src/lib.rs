//! # Triage
//!
//! Closed-loop diagnosis and remediation for a single failing workload.
//!
//! A run collects the workload's status, logs and events, asks a reasoning
//! backend to classify the failure into one of a closed set of fix types,
//! turns that intent into one idempotent kubectl command (or falls back to
//! fixed signal patterns when the backend is unusable), and executes the
//! command only after the operator types `yes`.
//!
//! ```rust,ignore
//! use triage::{Orchestrator, Ports, TriageConfig};
//!
//! let config = TriageConfig::load(None)?;
//! let report = Orchestrator::new(&config, Ports::live(&config))?.run().await?;
//! std::process::exit(report.outcome.exit_code().into());
//! ```

pub mod approval;
pub mod backend;
pub mod classifier;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod fallback;
pub mod intent;
pub mod kubectl;
pub mod orchestrator;
pub mod parser;
pub mod signals;
pub mod translator;

pub use approval::{ApprovalGate, Decision, ScriptedApproval, StdinApproval};
pub use backend::ReasoningBackend;
pub use command::RemediationCommand;
pub use config::{TriageConfig, WorkloadConfig};
pub use error::{TriageError, TriageResult};
pub use executor::PlatformWriter;
pub use fallback::FallbackClassifier;
pub use intent::{FixType, Intent};
pub use orchestrator::{Analysis, IntentSource, Orchestrator, Ports, RunOutcome, RunReport, RunStage};
pub use parser::{parse_labels, parse_response, ParsedResponse};
pub use signals::{PlatformReader, SignalBundle, SignalCollector};
pub use translator::FixTranslator;
