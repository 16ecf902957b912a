//! Run orchestration.
//!
//! A run moves strictly forward through
//! `Collecting → Classifying → Parsing → Translating → [Fallback] →
//! (TerminalNoFix | AwaitingApproval → Applied | Skipped)`.
//! There are no retries and no transitions back to an earlier stage; a
//! backend failure jumps straight from `Classifying` to `Fallback`.

use chrono::{DateTime, Utc};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::approval::{ApprovalGate, Decision, StdinApproval};
use crate::backend::{build_backend, ReasoningBackend};
use crate::classifier::{IntentClassifier, PromptRenderer};
use crate::command::RemediationCommand;
use crate::config::{TriageConfig, WorkloadConfig};
use crate::error::TriageResult;
use crate::executor::{KubectlWriter, PlatformWriter};
use crate::fallback::FallbackClassifier;
use crate::intent::Intent;
use crate::kubectl::Kubectl;
use crate::parser::parse_response;
use crate::signals::{KubectlReader, PlatformReader, SignalBundle, SignalCollector};
use crate::translator::FixTranslator;

/// Stages a run passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Collecting,
    Classifying,
    Parsing,
    Translating,
    Fallback,
    AwaitingApproval,
    Applied,
    Skipped,
    TerminalNoFix,
}

/// Terminal result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The approved command was executed
    Applied,
    /// The operator declined the command
    Skipped,
    /// Neither classification path produced a command
    NoFix,
}

impl RunOutcome {
    /// Process exit code: only `NoFix` is a failure.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Applied | Self::Skipped => 0,
            Self::NoFix => 1,
        }
    }
}

/// Which classification path produced the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentSource {
    Primary,
    Fallback { rule: String },
}

/// What the reasoning backend returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    /// Raw reply text
    Reply(String),
    /// The call failed; the primary path was abandoned
    Failed(String),
}

/// Everything a run observed and decided.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub workload: WorkloadConfig,
    pub signals: SignalBundle,
    pub analysis: Analysis,
    /// Intent parsed from the reply, or produced by a fallback rule
    pub intent: Option<Intent>,
    pub source: Option<IntentSource>,
    pub command: Option<RemediationCommand>,
    /// Output of the executed command
    pub execution_output: Option<String>,
    pub outcome: RunOutcome,
    pub stages: Vec<RunStage>,
}

/// External collaborators of a run.
pub struct Ports {
    pub reader: Arc<dyn PlatformReader>,
    pub backend: Arc<dyn ReasoningBackend>,
    pub approval: Arc<dyn ApprovalGate>,
    pub writer: Arc<dyn PlatformWriter>,
}

impl Ports {
    /// kubectl for reads and writes, the configured backend, stdin approval.
    pub fn live(config: &TriageConfig) -> Self {
        let kubectl = Kubectl::new(config.kubectl_binary());
        Self {
            reader: Arc::new(KubectlReader::new(
                kubectl,
                config.workload.clone(),
                config.signals.clone(),
                Duration::from_secs(config.timeouts.read_secs),
            )),
            backend: build_backend(&config.backend),
            approval: Arc::new(StdinApproval),
            writer: Arc::new(KubectlWriter::new(Duration::from_secs(
                config.timeouts.exec_secs,
            ))),
        }
    }
}

/// Sequences one run through every stage.
pub struct Orchestrator {
    workload: WorkloadConfig,
    collector: SignalCollector,
    classifier: IntentClassifier,
    translator: FixTranslator,
    fallback: FallbackClassifier,
    approval: Arc<dyn ApprovalGate>,
    writer: Arc<dyn PlatformWriter>,
    echo: bool,
}

impl Orchestrator {
    /// Assemble a run from configuration and its external ports.
    pub fn new(config: &TriageConfig, ports: Ports) -> TriageResult<Self> {
        let renderer = match &config.prompt_template {
            Some(path) => PromptRenderer::from_file(path, config.signals.max_signal_chars)?,
            None => PromptRenderer::new(config.signals.max_signal_chars)?,
        };
        let translator = FixTranslator::new(config.workload.clone(), config.kubectl_binary());

        Ok(Self {
            workload: config.workload.clone(),
            collector: SignalCollector::new(ports.reader, config.workload.clone()),
            classifier: IntentClassifier::new(
                ports.backend,
                renderer,
                Duration::from_secs(config.timeouts.backend_secs),
            ),
            fallback: FallbackClassifier::new(&config.fallback, translator.clone()),
            translator,
            approval: ports.approval,
            writer: ports.writer,
            echo: true,
        })
    }

    /// Print signals and analysis to stdout (on by default).
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Execute one run to a terminal outcome.
    ///
    /// Only a failed command execution is returned as an error; every other
    /// failure degrades into the report.
    pub async fn run(&self) -> TriageResult<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "run",
            %run_id,
            namespace = %self.workload.namespace,
            deployment = %self.workload.deployment
        );
        self.run_stages(run_id).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid) -> TriageResult<RunReport> {
        let started_at = Utc::now();
        let mut stages = vec![RunStage::Collecting];

        let signals = self.collector.collect().await;
        self.section("Status", signals.status_text());
        self.section("Logs", signals.log_text());
        self.section("Events", signals.event_text());

        stages.push(RunStage::Classifying);
        let analysis = match self
            .classifier
            .classify(signals.log_text(), signals.event_text())
            .await
        {
            Ok(reply) => Analysis::Reply(reply),
            Err(e) => {
                warn!(error = %e, "Primary classification failed, using fallback");
                Analysis::Failed(e.to_string())
            }
        };

        let mut intent = None;
        let mut source = None;
        let mut command = None;

        match &analysis {
            Analysis::Reply(reply) => {
                self.section("Analysis", reply);
                stages.push(RunStage::Parsing);
                let parsed = parse_response(reply);

                stages.push(RunStage::Translating);
                if let Some(parsed_intent) = parsed.intent() {
                    info!(fix_type = %parsed_intent.fix_type, "Parsed intent");
                    command = self.translator.translate_intent(parsed_intent);
                    if command.is_some() {
                        source = Some(IntentSource::Primary);
                    }
                    intent = Some(parsed_intent.clone());
                } else {
                    info!("Backend reply did not follow the label grammar");
                }
            }
            Analysis::Failed(reason) => {
                self.section("Analysis", &format!("Reasoning backend unavailable: {reason}"));
            }
        }

        if command.is_none() {
            stages.push(RunStage::Fallback);
            if let Some((matched, fallback_command)) =
                self.fallback.propose(signals.log_text(), signals.event_text())
            {
                info!(rule = %matched.rule, "Fallback rule produced a fix");
                intent = Some(matched.intent);
                source = Some(IntentSource::Fallback { rule: matched.rule });
                command = Some(fallback_command);
            }
        }

        let mut report = RunReport {
            run_id,
            started_at,
            finished_at: started_at,
            workload: self.workload.clone(),
            signals,
            analysis,
            intent,
            source,
            command: None,
            execution_output: None,
            outcome: RunOutcome::NoFix,
            stages,
        };

        let Some(command) = command else {
            report.stages.push(RunStage::TerminalNoFix);
            report.finished_at = Utc::now();
            warn!("No actionable fix found");
            if self.echo {
                println!("\n{}", "No actionable fix found.".red().bold());
            }
            return Ok(report);
        };

        report.stages.push(RunStage::AwaitingApproval);
        match self.approval.decide(&command).await {
            Decision::Approve => {
                let output = self.writer.apply(&command).await?;
                if self.echo {
                    println!("{}", "Fix applied.".green().bold());
                    if !output.trim().is_empty() {
                        println!("{}", output.trim_end());
                    }
                }
                info!(command = %command, "Fix applied");
                report.execution_output = Some(output);
                report.outcome = RunOutcome::Applied;
                report.stages.push(RunStage::Applied);
            }
            Decision::Reject => {
                info!(command = %command, "Fix skipped by operator");
                if self.echo {
                    println!("{}", "Fix skipped.".yellow());
                }
                report.outcome = RunOutcome::Skipped;
                report.stages.push(RunStage::Skipped);
            }
        }
        report.command = Some(command);

        report.finished_at = Utc::now();
        Ok(report)
    }

    fn section(&self, title: &str, body: &str) {
        if !self.echo {
            return;
        }
        println!("\n{}", format!("=== {title} ===").cyan().bold());
        if body.trim().is_empty() {
            println!("{}", "(empty)".dimmed());
        } else {
            println!("{}", body.trim_end());
        }
    }
}
