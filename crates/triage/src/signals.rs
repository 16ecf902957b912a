//! Signal collection for the target workload.
//!
//! Each read is attempted exactly once. A failed read never aborts the run:
//! the failure's own output (for example `pods "web" not found`) becomes the
//! signal text, since it is itself diagnostic.
//!
//! Events are read namespace-wide and then scoped to the workload: only lines
//! naming the deployment, one of its ReplicaSets or one of its pods are kept.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{SignalOptions, WorkloadConfig};
use crate::error::TriageResult;
use crate::kubectl::Kubectl;

/// Immutable snapshot of the workload's runtime signals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalBundle {
    status_text: String,
    log_text: String,
    event_text: String,
}

impl SignalBundle {
    pub fn new(
        status_text: impl Into<String>,
        log_text: impl Into<String>,
        event_text: impl Into<String>,
    ) -> Self {
        Self {
            status_text: status_text.into(),
            log_text: log_text.into(),
            event_text: event_text.into(),
        }
    }

    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    #[must_use]
    pub fn log_text(&self) -> &str {
        &self.log_text
    }

    #[must_use]
    pub fn event_text(&self) -> &str {
        &self.event_text
    }
}

/// Read side of the platform API.
#[async_trait]
pub trait PlatformReader: Send + Sync {
    async fn status(&self) -> TriageResult<String>;
    async fn logs(&self) -> TriageResult<String>;
    async fn events(&self) -> TriageResult<String>;
}

/// Reads workload signals through kubectl.
#[derive(Debug, Clone)]
pub struct KubectlReader {
    kubectl: Kubectl,
    workload: WorkloadConfig,
    options: SignalOptions,
    timeout: Duration,
}

impl KubectlReader {
    pub fn new(
        kubectl: Kubectl,
        workload: WorkloadConfig,
        options: SignalOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            kubectl,
            workload,
            options,
            timeout,
        }
    }

    fn status_args(&self) -> Vec<String> {
        vec![
            "get".into(),
            "pods".into(),
            "-n".into(),
            self.workload.namespace.clone(),
            "-l".into(),
            self.workload.pod_selector(),
            "-o".into(),
            "wide".into(),
        ]
    }

    fn logs_args(&self) -> Vec<String> {
        vec![
            "logs".into(),
            self.workload.deployment_ref(),
            "-c".into(),
            self.workload.container.clone(),
            "-n".into(),
            self.workload.namespace.clone(),
            format!("--tail={}", self.options.log_tail),
        ]
    }

    fn events_args(&self) -> Vec<String> {
        vec![
            "get".into(),
            "events".into(),
            "-n".into(),
            self.workload.namespace.clone(),
            "--sort-by=.lastTimestamp".into(),
        ]
    }
}

#[async_trait]
impl PlatformReader for KubectlReader {
    async fn status(&self) -> TriageResult<String> {
        self.kubectl.run(&self.status_args(), self.timeout).await
    }

    async fn logs(&self) -> TriageResult<String> {
        self.kubectl.run(&self.logs_args(), self.timeout).await
    }

    async fn events(&self) -> TriageResult<String> {
        self.kubectl.run(&self.events_args(), self.timeout).await
    }
}

/// Gathers the three signal blobs, degrading read failures into text.
#[derive(Clone)]
pub struct SignalCollector {
    reader: Arc<dyn PlatformReader>,
    workload: WorkloadConfig,
}

impl SignalCollector {
    pub fn new(reader: Arc<dyn PlatformReader>, workload: WorkloadConfig) -> Self {
        Self { reader, workload }
    }

    /// Read status, logs and events once each, in that order.
    pub async fn collect(&self) -> SignalBundle {
        let status = degrade("status", self.reader.status().await);
        let logs = degrade("logs", self.reader.logs().await);
        let events = degrade(
            "events",
            self.reader
                .events()
                .await
                .map(|text| scope_events(&text, &self.workload)),
        );
        SignalBundle::new(status, logs, events)
    }
}

/// Keep the header and the event lines that reference the workload's own
/// objects. Events about other workloads in the namespace are dropped.
pub fn scope_events(text: &str, workload: &WorkloadConfig) -> String {
    let mut dropped = 0usize;
    let kept: Vec<&str> = text
        .lines()
        .enumerate()
        .filter(|(i, line)| {
            let keep = (*i == 0 && line.starts_with("LAST SEEN"))
                || line.split_whitespace().any(|token| workload.owns_object(token));
            if !keep && !line.trim().is_empty() {
                dropped += 1;
            }
            keep
        })
        .map(|(_, line)| line)
        .collect();

    if dropped > 0 {
        debug!(dropped, "Dropped events for other workloads");
    }
    if kept.len() == 1 && kept[0].starts_with("LAST SEEN") {
        return String::new();
    }
    kept.join("\n")
}

fn degrade(signal: &str, result: TriageResult<String>) -> String {
    match result {
        Ok(text) => {
            debug!(signal, bytes = text.len(), "Collected signal");
            text
        }
        Err(e) => {
            warn!(signal, error = %e, "Signal read failed, using failure output as signal");
            e.diagnostic_text()
        }
    }
}
