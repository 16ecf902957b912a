//! End-to-end runs of the triage pipeline against scripted collaborators.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use triage::{
    Analysis, FixType, IntentSource, Orchestrator, PlatformReader, PlatformWriter, Ports,
    ReasoningBackend, RemediationCommand, RunOutcome, RunStage, ScriptedApproval, TriageConfig,
    TriageError, TriageResult, WorkloadConfig,
};

struct StaticReader {
    status: String,
    logs: String,
    events: String,
}

impl StaticReader {
    fn new(status: &str, logs: &str, events: &str) -> Arc<Self> {
        Arc::new(Self {
            status: status.to_string(),
            logs: logs.to_string(),
            events: events.to_string(),
        })
    }
}

#[async_trait]
impl PlatformReader for StaticReader {
    async fn status(&self) -> TriageResult<String> {
        Ok(self.status.clone())
    }

    async fn logs(&self) -> TriageResult<String> {
        Ok(self.logs.clone())
    }

    async fn events(&self) -> TriageResult<String> {
        Ok(self.events.clone())
    }
}

/// Reader whose every query fails, like a cluster that cannot be reached.
struct UnreachableReader;

#[async_trait]
impl PlatformReader for UnreachableReader {
    async fn status(&self) -> TriageResult<String> {
        Err(unreachable_error())
    }

    async fn logs(&self) -> TriageResult<String> {
        Err(unreachable_error())
    }

    async fn events(&self) -> TriageResult<String> {
        Err(unreachable_error())
    }
}

fn unreachable_error() -> TriageError {
    TriageError::Execution {
        command: "kubectl".to_string(),
        output: String::new(),
    }
}

enum Reply {
    Text(&'static str),
    Down,
}

struct ScriptedBackend {
    reply: Reply,
    calls: Mutex<u32>,
}

impl ScriptedBackend {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str) -> TriageResult<String> {
        *self.calls.lock().unwrap() += 1;
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Down => Err(TriageError::backend("connection refused")),
        }
    }
}

#[derive(Default)]
struct RecordingWriter {
    applied: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingWriter {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformWriter for RecordingWriter {
    async fn apply(&self, command: &RemediationCommand) -> TriageResult<String> {
        self.applied.lock().unwrap().push(command.to_string());
        if self.fail {
            return Err(TriageError::Execution {
                command: command.to_string(),
                output: "Error from server (Forbidden): deployments.apps \"web\" is forbidden"
                    .to_string(),
            });
        }
        Ok("deployment.apps/web updated".to_string())
    }
}

struct Harness {
    backend: Arc<ScriptedBackend>,
    approval: Arc<ScriptedApproval>,
    writer: Arc<RecordingWriter>,
    orchestrator: Orchestrator,
}

fn harness(
    reader: Arc<dyn PlatformReader>,
    reply: Reply,
    operator_input: &str,
    writer: RecordingWriter,
) -> Harness {
    let mut config = TriageConfig::default();
    config.workload = WorkloadConfig::new("shop", "web", "web");

    let backend = ScriptedBackend::new(reply);
    let approval = Arc::new(ScriptedApproval::new([operator_input]));
    let writer = Arc::new(writer);
    let ports = Ports {
        reader,
        backend: backend.clone(),
        approval: approval.clone(),
        writer: writer.clone(),
    };
    let orchestrator = Orchestrator::new(&config, ports).unwrap().with_echo(false);

    Harness {
        backend,
        approval,
        writer,
        orchestrator,
    }
}

#[tokio::test]
async fn garbage_reply_falls_back_to_image_fix() {
    let h = harness(
        StaticReader::new(
            "web-7d9f5c-x2k4p   0/1   ImagePullBackOff",
            "",
            "Warning  Failed  pod/web-7d9f5c-x2k4p  Error: ImagePullBackOff",
        ),
        Reply::Text("I think the cluster is sad ¯\\_(ツ)_/¯"),
        "yes",
        RecordingWriter::default(),
    );

    let report = h.orchestrator.run().await.unwrap();

    assert_eq!(
        report.source,
        Some(IntentSource::Fallback {
            rule: "image-pull-backoff".to_string()
        })
    );
    let expected = "kubectl set image deployment/web web=nginx:latest -n shop";
    assert_eq!(h.approval.presented(), [expected]);
    assert_eq!(h.writer.applied(), [expected]);
    assert_eq!(report.outcome, RunOutcome::Applied);
    assert_eq!(
        report.stages,
        [
            RunStage::Collecting,
            RunStage::Classifying,
            RunStage::Parsing,
            RunStage::Translating,
            RunStage::Fallback,
            RunStage::AwaitingApproval,
            RunStage::Applied,
        ]
    );
}

#[tokio::test]
async fn well_formed_reply_bypasses_fallback() {
    // The events would trigger the fallback image rule if it ran
    let h = harness(
        StaticReader::new(
            "",
            "java.lang.OutOfMemoryError",
            "Warning  Failed  pod/web-7d9f5c-x2k4p  Error: ImagePullBackOff",
        ),
        Reply::Text(
            "ISSUE: Container restarts under load\n\
             ROOT_CAUSE: Heap exceeds the memory limit\n\
             FIX_TYPE: SET_MEMORY\n\
             FIX_VALUE: 256Mi",
        ),
        "YES",
        RecordingWriter::default(),
    );

    let report = h.orchestrator.run().await.unwrap();

    assert_eq!(report.source, Some(IntentSource::Primary));
    assert!(!report.stages.contains(&RunStage::Fallback));
    let command = report.command.as_ref().unwrap();
    assert_eq!(command.fix_type(), FixType::SetMemory);
    assert_eq!(
        command.to_string(),
        "kubectl set resources deployment/web -c web --limits=memory=256Mi -n shop"
    );
    assert_eq!(report.intent.unwrap().root_cause, "Heap exceeds the memory limit");
    assert_eq!(h.writer.applied().len(), 1);
    assert_eq!(report.execution_output.as_deref(), Some("deployment.apps/web updated"));
}

#[tokio::test]
async fn nothing_to_do_is_terminal_failure() {
    let h = harness(
        StaticReader::new("", "", ""),
        Reply::Text("ISSUE: none\nROOT_CAUSE: unknown\nFIX_TYPE: NONE\nFIX_VALUE:"),
        "yes",
        RecordingWriter::default(),
    );

    let report = h.orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::NoFix);
    assert_eq!(report.outcome.exit_code(), 1);
    assert_eq!(report.stages.last(), Some(&RunStage::TerminalNoFix));
    assert!(report.command.is_none());
    assert!(h.approval.presented().is_empty());
    assert!(h.writer.applied().is_empty());
}

#[tokio::test]
async fn unreadable_signals_still_complete_the_run() {
    let h = harness(
        Arc::new(UnreachableReader),
        Reply::Text("FIX_TYPE: NONE"),
        "yes",
        RecordingWriter::default(),
    );

    let report = h.orchestrator.run().await.unwrap();

    assert!(report.signals.status_text().contains("kubectl"));
    assert_eq!(report.outcome, RunOutcome::NoFix);
    assert_eq!(h.backend.calls(), 1);
}

#[tokio::test]
async fn operator_rejection_never_writes() {
    for input in ["", "no", "y", "yes please", "  nope\n"] {
        let h = harness(
            StaticReader::new("", "", "Reason: OOMKilled"),
            Reply::Text("FIX_TYPE: SET_IMAGE\nFIX_VALUE: nginx:1.27"),
            input,
            RecordingWriter::default(),
        );

        let report = h.orchestrator.run().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Skipped, "{input:?}");
        assert_eq!(report.outcome.exit_code(), 0);
        assert_eq!(h.approval.presented().len(), 1);
        assert!(h.writer.applied().is_empty(), "{input:?}");
    }
}

#[tokio::test]
async fn backend_failure_goes_straight_to_fallback() {
    let h = harness(
        StaticReader::new("", "fatal: DATABASE_URL must be set", "Normal Pulled"),
        Reply::Down,
        "yes",
        RecordingWriter::default(),
    );

    let report = h.orchestrator.run().await.unwrap();

    assert!(
        matches!(report.analysis, Analysis::Failed(ref reason) if reason.contains("connection refused"))
    );
    assert_eq!(
        &report.stages[..3],
        [RunStage::Collecting, RunStage::Classifying, RunStage::Fallback]
    );
    assert_eq!(
        h.writer.applied(),
        ["kubectl set env deployment/web DATABASE_URL=postgres://placeholder:5432/app -n shop"]
    );
    assert_eq!(h.backend.calls(), 1);
}

#[tokio::test]
async fn unknown_fix_type_routes_to_fallback() {
    let h = harness(
        StaticReader::new(
            "",
            "",
            "Warning  OOMKilling  pod/web-7d9f5c-x2k4p  Container web was OOMKilled",
        ),
        Reply::Text("ISSUE: crash\nFIX_TYPE: RESTART_POD\nFIX_VALUE: web-0"),
        "no",
        RecordingWriter::default(),
    );

    let report = h.orchestrator.run().await.unwrap();

    assert_eq!(
        report.source,
        Some(IntentSource::Fallback {
            rule: "oom-killed".to_string()
        })
    );
    assert_eq!(
        h.approval.presented(),
        ["kubectl set resources deployment/web -c web --limits=memory=512Mi -n shop"]
    );
    assert_eq!(report.outcome, RunOutcome::Skipped);
}

#[tokio::test]
async fn execution_failure_is_surfaced() {
    let h = harness(
        StaticReader::new("", "", ""),
        Reply::Text("FIX_TYPE: SET_IMAGE\nFIX_VALUE: registry.local/web:1.4.2"),
        "yes",
        RecordingWriter::failing(),
    );

    let err = h.orchestrator.run().await.unwrap_err();

    assert!(matches!(err, TriageError::Execution { .. }));
    assert!(err.to_string().contains("forbidden"));
    // One attempt, no alternate fix
    assert_eq!(h.writer.applied().len(), 1);
}

#[tokio::test]
async fn foreign_workload_events_yield_no_fix() {
    let h = harness(
        StaticReader::new(
            "web-7d9f5c-x2k4p   1/1   Running",
            "",
            "LAST SEEN   TYPE      REASON   OBJECT                     MESSAGE\n\
             90s         Warning   Failed   pod/billing-5f7c9d-q8z2m   Error: ImagePullBackOff\n\
             80s         Warning   Failed   pod/web-api-6c4b8-k2j9s    Error: ImagePullBackOff",
        ),
        Reply::Down,
        "yes",
        RecordingWriter::default(),
    );

    let report = h.orchestrator.run().await.unwrap();

    assert_eq!(report.signals.event_text(), "");
    assert_eq!(report.outcome, RunOutcome::NoFix);
    assert_eq!(report.stages.last(), Some(&RunStage::TerminalNoFix));
    assert!(h.approval.presented().is_empty());
    assert!(h.writer.applied().is_empty());
}

#[tokio::test]
async fn fallback_command_targets_configured_workload_only() {
    let h = harness(
        StaticReader::new(
            "",
            "",
            "Warning  Failed  pod/web-7d9f5c-x2k4p  Error: ImagePullBackOff",
        ),
        Reply::Text("garbage"),
        "yes",
        RecordingWriter::default(),
    );

    let report = h.orchestrator.run().await.unwrap();

    let command = report.command.unwrap();
    assert!(command.args().contains(&"deployment/web".to_string()));
    assert!(command.args().ends_with(&["-n".to_string(), "shop".to_string()]));
}
