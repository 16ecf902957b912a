//! Run configuration.
//!
//! The workload identity is fixed here and threaded into every component at
//! construction time. Nothing in the pipeline derives it from signals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{TriageError, TriageResult};
use crate::fallback::FallbackRule;

/// Config file looked up when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "triage.json";

/// Top-level configuration for a triage run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub workload: WorkloadConfig,
    pub signals: SignalOptions,
    pub backend: BackendConfig,
    pub fallback: FallbackPolicy,
    pub timeouts: Timeouts,
    /// Handlebars template overriding the built-in classification prompt
    pub prompt_template: Option<PathBuf>,
    /// kubectl binary used for both reads and writes
    pub kubectl: String,
}

/// The single workload a run targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub namespace: String,
    pub deployment: String,
    pub container: String,
    /// Pod label selector; defaults to `app=<deployment>`
    pub selector: Option<String>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            namespace: "default".into(),
            deployment: "demo-app".into(),
            container: "demo-app".into(),
            selector: None,
        }
    }
}

impl WorkloadConfig {
    /// Build an identity for the given deployment and container.
    pub fn new(
        namespace: impl Into<String>,
        deployment: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            deployment: deployment.into(),
            container: container.into(),
            selector: None,
        }
    }

    /// Label selector used to find the workload's pods.
    #[must_use]
    pub fn pod_selector(&self) -> String {
        self.selector
            .clone()
            .unwrap_or_else(|| format!("app={}", self.deployment))
    }

    /// `deployment/<name>` resource reference for kubectl.
    #[must_use]
    pub fn deployment_ref(&self) -> String {
        format!("deployment/{}", self.deployment)
    }

    /// Whether a `kind/name` reference names this deployment, one of its
    /// ReplicaSets (`<deployment>-<hash>`) or one of its pods
    /// (`<deployment>-<hash>-<suffix>`).
    #[must_use]
    pub fn owns_object(&self, reference: &str) -> bool {
        let Some((kind, name)) = reference.split_once('/') else {
            return false;
        };
        let kind = kind.split('.').next().unwrap_or(kind);
        match kind.to_ascii_lowercase().as_str() {
            "deployment" => name == self.deployment,
            "replicaset" => self.generated_segments(name) == Some(1),
            "pod" => self.generated_segments(name) == Some(2),
            _ => false,
        }
    }

    /// Number of generated `-`-separated segments after `<deployment>-`.
    fn generated_segments(&self, name: &str) -> Option<usize> {
        let rest = name.strip_prefix(&self.deployment)?.strip_prefix('-')?;
        let segments: Vec<&str> = rest.split('-').collect();
        segments
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()))
            .then_some(segments.len())
    }
}

/// How much signal is collected and forwarded to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalOptions {
    /// Lines of container log to fetch
    pub log_tail: u32,
    /// Characters of each signal kept in the prompt (tail end)
    pub max_signal_chars: usize,
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self {
            log_tail: 100,
            max_signal_chars: 8000,
        }
    }
}

/// Which reasoning backend API to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    OpenAi,
    Anthropic,
}

impl std::str::FromStr for BackendKind {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(TriageError::config(format!(
                "unknown backend '{other}' (expected 'openai' or 'anthropic')"
            ))),
        }
    }
}

/// Reasoning backend settings. API keys are read from the environment only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: BackendKind,
    /// Model name; each provider falls back to its own default when unset
    pub model: Option<String>,
    /// Full endpoint URL; defaults to the provider's public API
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: BackendKind::OpenAi,
            model: None,
            base_url: None,
            max_tokens: 512,
            temperature: 0.0,
        }
    }
}

/// Fixed values the deterministic fallback proposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    /// Known-good image used when the current image cannot be pulled
    pub placeholder_image: String,
    /// Memory limit applied after an OOM kill
    pub safe_memory_limit: String,
    /// Log substring that indicates the missing configuration key
    pub missing_config_marker: String,
    /// Assignment applied when the configuration key is missing
    pub placeholder_env: String,
    /// Rules evaluated after the built-in ones, in order
    pub extra_rules: Vec<FallbackRule>,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            placeholder_image: "nginx:latest".into(),
            safe_memory_limit: "512Mi".into(),
            missing_config_marker: "DATABASE_URL".into(),
            placeholder_env: "DATABASE_URL=postgres://placeholder:5432/app".into(),
            extra_rules: Vec::new(),
        }
    }
}

/// Timeouts at the external boundaries. Operator approval has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub read_secs: u64,
    pub backend_secs: u64,
    pub exec_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read_secs: 30,
            backend_secs: 60,
            exec_secs: 60,
        }
    }
}

impl TriageConfig {
    /// Load configuration.
    ///
    /// With an explicit path the file must exist. Without one, `triage.json`
    /// in the working directory is used if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> TriageResult<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                return Err(TriageError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            TriageError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply `TRIAGE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> TriageResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> TriageResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TRIAGE_NAMESPACE") {
            self.workload.namespace = v;
        }
        if let Some(v) = get("TRIAGE_DEPLOYMENT") {
            self.workload.deployment = v;
        }
        if let Some(v) = get("TRIAGE_CONTAINER") {
            self.workload.container = v;
        }
        if let Some(v) = get("TRIAGE_BACKEND") {
            self.backend.provider = v.parse()?;
        }
        if let Some(v) = get("TRIAGE_MODEL") {
            self.backend.model = Some(v);
        }
        if let Some(v) = get("TRIAGE_BASE_URL") {
            self.backend.base_url = Some(v);
        }
        Ok(())
    }

    /// kubectl binary, falling back to `kubectl` on PATH.
    #[must_use]
    pub fn kubectl_binary(&self) -> &str {
        if self.kubectl.is_empty() {
            "kubectl"
        } else {
            &self.kubectl
        }
    }
}
