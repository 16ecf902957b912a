//! Primary classification: prompt the reasoning backend for an intent.

use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::ReasoningBackend;
use crate::error::{TriageError, TriageResult};
use crate::intent::FixType;

const TEMPLATE_NAME: &str = "classify";

/// Built-in classification prompt.
pub const DEFAULT_PROMPT: &str = r"You are a senior Kubernetes reliability engineer diagnosing a failing workload.

Read the container logs and cluster events below, then choose exactly one fix.

Rules:
- FIX_TYPE must be exactly one of: {{fix_types}}
- SET_IMAGE: FIX_VALUE is the full image reference the container should run
- SET_ENV: FIX_VALUE is a single NAME=value assignment
- SET_MEMORY: FIX_VALUE is a memory limit such as 256Mi
- NONE: no listed fix applies; leave FIX_VALUE empty
- Never write kubectl or any other command. Describe the fix only through FIX_TYPE and FIX_VALUE.
- Reply with exactly these four lines and nothing else:

ISSUE: <one-line summary of the failure>
ROOT_CAUSE: <one-line root cause>
FIX_TYPE: <fix type>
FIX_VALUE: <value>

LOGS:
{{logs}}

EVENTS:
{{events}}
";

#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    logs: &'a str,
    events: &'a str,
    fix_types: String,
}

/// Renders the classification prompt from a handlebars template.
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
    max_signal_chars: usize,
}

impl PromptRenderer {
    /// Renderer for the built-in prompt.
    ///
    /// `max_signal_chars` keeps the tail of each signal; `0` disables the cap.
    pub fn new(max_signal_chars: usize) -> TriageResult<Self> {
        Self::with_template(DEFAULT_PROMPT, max_signal_chars)
    }

    /// Renderer for a template loaded from disk.
    pub fn from_file(path: &Path, max_signal_chars: usize) -> TriageResult<Self> {
        let template = std::fs::read_to_string(path).map_err(|e| TriageError::Template {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::with_template(&template, max_signal_chars)
    }

    pub fn with_template(template: &str, max_signal_chars: usize) -> TriageResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Signals are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| TriageError::Template {
                reason: e.to_string(),
            })?;
        Ok(Self {
            handlebars,
            max_signal_chars,
        })
    }

    pub fn render(&self, logs: &str, events: &str) -> TriageResult<String> {
        let context = PromptContext {
            logs: or_placeholder(tail_chars(logs, self.max_signal_chars)),
            events: or_placeholder(tail_chars(events, self.max_signal_chars)),
            fix_types: FixType::all_tokens().join(", "),
        };
        self.handlebars
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| TriageError::Template {
                reason: e.to_string(),
            })
    }
}

fn or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() {
        "(none)"
    } else {
        text
    }
}

/// Last `max` characters of `text`, on a char boundary.
fn tail_chars(text: &str, max: usize) -> &str {
    if max == 0 {
        return text;
    }
    match text.char_indices().rev().nth(max - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Sends collected signals to the reasoning backend under the four-label
/// output contract and returns its raw reply.
pub struct IntentClassifier {
    backend: Arc<dyn ReasoningBackend>,
    renderer: PromptRenderer,
    timeout: Duration,
}

impl IntentClassifier {
    pub fn new(backend: Arc<dyn ReasoningBackend>, renderer: PromptRenderer, timeout: Duration) -> Self {
        Self {
            backend,
            renderer,
            timeout,
        }
    }

    /// One request, no retry. The reply is returned unmodified.
    pub async fn classify(&self, logs: &str, events: &str) -> TriageResult<String> {
        let prompt = self.renderer.render(logs, events)?;
        debug!(backend = self.backend.name(), prompt_chars = prompt.len(), "Rendered prompt");

        let reply = tokio::time::timeout(self.timeout, self.backend.complete(&prompt))
            .await
            .map_err(|_| TriageError::Timeout {
                operation: "reasoning backend".to_string(),
                secs: self.timeout.as_secs(),
            })??;

        info!(backend = self.backend.name(), reply_chars = reply.len(), "Backend replied");
        Ok(reply)
    }
}
