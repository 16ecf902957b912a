//! Deterministic fallback classifier.
//!
//! An ordered list of literal substring rules evaluated first-match-wins.
//! Rules are never combined or ranked; the order itself is the policy.
//! Image pull and OOM events come before any log match.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::command::RemediationCommand;
use crate::config::FallbackPolicy;
use crate::intent::{FixType, Intent};
use crate::translator::FixTranslator;

/// Event marker for an image that cannot be pulled.
pub const IMAGE_PULL_BACKOFF: &str = "ImagePullBackOff";

/// Event marker for an out-of-memory kill.
pub const OOM_KILLED: &str = "OOMKilled";

/// Which signal blob a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Events,
    Logs,
}

/// One `(predicate, fix)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub name: String,
    pub source: SignalSource,
    /// Literal, case-sensitive substring
    pub marker: String,
    pub fix_type: FixType,
    pub fix_value: String,
}

impl FallbackRule {
    fn matches(&self, logs: &str, events: &str) -> bool {
        let haystack = match self.source {
            SignalSource::Events => events,
            SignalSource::Logs => logs,
        };
        haystack.contains(self.marker.as_str())
    }

    fn is_usable(&self) -> bool {
        !self.marker.is_empty() && self.fix_type.is_actionable() && !self.fix_value.trim().is_empty()
    }
}

/// The three built-in rules, in evaluation order.
#[must_use]
pub fn builtin_rules(policy: &FallbackPolicy) -> Vec<FallbackRule> {
    vec![
        FallbackRule {
            name: "image-pull-backoff".into(),
            source: SignalSource::Events,
            marker: IMAGE_PULL_BACKOFF.into(),
            fix_type: FixType::SetImage,
            fix_value: policy.placeholder_image.clone(),
        },
        FallbackRule {
            name: "oom-killed".into(),
            source: SignalSource::Events,
            marker: OOM_KILLED.into(),
            fix_type: FixType::SetMemory,
            fix_value: policy.safe_memory_limit.clone(),
        },
        FallbackRule {
            name: "missing-config".into(),
            source: SignalSource::Logs,
            marker: policy.missing_config_marker.clone(),
            fix_type: FixType::SetEnv,
            fix_value: policy.placeholder_env.clone(),
        },
    ]
}

/// Rule that fired and the intent it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackMatch {
    pub rule: String,
    pub intent: Intent,
}

/// Signal-pattern classifier used when the primary path yields nothing.
#[derive(Debug, Clone)]
pub struct FallbackClassifier {
    rules: Vec<FallbackRule>,
    translator: FixTranslator,
}

impl FallbackClassifier {
    /// Built-in rules followed by the policy's extra rules.
    pub fn new(policy: &FallbackPolicy, translator: FixTranslator) -> Self {
        let mut rules = builtin_rules(policy);
        rules.extend(policy.extra_rules.iter().cloned());
        Self::with_rules(rules, translator)
    }

    /// Use an explicit rule list. Rules that could never yield a command are
    /// dropped.
    pub fn with_rules(rules: Vec<FallbackRule>, translator: FixTranslator) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| {
                let usable = rule.is_usable();
                if !usable {
                    warn!(rule = %rule.name, "Ignoring fallback rule without marker or actionable fix");
                }
                usable
            })
            .collect();
        Self { rules, translator }
    }

    #[must_use]
    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }

    /// First matching rule, if any.
    #[must_use]
    pub fn classify(&self, logs: &str, events: &str) -> Option<FallbackMatch> {
        let rule = self.rules.iter().find(|rule| rule.matches(logs, events))?;
        debug!(rule = %rule.name, marker = %rule.marker, "Fallback rule matched");
        Some(FallbackMatch {
            rule: rule.name.clone(),
            intent: Intent::fix(rule.fix_type, rule.fix_value.clone()),
        })
    }

    /// Command for the first matching rule, if any.
    #[must_use]
    pub fn propose(&self, logs: &str, events: &str) -> Option<(FallbackMatch, RemediationCommand)> {
        let matched = self.classify(logs, events)?;
        let command = self.translator.translate_intent(&matched.intent)?;
        Some((matched, command))
    }
}
