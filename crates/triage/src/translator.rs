//! Translation from an intent to exactly one remediation command.

use crate::command::RemediationCommand;
use crate::config::WorkloadConfig;
use crate::intent::{FixType, Intent};

/// Pure, total mapping from `(fix_type, fix_value)` to a command.
///
/// Every input produces either a command or an explicit `None`; there is no
/// error case. `fix_value` is passed through verbatim. The approval gate is
/// the only check between this value and execution.
#[derive(Debug, Clone)]
pub struct FixTranslator {
    workload: WorkloadConfig,
    kubectl: String,
}

impl FixTranslator {
    pub fn new(workload: WorkloadConfig, kubectl: impl Into<String>) -> Self {
        Self {
            workload,
            kubectl: kubectl.into(),
        }
    }

    /// Translate a raw fix type token and value.
    #[must_use]
    pub fn translate(&self, fix_type: &str, fix_value: &str) -> Option<RemediationCommand> {
        self.build(FixType::from_token(fix_type), fix_value)
    }

    /// Translate a parsed intent.
    #[must_use]
    pub fn translate_intent(&self, intent: &Intent) -> Option<RemediationCommand> {
        self.build(intent.fix_type, &intent.fix_value)
    }

    fn build(&self, fix_type: FixType, fix_value: &str) -> Option<RemediationCommand> {
        let value = fix_value.trim();
        // No command can be fully formed without a value
        if value.is_empty() {
            return None;
        }

        let w = &self.workload;
        let mut args: Vec<String> = match fix_type {
            FixType::SetImage => vec![
                "set".into(),
                "image".into(),
                w.deployment_ref(),
                format!("{}={value}", w.container),
            ],
            FixType::SetEnv => vec![
                "set".into(),
                "env".into(),
                w.deployment_ref(),
                value.to_string(),
            ],
            FixType::SetMemory => vec![
                "set".into(),
                "resources".into(),
                w.deployment_ref(),
                "-c".into(),
                w.container.clone(),
                format!("--limits=memory={value}"),
            ],
            FixType::None => return None,
        };
        args.extend(["-n".to_string(), w.namespace.clone()]);

        Some(RemediationCommand::new(fix_type, self.kubectl.clone(), args))
    }
}
