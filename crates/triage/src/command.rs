//! A single, fully-formed remediation command.

use std::fmt;

use crate::intent::FixType;

/// Imperative platform command built from one intent.
///
/// Commands are complete at construction and executed as argv, never
/// through a shell. The `Display` form is what the operator approves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationCommand {
    fix_type: FixType,
    program: String,
    args: Vec<String>,
}

impl RemediationCommand {
    pub(crate) fn new(fix_type: FixType, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            fix_type,
            program: program.into(),
            args,
        }
    }

    #[must_use]
    pub fn fix_type(&self) -> FixType {
        self.fix_type
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for RemediationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_arg(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote_arg(arg))?;
        }
        Ok(())
    }
}

/// Quote an argument for display so the shown command reads unambiguously.
pub(crate) fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | ',' | '+')
        });
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
