//! Structured classification of a workload failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of remediation categories.
///
/// Any token outside the recognized four maps to [`FixType::None`]; the
/// pipeline never acts on a fix type it does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixType {
    SetImage,
    SetEnv,
    SetMemory,
    #[default]
    None,
}

impl FixType {
    /// Wire token as it appears in backend output.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::SetImage => "SET_IMAGE",
            Self::SetEnv => "SET_ENV",
            Self::SetMemory => "SET_MEMORY",
            Self::None => "NONE",
        }
    }

    /// Parse a wire token. Unrecognized or empty tokens become `None`.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "SET_IMAGE" => Self::SetImage,
            "SET_ENV" => Self::SetEnv,
            "SET_MEMORY" => Self::SetMemory,
            _ => Self::None,
        }
    }

    /// Whether a command can be built for this fix type.
    #[must_use]
    pub fn is_actionable(self) -> bool {
        !matches!(self, Self::None)
    }

    /// All wire tokens, in prompt order.
    #[must_use]
    pub fn all_tokens() -> [&'static str; 4] {
        [
            Self::SetImage.token(),
            Self::SetEnv.token(),
            Self::SetMemory.token(),
            Self::None.token(),
        ]
    }
}

impl fmt::Display for FixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Classified failure: what is wrong and which single fix to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub issue: String,
    pub root_cause: String,
    pub fix_type: FixType,
    /// Parameter for the fix; meaning depends on `fix_type`
    pub fix_value: String,
}

impl Intent {
    /// Intent carrying only a fix, as produced by the fallback rules.
    pub fn fix(fix_type: FixType, fix_value: impl Into<String>) -> Self {
        Self {
            fix_type,
            fix_value: fix_value.into(),
            ..Self::default()
        }
    }

    /// Whether this intent names a fix the translator can act on.
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        self.fix_type.is_actionable()
    }
}
