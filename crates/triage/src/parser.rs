//! Parser for the backend's `LABEL: value` response grammar.
//!
//! Backend output is untrusted. Parsing never fails: the worst outcome is an
//! empty mapping, which routes the run to the fallback classifier.

use std::collections::HashMap;

use crate::intent::{FixType, Intent};

/// Separator between label and value.
pub const SEPARATOR: char = ':';

pub const LABEL_ISSUE: &str = "ISSUE";
pub const LABEL_ROOT_CAUSE: &str = "ROOT_CAUSE";
pub const LABEL_FIX_TYPE: &str = "FIX_TYPE";
pub const LABEL_FIX_VALUE: &str = "FIX_VALUE";

const LABELS: [&str; 4] = [LABEL_ISSUE, LABEL_ROOT_CAUSE, LABEL_FIX_TYPE, LABEL_FIX_VALUE];

/// Outcome of parsing a backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// At least one known label was present
    Recognized(Intent),
    /// No known label was found
    Unrecognized,
}

impl ParsedResponse {
    /// The intent, if one was recognized.
    #[must_use]
    pub fn intent(&self) -> Option<&Intent> {
        match self {
            Self::Recognized(intent) => Some(intent),
            Self::Unrecognized => None,
        }
    }
}

/// Split text into a label to value mapping.
///
/// Each line containing the separator is split on its first occurrence and
/// both halves are trimmed. A repeated label keeps its last value. Lines
/// without the separator are skipped.
#[must_use]
pub fn parse_labels(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once(SEPARATOR))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Parse raw backend text into an intent.
///
/// The fix type token is carried through [`FixType::from_token`], so an
/// unknown or missing token yields a non-actionable intent.
#[must_use]
pub fn parse_response(text: &str) -> ParsedResponse {
    let mut labels = parse_labels(text);

    if !LABELS.iter().any(|label| labels.contains_key(*label)) {
        return ParsedResponse::Unrecognized;
    }

    let mut take = |label: &str| labels.remove(label).unwrap_or_default();
    let issue = take(LABEL_ISSUE);
    let root_cause = take(LABEL_ROOT_CAUSE);
    let fix_type = FixType::from_token(&take(LABEL_FIX_TYPE));
    let fix_value = take(LABEL_FIX_VALUE);

    ParsedResponse::Recognized(Intent {
        issue,
        root_cause,
        fix_type,
        fix_value,
    })
}
