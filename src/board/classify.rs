//! Mapping of failure messages to the error kinds shown on cards.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Summary,
    Post,
    Network,
    Validation,
    Timeout,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Summary => "Summary Failed",
            ErrorKind::Post => "Generation Failed",
            ErrorKind::Network => "Connection Error",
            ErrorKind::Validation => "Invalid Response",
            ErrorKind::Timeout => "Timeout",
        }
    }

    /// Message used when a failure carries no text of its own.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            ErrorKind::Summary => "Failed to fetch summary. Please retry.",
            ErrorKind::Post => "Failed to generate blog post. Please retry.",
            ErrorKind::Network => "Network connection failed. Check your internet connection.",
            ErrorKind::Validation => "Server returned invalid data. Please retry.",
            ErrorKind::Timeout => "Request timed out. Please try again.",
        }
    }

    /// Transient failures (network, timeout) are shown in a warning colour.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Summary => "summary",
            ErrorKind::Post => "post",
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

pub trait ErrorClassifier: Send + Sync {
    /// Kind for a failure `message`; `default` when nothing more specific applies.
    fn classify(&self, message: &str, default: ErrorKind) -> ErrorKind;
}

/// Case-insensitive keyword matching, checked in order: timeout, network,
/// validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

const TIMEOUT_WORDS: &[&str] = &["timeout", "timed out"];
const NETWORK_WORDS: &[&str] = &["network", "connection", "fetch"];
const VALIDATION_WORDS: &[&str] = &["validation", "schema"];

impl ErrorClassifier for KeywordClassifier {
    fn classify(&self, message: &str, default: ErrorKind) -> ErrorKind {
        let lower = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has(TIMEOUT_WORDS) {
            ErrorKind::Timeout
        } else if has(NETWORK_WORDS) {
            ErrorKind::Network
        } else if has(VALIDATION_WORDS) {
            ErrorKind::Validation
        } else {
            default
        }
    }
}

/// The message to show for a failure: its own text, or the kind's fallback.
pub fn display_message(message: &str, kind: ErrorKind) -> String {
    if message.trim().is_empty() {
        kind.fallback_message().to_string()
    } else {
        message.to_string()
    }
}
