//! Failure classification for gateway errors.
//!
//! Decides whether a failed Telegram call means "the network is flaky, try
//! again later" or "this token is bad". The decision is made on the error
//! text, so it is a heuristic: anything that does not look like a
//! connectivity problem is treated as a rejection of the token.

use serde::{Deserialize, Serialize};

/// Connectivity failure markers, matched case-insensitively.
pub const DEFAULT_TRANSIENT_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection closed",
    "timeout",
    "wsarecv",
    "wsasend",
    "broken pipe",
    "network is unreachable",
    "no route to host",
    "connection timed out",
    "transport error",
    "read: connection reset",
    "write: connection reset",
    "forcibly closed by the remote host",
];

/// Outcome of classifying a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Connectivity problem; retry on the next tick or cycle.
    Transient,
    /// The token was rejected; mark it invalid.
    Permanent,
}

impl FailureClass {
    /// Stable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        }
    }

    /// Whether the failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Pluggable classifier for gateway error text.
///
/// Implementations must be pure and total: same input, same answer, no
/// side effects.
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, error: &str) -> FailureClass;
}

impl<F> FailureClassifier for F
where
    F: Fn(&str) -> FailureClass + Send + Sync,
{
    fn classify(&self, error: &str) -> FailureClass {
        self(error)
    }
}

/// Substring-based classifier.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    patterns: Vec<String>,
}

impl PatternClassifier {
    /// Classifier with an explicit pattern list (no defaults).
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Default patterns plus `extra`.
    pub fn with_extra_patterns<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classifier = Self::default();
        classifier.patterns.extend(
            extra
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty()),
        );
        classifier
    }

    /// Lowercased substrings that mark a failure as transient.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSIENT_PATTERNS)
    }
}

impl FailureClassifier for PatternClassifier {
    fn classify(&self, error: &str) -> FailureClass {
        let lowered = error.to_lowercase();
        if self.patterns.iter().any(|p| lowered.contains(p.as_str())) {
            FailureClass::Transient
        } else {
            FailureClass::Permanent
        }
    }
}
