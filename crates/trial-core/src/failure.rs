//! Test failures.
//!
//! A [`Failure`] is a value, not a panic: step bodies return
//! `Result<(), Failure>` and the sequencer converts an `Err` into a terminal
//! outcome for that scenario only.

use serde::Serialize;
use std::error::Error;
use std::fmt;

/// Why a scenario failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// A step body observed a contradiction with the expected state.
    Assertion,
    /// A polling step exhausted its step-local limit without its condition
    /// ever holding.
    ConditionNeverMet,
    /// A `fail_if` watch observed its forbidden condition.
    WatchTriggered,
    /// The scenario was cancelled from outside (suite abort, run budget).
    Cancelled,
}

impl FailureKind {
    /// Short lowercase label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Assertion => "assertion",
            Self::ConditionNeverMet => "condition never met",
            Self::WatchTriggered => "watch triggered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A failed expectation, with a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable description.
    pub message: String,
}

impl Failure {
    /// An assertion failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Assertion,
            message: message.into(),
        }
    }

    /// A failure of the given kind.
    pub fn with_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A polling step gave up. `last` is the predicate's most recent
    /// rejection, if it produced one.
    pub fn condition_never_met(limit: u64, last: Option<&Failure>) -> Self {
        let message = match last {
            Some(f) => format!("condition never met within {limit} ticks: {}", f.message),
            None => format!("condition never met within {limit} ticks"),
        };
        Self::with_kind(FailureKind::ConditionNeverMet, message)
    }

    /// An external cancellation.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::with_kind(FailureKind::Cancelled, reason)
    }

    /// Whether a retry could plausibly change the result.
    ///
    /// Cancellations are never retried.
    pub fn is_retryable(&self) -> bool {
        self.kind != FailureKind::Cancelled
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for Failure {}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// `Ok(())` if `condition` holds, otherwise an assertion [`Failure`].
///
/// ```
/// use trial_core::ensure;
/// assert!(ensure(1 + 1 == 2, "arithmetic").is_ok());
/// assert!(ensure(false, "lamp should be lit").is_err());
/// ```
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), Failure> {
    if condition {
        Ok(())
    } else {
        Err(Failure::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_never_met_carries_last_rejection() {
        let last = Failure::new("door is closed");
        let f = Failure::condition_never_met(20, Some(&last));
        assert_eq!(f.kind, FailureKind::ConditionNeverMet);
        assert!(f.message.contains("20 ticks"));
        assert!(f.message.contains("door is closed"));
    }

    #[test]
    fn cancellation_is_not_retryable() {
        assert!(!Failure::cancelled("suite abort").is_retryable());
        assert!(Failure::new("boom").is_retryable());
    }

    #[test]
    fn display_includes_kind() {
        let f = Failure::with_kind(FailureKind::WatchTriggered, "lava reached the floor");
        assert_eq!(f.to_string(), "watch triggered: lava reached the floor");
    }
}
