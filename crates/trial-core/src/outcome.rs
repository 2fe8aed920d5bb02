//! Terminal scenario outcomes.

use serde::Serialize;
use std::fmt;

use crate::failure::Failure;

/// How a scenario ended. Once set it never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// The test reached an explicit success.
    Succeeded,
    /// A step failed, a watch fired, or the scenario was cancelled.
    Failed(Failure),
    /// The scenario hit its `max_ticks` without resolving.
    TimedOut,
}

impl Outcome {
    /// Whether the outcome counts as a pass.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Whether a retry could change the result.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Succeeded => false,
            Self::Failed(f) => f.is_retryable(),
            Self::TimedOut => true,
        }
    }

    /// Short lowercase label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::TimedOut => "timed out",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(failure) => write!(f, "failed ({failure})"),
            other => f.write_str(other.label()),
        }
    }
}
