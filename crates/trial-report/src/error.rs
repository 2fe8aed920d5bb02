//! Errors from exporting a run report.

use std::error::Error;
use std::fmt;

/// Errors from [`RunReport`](crate::RunReport) export.
#[derive(Debug)]
pub enum ReportError {
    /// JSON encoding failed.
    Encode(serde_json::Error),
    /// Writing the report failed.
    Io(std::io::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "failed to encode run report: {e}"),
            Self::Io(e) => write!(f, "failed to write run report: {e}"),
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}

impl From<std::io::Error> for ReportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
