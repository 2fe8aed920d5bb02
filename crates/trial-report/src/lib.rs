//! Outcome recording and run reports.
//!
//! The [`Reporter`] receives every terminal outcome exactly once per
//! attempt and decides whether the test is retried or its outcome is
//! final. [`RunReport`] is the end-of-run summary: per-test records, counts
//! per tag, totals and the process exit code.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod report;
pub mod reporter;

pub use error::ReportError;
pub use report::{Counts, RunReport, Status, TagSummary, TestRecord};
pub use reporter::{Disposition, Reporter};
