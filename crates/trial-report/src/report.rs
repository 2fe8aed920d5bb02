//! The end-of-run report.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use trial_core::{FailureKind, Outcome, TestId, TestMeta, Tick};

use crate::error::ReportError;

/// Tag under which tests without tags are counted.
pub const UNTAGGED: &str = "untagged";

/// Final status of one test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Passed (possibly after retries).
    Succeeded,
    /// Failed on its last attempt.
    Failed,
    /// Timed out on its last attempt.
    TimedOut,
    /// Not run: excluded from this run.
    Skipped,
}

impl Status {
    /// Short lowercase label used in the summary table.
    pub fn label(self) -> &'static str {
        match self {
            Self::Succeeded => "passed",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED OUT",
            Self::Skipped => "skipped",
        }
    }

    fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => Self::Succeeded,
            Outcome::Failed(_) => Self::Failed,
            Outcome::TimedOut => Self::TimedOut,
        }
    }
}

/// Final record of one test.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestRecord {
    /// Registry id.
    pub id: TestId,
    /// Category of the test.
    pub category: String,
    /// Name of the test.
    pub name: String,
    /// Tags, as registered.
    pub tags: Vec<String>,
    /// Whether the test gates the run.
    pub required: bool,
    /// Final status.
    pub status: Status,
    /// Attempts used. Zero for skipped tests.
    pub attempts: u32,
    /// Failure category of the last attempt, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    /// Failure message of the last attempt, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestRecord {
    pub(crate) fn from_outcome(meta: &TestMeta, outcome: &Outcome, attempts: u32) -> Self {
        let (failure_kind, message) = match outcome {
            Outcome::Failed(f) => (Some(f.kind), Some(f.message.clone())),
            _ => (None, None),
        };
        Self {
            id: meta.id,
            category: meta.category.clone(),
            name: meta.name.clone(),
            tags: meta.tags.to_vec(),
            required: meta.required,
            status: Status::from_outcome(outcome),
            attempts,
            failure_kind,
            message,
        }
    }

    pub(crate) fn skipped(meta: &TestMeta) -> Self {
        Self {
            id: meta.id,
            category: meta.category.clone(),
            name: meta.name.clone(),
            tags: meta.tags.to_vec(),
            required: meta.required,
            status: Status::Skipped,
            attempts: 0,
            failure_kind: None,
            message: None,
        }
    }

    /// `category:name`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.category, self.name)
    }

    /// Whether this record fails the run.
    pub fn fails_run(&self) -> bool {
        self.required && matches!(self.status, Status::Failed | Status::TimedOut)
    }
}

/// Outcome counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Tests that passed.
    pub succeeded: u32,
    /// Tests that failed.
    pub failed: u32,
    /// Tests that timed out.
    pub timed_out: u32,
    /// Tests that were not run.
    pub skipped: u32,
}

impl Counts {
    fn add(&mut self, status: Status) {
        match status {
            Status::Succeeded => self.succeeded += 1,
            Status::Failed => self.failed += 1,
            Status::TimedOut => self.timed_out += 1,
            Status::Skipped => self.skipped += 1,
        }
    }

    /// Sum of all counts.
    pub fn total(&self) -> u32 {
        self.succeeded + self.failed + self.timed_out + self.skipped
    }
}

/// Counts for one tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    /// The tag, or [`UNTAGGED`].
    pub tag: String,
    /// Outcome counts of tests carrying the tag.
    #[serde(flatten)]
    pub counts: Counts,
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    /// Global tick at which the run ended.
    pub ticks: u64,
    /// Whether every required test succeeded.
    pub passed: bool,
    /// Totals over every test.
    pub totals: Counts,
    /// Counts per tag, in first-seen order.
    pub by_tag: Vec<TagSummary>,
    /// Per-test records.
    pub tests: Vec<TestRecord>,
}

impl RunReport {
    /// Summarise `tests`. A test with several tags counts once under each.
    pub fn build(tests: Vec<TestRecord>, ticks: Tick) -> Self {
        let mut totals = Counts::default();
        let mut by_tag: IndexMap<String, Counts> = IndexMap::new();
        for record in &tests {
            totals.add(record.status);
            if record.tags.is_empty() {
                by_tag
                    .entry(UNTAGGED.to_string())
                    .or_default()
                    .add(record.status);
            }
            for tag in &record.tags {
                by_tag.entry(tag.clone()).or_default().add(record.status);
            }
        }
        let passed = !tests.iter().any(TestRecord::fails_run);
        Self {
            ticks: ticks.0,
            passed,
            totals,
            by_tag: by_tag
                .into_iter()
                .map(|(tag, counts)| TagSummary { tag, counts })
                .collect(),
            tests,
        }
    }

    /// Process exit code: 0 if every required test succeeded, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }

    /// Required tests that did not succeed.
    pub fn required_failures(&self) -> impl Iterator<Item = &TestRecord> {
        self.tests.iter().filter(|r| r.fails_run())
    }

    /// Counts for `tag`, if any test carried it.
    pub fn tag(&self, tag: &str) -> Option<&Counts> {
        self.by_tag.iter().find(|s| s.tag == tag).map(|s| &s.counts)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write pretty-printed JSON to `path`.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let mut file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Plain-text summary table: one row per test, then per-tag counts and
    /// totals.
    pub fn render_table(&self) -> String {
        let name_width = self
            .tests
            .iter()
            .map(|r| r.qualified_name().len())
            .max()
            .unwrap_or(4)
            .max(4);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<9}  {:>8}  {:<8}  DETAIL",
            "TEST", "STATUS", "ATTEMPTS", "REQUIRED"
        );
        for r in &self.tests {
            let detail = match (&r.failure_kind, &r.message) {
                (Some(kind), Some(msg)) => format!("{kind}: {msg}"),
                _ => String::new(),
            };
            let _ = writeln!(
                out,
                "{:<name_width$}  {:<9}  {:>8}  {:<8}  {}",
                r.qualified_name(),
                r.status.label(),
                r.attempts,
                if r.required { "yes" } else { "no" },
                detail
            );
        }
        out.push('\n');
        for s in &self.by_tag {
            let _ = writeln!(out, "{}", summary_line(&s.tag, &s.counts));
        }
        let _ = writeln!(out, "{}", summary_line("total", &self.totals));
        let _ = writeln!(
            out,
            "run {} after {} ticks",
            if self.passed { "PASSED" } else { "FAILED" },
            self.ticks
        );
        out
    }
}

fn summary_line(label: &str, c: &Counts) -> String {
    format!(
        "{label:<12} {} passed, {} failed, {} timed out, {} skipped",
        c.succeeded, c.failed, c.timed_out, c.skipped
    )
}
