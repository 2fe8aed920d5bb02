//! Retry decisions and final outcome bookkeeping.

use indexmap::IndexMap;
use tracing::{info, warn};

use trial_core::{Outcome, TestId, TestMeta, Tick};

use crate::report::{RunReport, Status, TestRecord};

/// What the scheduler should do after an attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Run the definition again as attempt `next_attempt`.
    Retry {
        /// Attempt number of the retry (1-based).
        next_attempt: u32,
    },
    /// The outcome has been recorded as final.
    Final,
}

/// Collects terminal outcomes and decides retries.
///
/// Records are kept in the order tests first reached a final outcome (or
/// were skipped), which is the order the report lists them in.
#[derive(Debug, Default)]
pub struct Reporter {
    records: IndexMap<TestId, TestRecord>,
    retries: u64,
}

impl Reporter {
    /// An empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of attempt `attempt` (1-based) of `meta`.
    ///
    /// A non-successful outcome of a `required` test is retried while
    /// `attempt < max_attempts`, unless it was a cancellation. Everything
    /// else is final.
    pub fn record(&mut self, meta: &TestMeta, outcome: &Outcome, attempt: u32) -> Disposition {
        if let Some(existing) = self.records.get(&meta.id) {
            warn!(
                test = %meta.qualified_name(),
                status = existing.status.label(),
                "outcome already final; ignoring duplicate report"
            );
            return Disposition::Final;
        }

        if !outcome.is_success()
            && meta.required
            && outcome.is_retryable()
            && attempt < meta.max_attempts
        {
            self.retries += 1;
            info!(
                test = %meta.qualified_name(),
                attempt,
                max_attempts = meta.max_attempts,
                outcome = %outcome,
                "attempt failed; retrying"
            );
            return Disposition::Retry {
                next_attempt: attempt + 1,
            };
        }

        match outcome {
            Outcome::Succeeded => info!(test = %meta.qualified_name(), attempt, "passed"),
            _ if meta.required => warn!(
                test = %meta.qualified_name(),
                attempt,
                outcome = %outcome,
                "required test failed"
            ),
            _ => info!(
                test = %meta.qualified_name(),
                attempt,
                outcome = %outcome,
                "optional test failed"
            ),
        }
        self.records
            .insert(meta.id, TestRecord::from_outcome(meta, outcome, attempt));
        Disposition::Final
    }

    /// Record `outcome` as final, whatever attempts remain.
    ///
    /// Used when a retry cannot be scheduled (placement rejected) or the
    /// test never became a scenario.
    pub fn record_final(&mut self, meta: &TestMeta, outcome: &Outcome, attempt: u32) {
        if self.records.contains_key(&meta.id) {
            return;
        }
        self.records
            .insert(meta.id, TestRecord::from_outcome(meta, outcome, attempt));
    }

    /// Record a test that was selected out of the run.
    pub fn skip(&mut self, meta: &TestMeta) {
        self.records
            .entry(meta.id)
            .or_insert_with(|| TestRecord::skipped(meta));
    }

    /// Whether `id` has a final record.
    pub fn is_final(&self, id: TestId) -> bool {
        self.records.contains_key(&id)
    }

    /// Final status of `id`, if recorded.
    pub fn status(&self, id: TestId) -> Option<Status> {
        self.records.get(&id).map(|r| r.status)
    }

    /// The final record of `id`, if any.
    pub fn get(&self, id: TestId) -> Option<&TestRecord> {
        self.records.get(&id)
    }

    /// Number of final records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of retries granted so far.
    pub fn retries(&self) -> u64 {
        self.retries
    }

    /// Build the report for a run that ended at `ticks`.
    pub fn report(&self, ticks: Tick) -> RunReport {
        RunReport::build(self.records.values().cloned().collect(), ticks)
    }
}
