//! Cross-thread cancellation requests.
//!
//! A [`CancelHandle`] may be cloned and moved to any thread. Requests are
//! buffered in an unbounded channel and applied by the scheduler at the
//! start of its next tick, so sending never blocks and never races a tick
//! in progress.

use crossbeam_channel::Sender;

use trial_core::TestId;

/// A cancellation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelRequest {
    /// Cancel every live or queued attempt of one test.
    Test {
        /// The test to cancel.
        id: TestId,
        /// Reported as the failure message.
        reason: String,
    },
    /// Cancel everything live or queued.
    All {
        /// Reported as the failure message.
        reason: String,
    },
}

/// Sends cancellation requests to a [`Scheduler`](crate::Scheduler).
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Sender<CancelRequest>,
}

impl CancelHandle {
    pub(crate) fn new(tx: Sender<CancelRequest>) -> Self {
        Self { tx }
    }

    /// Request cancellation of `id`.
    ///
    /// Returns false if the scheduler no longer exists.
    pub fn cancel(&self, id: TestId, reason: impl Into<String>) -> bool {
        self.tx
            .send(CancelRequest::Test {
                id,
                reason: reason.into(),
            })
            .is_ok()
    }

    /// Request cancellation of every live or queued test.
    ///
    /// Returns false if the scheduler no longer exists.
    pub fn cancel_all(&self, reason: impl Into<String>) -> bool {
        self.tx
            .send(CancelRequest::All {
                reason: reason.into(),
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn requests_arrive_in_order() {
        let (tx, rx) = unbounded();
        let handle = CancelHandle::new(tx);
        let other = handle.clone();
        assert!(handle.cancel(TestId(3), "flaky"));
        assert!(other.cancel_all("shutdown"));
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                CancelRequest::Test {
                    id: TestId(3),
                    reason: "flaky".into()
                },
                CancelRequest::All {
                    reason: "shutdown".into()
                },
            ]
        );
    }

    #[test]
    fn send_after_receiver_dropped_reports_false() {
        let (tx, rx) = unbounded();
        let handle = CancelHandle::new(tx);
        drop(rx);
        assert!(!handle.cancel_all("late"));
    }
}
