//! The single authoritative tick counter.

use trial_core::Tick;

/// Monotonic tick counter, advanced exactly once per scheduler frame.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    now: Tick,
}

impl Clock {
    /// A clock at [`Tick::ZERO`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The current tick.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Move to the next tick and return it.
    pub fn advance(&mut self) -> Tick {
        self.now = self.now.next();
        self.now
    }
}
