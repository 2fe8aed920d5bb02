//! Strongly-typed identifiers and the [`Tick`] counter.

use serde::Serialize;
use std::fmt;

/// Monotonically increasing simulation tick.
///
/// Incremented once per scheduler frame. `Tick(0)` is the state before the
/// first frame has been executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Tick(pub u64);

impl Tick {
    /// The tick before any frame has run.
    pub const ZERO: Tick = Tick(0);

    /// The tick immediately following `self`.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Ticks elapsed from `earlier` to `self`, saturating at zero.
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// `self` advanced by `ticks`.
    pub fn offset(self, ticks: u64) -> Self {
        Self(self.0 + ticks)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Tick {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a registered test definition.
///
/// Assigned sequentially in registration order; `TestId(n)` is the n-th
/// definition submitted to a registry. The ordinal doubles as the
/// deterministic tie-break for placement and rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TestId(pub u32);

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TestId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies one scenario, i.e. one attempt at running a definition.
///
/// Never reused within a scheduler: a retry gets a fresh id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScenarioId(pub u64);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ScenarioId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a region reservation within an allocator.
///
/// Ids are never reused, so a stale id can always be told apart from a
/// live one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RegionId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_since_saturates() {
        assert_eq!(Tick(10).since(Tick(4)), 6);
        assert_eq!(Tick(4).since(Tick(10)), 0);
    }

    #[test]
    fn tick_next_and_offset() {
        assert_eq!(Tick::ZERO.next(), Tick(1));
        assert_eq!(Tick(3).offset(7), Tick(10));
    }

    #[test]
    fn ids_display_inner_value() {
        assert_eq!(TestId(7).to_string(), "7");
        assert_eq!(ScenarioId(12).to_string(), "12");
        assert_eq!(RegionId(3).to_string(), "3");
        assert_eq!(Tick(99).to_string(), "99");
    }
}
