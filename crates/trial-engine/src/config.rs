//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] describes the world the scheduler packs tests into and
//! the defaults applied to definitions that do not override them.
//! [`validate()`](EngineConfig::validate) checks structural invariants
//! before a [`Scheduler`](crate::Scheduler) is built from it. The struct
//! deserializes from TOML, with every field optional.

use std::error::Error;
use std::fmt;

use serde::Deserialize;

use trial_core::{BlockPos, Bounds, Extent};

// ── DefinitionDefaults ────────────────────────────────────────────

/// Values used for definition fields the builder did not set.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefinitionDefaults {
    /// Tick budget of a scenario, setup grace included. Default: 100.
    pub max_ticks: u64,
    /// Ticks a scenario stays pending before its body runs. Default: 0.
    pub setup_ticks: u64,
    /// Empty columns reserved around each test. Default: 1.
    pub padding: u32,
    /// Attempts granted to a required test. Default: 1.
    pub max_attempts: u32,
    /// Size used when neither a size nor a known structure is given.
    /// Default: 5x5x5.
    pub extent: Extent,
}

impl Default for DefinitionDefaults {
    fn default() -> Self {
        Self {
            max_ticks: 100,
            setup_ticks: 0,
            padding: 1,
            max_attempts: 1,
            extent: Extent::cube(5),
        }
    }
}

// ── EngineConfig ──────────────────────────────────────────────────

/// Top-level engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Minimum corner of the test world.
    pub origin: BlockPos,
    /// World size along x. Default: 256.
    pub width: u32,
    /// World size along z. Default: 256.
    pub depth: u32,
    /// World size along y. Default: 64.
    pub height: u32,
    /// Upper bound on candidate origins examined per reservation.
    /// Default: 4096.
    pub max_search_candidates: usize,
    /// Run non-required tests. When false they are reported as skipped.
    /// Default: true.
    pub include_optional: bool,
    /// Definition defaults.
    pub defaults: DefinitionDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin: BlockPos::new(0, 64, 0),
            width: 256,
            depth: 256,
            height: 64,
            max_search_candidates: 4096,
            include_optional: true,
            defaults: DefinitionDefaults::default(),
        }
    }
}

impl EngineConfig {
    /// The world box tests are packed into.
    pub fn world_bounds(&self) -> Bounds {
        Bounds::new(self.origin, Extent::new(self.width, self.height, self.depth))
    }

    /// Check structural invariants.
    ///
    /// Called by [`Scheduler::new`](crate::Scheduler::new).
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. The world must have volume.
        let world = self.world_bounds();
        if world.extent.is_empty() {
            return Err(ConfigError::EmptyWorld {
                extent: world.extent,
            });
        }
        // 2. World must not overflow i32 coordinates.
        let max_x = i64::from(self.origin.x) + i64::from(self.width);
        let max_y = i64::from(self.origin.y) + i64::from(self.height);
        let max_z = i64::from(self.origin.z) + i64::from(self.depth);
        if [max_x, max_y, max_z].iter().any(|&m| m > i64::from(i32::MAX)) {
            return Err(ConfigError::WorldOutOfRange {
                origin: self.origin,
                extent: world.extent,
            });
        }
        // 3. The allocator must be allowed to look at one candidate.
        if self.max_search_candidates == 0 {
            return Err(ConfigError::ZeroSearchCandidates);
        }
        // 4. Definition defaults.
        let d = &self.defaults;
        if d.max_ticks == 0 {
            return Err(ConfigError::InvalidDefaults {
                reason: "max_ticks must be at least 1".into(),
            });
        }
        if d.setup_ticks >= d.max_ticks {
            return Err(ConfigError::InvalidDefaults {
                reason: format!(
                    "setup_ticks ({}) must be less than max_ticks ({})",
                    d.setup_ticks, d.max_ticks,
                ),
            });
        }
        if d.max_attempts == 0 {
            return Err(ConfigError::InvalidDefaults {
                reason: "max_attempts must be at least 1".into(),
            });
        }
        if d.extent.is_empty() {
            return Err(ConfigError::InvalidDefaults {
                reason: format!("extent {} has a zero-length axis", d.extent),
            });
        }
        // 5. A default-sized test must fit the world.
        let padded = d.extent.padded(d.padding);
        if padded.x > world.extent.x || padded.y > world.extent.y || padded.z > world.extent.z {
            return Err(ConfigError::DefaultTooLarge {
                padded,
                world: world.extent,
            });
        }
        Ok(())
    }
}

// ── ConfigError ───────────────────────────────────────────────────

/// Errors detected by [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The world has a zero-length axis.
    EmptyWorld {
        /// Configured world size.
        extent: Extent,
    },
    /// The world's far corner does not fit `i32` coordinates.
    WorldOutOfRange {
        /// Configured origin.
        origin: BlockPos,
        /// Configured world size.
        extent: Extent,
    },
    /// `max_search_candidates` is zero.
    ZeroSearchCandidates,
    /// A definition default is out of range.
    InvalidDefaults {
        /// Description of the problem.
        reason: String,
    },
    /// The default extent plus padding does not fit the world.
    DefaultTooLarge {
        /// Padded default extent.
        padded: Extent,
        /// World size.
        world: Extent,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWorld { extent } => write!(f, "world extent {extent} is empty"),
            Self::WorldOutOfRange { origin, extent } => {
                write!(f, "world {origin}+{extent} exceeds the i32 coordinate range")
            }
            Self::ZeroSearchCandidates => write!(f, "max_search_candidates must be at least 1"),
            Self::InvalidDefaults { reason } => write!(f, "invalid definition defaults: {reason}"),
            Self::DefaultTooLarge { padded, world } => {
                write!(f, "default test size {padded} (padded) exceeds world {world}")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_world_rejected() {
        let cfg = EngineConfig {
            depth: 0,
            ..EngineConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::EmptyWorld { .. }) => {}
            other => panic!("expected EmptyWorld, got {other:?}"),
        }
    }

    #[test]
    fn zero_candidates_rejected() {
        let cfg = EngineConfig {
            max_search_candidates: 0,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroSearchCandidates));
    }

    #[test]
    fn setup_must_leave_room_to_run() {
        let mut cfg = EngineConfig::default();
        cfg.defaults.setup_ticks = cfg.defaults.max_ticks;
        match cfg.validate() {
            Err(ConfigError::InvalidDefaults { reason }) => {
                assert!(reason.contains("setup_ticks"), "{reason}");
            }
            other => panic!("expected InvalidDefaults, got {other:?}"),
        }
    }

    #[test]
    fn oversized_default_rejected() {
        let mut cfg = EngineConfig {
            width: 8,
            depth: 8,
            ..EngineConfig::default()
        };
        cfg.defaults.extent = Extent::cube(7);
        match cfg.validate() {
            Err(ConfigError::DefaultTooLarge { padded, .. }) => {
                assert_eq!(padded, Extent::new(9, 7, 9));
            }
            other => panic!("expected DefaultTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn far_corner_overflow_rejected() {
        let cfg = EngineConfig {
            origin: BlockPos::new(i32::MAX - 10, 0, 0),
            ..EngineConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::WorldOutOfRange { .. }) => {}
            other => panic!("expected WorldOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            width = 64
            include_optional = false

            [defaults]
            max_ticks = 40
            extent = { x = 3, y = 2, z = 3 }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.width, 64);
        assert_eq!(cfg.depth, 256);
        assert!(!cfg.include_optional);
        assert_eq!(cfg.defaults.max_ticks, 40);
        assert_eq!(cfg.defaults.padding, 1);
        assert_eq!(cfg.defaults.extent, Extent::new(3, 2, 3));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<EngineConfig, _> = toml::from_str("widht = 64");
        assert!(parsed.is_err());
    }
}
