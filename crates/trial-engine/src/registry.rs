//! Test registration and run selection.
//!
//! A [`Registry`] is an explicit, process-scoped collection of
//! [`TestDefinition`]s. Definitions are built with a [`DefinitionBuilder`]
//! and frozen on [`submit`](DefinitionBuilder::submit): once registered they
//! are shared through `Arc` and never mutated.

use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use trial_core::{Extent, Failure, Rotation, Tags, TestId, TestMeta, World};
use trial_sequence::{Body, TestContext};

use crate::config::DefinitionDefaults;

// ── TestDefinition ────────────────────────────────────────────────

/// An immutable, registered test.
pub struct TestDefinition<W: World> {
    /// Identity and reporting metadata.
    pub meta: TestMeta,
    /// Name of the structure the test is laid out on, if any.
    pub structure: Option<String>,
    /// Unrotated size of the test area.
    pub extent: Extent,
    /// Tick budget, setup grace included.
    pub max_ticks: u64,
    /// Ticks the scenario stays pending before the body runs.
    pub setup_ticks: u64,
    /// Empty columns reserved on each horizontal side.
    pub padding: u32,
    /// Whether attempts rotate the test area.
    pub rotate: bool,
    /// The test body.
    pub body: Body<W>,
}

impl<W: World> TestDefinition<W> {
    /// Registry id.
    pub fn id(&self) -> TestId {
        self.meta.id
    }

    /// Batch key, if any.
    pub fn batch(&self) -> Option<&str> {
        self.meta.batch.as_deref()
    }

    /// Rotation used for attempt `attempt` (1-based).
    ///
    /// Without `rotate` this is always [`Rotation::None`]; with it the
    /// rotation is `(id + attempt - 1) mod 4` quarter turns, so consecutive
    /// tests and consecutive retries both cycle through orientations.
    pub fn rotation_for(&self, attempt: u32) -> Rotation {
        if !self.rotate {
            return Rotation::None;
        }
        let turns = u64::from(self.meta.id.0) + u64::from(attempt.saturating_sub(1));
        Rotation::from_quarter_turns(turns)
    }
}

impl<W: World> fmt::Debug for TestDefinition<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("meta", &self.meta)
            .field("structure", &self.structure)
            .field("extent", &self.extent)
            .field("max_ticks", &self.max_ticks)
            .field("setup_ticks", &self.setup_ticks)
            .field("padding", &self.padding)
            .field("rotate", &self.rotate)
            .finish_non_exhaustive()
    }
}

// ── Registry ──────────────────────────────────────────────────────

/// Collection of registered tests and known structure sizes.
pub struct Registry<W: World> {
    defaults: DefinitionDefaults,
    structures: IndexMap<String, Extent>,
    definitions: Vec<Arc<TestDefinition<W>>>,
    names: HashSet<String>,
}

impl<W: World> Default for Registry<W> {
    fn default() -> Self {
        Self::new(DefinitionDefaults::default())
    }
}

impl<W: World> Registry<W> {
    /// An empty registry applying `defaults` to unset builder fields.
    pub fn new(defaults: DefinitionDefaults) -> Self {
        Self {
            defaults,
            structures: IndexMap::new(),
            definitions: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Defaults applied to unset builder fields.
    pub fn defaults(&self) -> &DefinitionDefaults {
        &self.defaults
    }

    /// Register the size of a named structure.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateStructure`] if the name is taken,
    /// [`RegistryError::EmptyExtent`] if `extent` has a zero-length axis.
    pub fn define_structure(
        &mut self,
        name: impl Into<String>,
        extent: Extent,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if extent.is_empty() {
            return Err(RegistryError::EmptyExtent { name, extent });
        }
        if self.structures.contains_key(&name) {
            return Err(RegistryError::DuplicateStructure { name });
        }
        self.structures.insert(name, extent);
        Ok(())
    }

    /// Size of a registered structure.
    pub fn structure(&self, name: &str) -> Option<Extent> {
        self.structures.get(name).copied()
    }

    /// Start registering a test. Nothing is registered until
    /// [`submit`](DefinitionBuilder::submit).
    pub fn register<F>(
        &mut self,
        category: impl Into<String>,
        name: impl Into<String>,
        body: F,
    ) -> DefinitionBuilder<'_, W>
    where
        F: Fn(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + Sync + 'static,
    {
        self.register_body(category, name, Arc::new(body))
    }

    /// Like [`register`](Self::register), with a body that is already
    /// shared.
    pub fn register_body(
        &mut self,
        category: impl Into<String>,
        name: impl Into<String>,
        body: Body<W>,
    ) -> DefinitionBuilder<'_, W> {
        DefinitionBuilder {
            registry: self,
            category: category.into(),
            name: name.into(),
            body,
            structure: None,
            size: None,
            max_ticks: None,
            setup_ticks: None,
            padding: None,
            batch: None,
            required: true,
            tags: SmallVec::new(),
            rotate: false,
            max_attempts: None,
        }
    }

    /// Look up a definition.
    pub fn get(&self, id: TestId) -> Option<&Arc<TestDefinition<W>>> {
        self.definitions.get(id.0 as usize)
    }

    /// Look up a definition by `category:name`.
    pub fn find(&self, qualified_name: &str) -> Option<&Arc<TestDefinition<W>>> {
        self.definitions
            .iter()
            .find(|d| d.meta.qualified_name() == qualified_name)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<TestDefinition<W>>> {
        self.definitions.iter()
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

// ── DefinitionBuilder ─────────────────────────────────────────────

/// Chainable configuration of one test, returned by
/// [`Registry::register`].
#[must_use = "a definition is only registered once submit() is called"]
pub struct DefinitionBuilder<'r, W: World> {
    registry: &'r mut Registry<W>,
    category: String,
    name: String,
    body: Body<W>,
    structure: Option<String>,
    size: Option<Extent>,
    max_ticks: Option<u64>,
    setup_ticks: Option<u64>,
    padding: Option<u32>,
    batch: Option<String>,
    required: bool,
    tags: Tags,
    rotate: bool,
    max_attempts: Option<u32>,
}

impl<W: World> DefinitionBuilder<'_, W> {
    /// Lay the test out on a structure registered with
    /// [`Registry::define_structure`]. Its size is used unless
    /// [`size`](Self::size) is also given.
    pub fn structure(mut self, name: impl Into<String>) -> Self {
        self.structure = Some(name.into());
        self
    }

    /// Explicit test-area size.
    pub fn size(mut self, extent: Extent) -> Self {
        self.size = Some(extent);
        self
    }

    /// Tick budget, setup grace included.
    pub fn max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Ticks to stay pending before the body runs.
    pub fn setup_ticks(mut self, ticks: u64) -> Self {
        self.setup_ticks = Some(ticks);
        self
    }

    /// Empty columns to reserve on each horizontal side.
    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Mutual-exclusion key: at most one test per key is live at a time.
    pub fn batch(mut self, key: impl Into<String>) -> Self {
        self.batch = Some(key.into());
        self
    }

    /// Whether a failure fails the run. Default: true.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Add a suite tag. Repeated tags are kept once.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Rotate the test area between attempts.
    pub fn rotate(mut self, rotate: bool) -> Self {
        self.rotate = rotate;
        self
    }

    /// Attempts granted if the test is required.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Validate and register the definition.
    ///
    /// # Errors
    ///
    /// See [`RegistryError`]. Nothing is registered on error.
    pub fn submit(self) -> Result<TestId, RegistryError> {
        let Self {
            registry,
            category,
            name,
            body,
            structure,
            size,
            max_ticks,
            setup_ticks,
            padding,
            batch,
            required,
            tags,
            rotate,
            max_attempts,
        } = self;

        // 1. Names must be non-empty and unique.
        if category.is_empty() || name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let qualified = format!("{category}:{name}");
        if registry.names.contains(&qualified) {
            return Err(RegistryError::DuplicateName { name: qualified });
        }
        // 2. Size: explicit, else structure, else default.
        let structure_extent = match &structure {
            Some(s) => Some(registry.structures.get(s).copied().ok_or_else(|| {
                RegistryError::UnknownStructure {
                    name: qualified.clone(),
                    structure: s.clone(),
                }
            })?),
            None => None,
        };
        let extent = size
            .or(structure_extent)
            .unwrap_or(registry.defaults.extent);
        if extent.is_empty() {
            return Err(RegistryError::EmptyExtent {
                name: qualified,
                extent,
            });
        }
        // 3. Timing.
        let max_ticks = max_ticks.unwrap_or(registry.defaults.max_ticks);
        let setup_ticks = setup_ticks.unwrap_or(registry.defaults.setup_ticks);
        if max_ticks == 0 {
            return Err(RegistryError::ZeroMaxTicks { name: qualified });
        }
        if setup_ticks >= max_ticks {
            return Err(RegistryError::SetupExceedsMaxTicks {
                name: qualified,
                setup_ticks,
                max_ticks,
            });
        }
        // 4. Attempts.
        let max_attempts = max_attempts.unwrap_or(registry.defaults.max_attempts);
        if max_attempts == 0 {
            return Err(RegistryError::ZeroMaxAttempts { name: qualified });
        }

        let id = TestId(registry.definitions.len() as u32);
        let definition = TestDefinition {
            meta: TestMeta {
                id,
                category,
                name,
                tags,
                required,
                max_attempts,
                batch,
            },
            structure,
            extent,
            max_ticks,
            setup_ticks,
            padding: padding.unwrap_or(registry.defaults.padding),
            rotate,
            body,
        };
        registry.names.insert(qualified);
        registry.definitions.push(Arc::new(definition));
        Ok(id)
    }
}

// ── RegistryError ─────────────────────────────────────────────────

/// Errors from registering tests or structures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Category or name is empty.
    EmptyName,
    /// A test with the same `category:name` is already registered.
    DuplicateName {
        /// The qualified name.
        name: String,
    },
    /// A structure with the same name is already registered.
    DuplicateStructure {
        /// The structure name.
        name: String,
    },
    /// The test refers to a structure that was never defined.
    UnknownStructure {
        /// The test's qualified name.
        name: String,
        /// The missing structure.
        structure: String,
    },
    /// The resolved size has a zero-length axis.
    EmptyExtent {
        /// The test or structure name.
        name: String,
        /// The offending size.
        extent: Extent,
    },
    /// `max_ticks` is zero.
    ZeroMaxTicks {
        /// The test's qualified name.
        name: String,
    },
    /// The setup grace would consume the whole tick budget.
    SetupExceedsMaxTicks {
        /// The test's qualified name.
        name: String,
        /// Configured setup ticks.
        setup_ticks: u64,
        /// Configured tick budget.
        max_ticks: u64,
    },
    /// `max_attempts` is zero.
    ZeroMaxAttempts {
        /// The test's qualified name.
        name: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "test category and name must be non-empty"),
            Self::DuplicateName { name } => write!(f, "test {name} is already registered"),
            Self::DuplicateStructure { name } => {
                write!(f, "structure {name} is already defined")
            }
            Self::UnknownStructure { name, structure } => {
                write!(f, "test {name} uses unknown structure {structure}")
            }
            Self::EmptyExtent { name, extent } => {
                write!(f, "{name} has empty size {extent}")
            }
            Self::ZeroMaxTicks { name } => write!(f, "test {name} has max_ticks = 0"),
            Self::SetupExceedsMaxTicks {
                name,
                setup_ticks,
                max_ticks,
            } => write!(
                f,
                "test {name}: setup_ticks ({setup_ticks}) must be less than max_ticks ({max_ticks})"
            ),
            Self::ZeroMaxAttempts { name } => write!(f, "test {name} has max_attempts = 0"),
        }
    }
}

impl Error for RegistryError {}

// ── RunPlan ───────────────────────────────────────────────────────

/// Which registered tests take part in a run.
///
/// A definition is *selected* if it matches the tag filter (any listed tag;
/// no tags means every definition) and the name filter (substring of
/// `category:name`). Selected non-required definitions are skipped instead
/// of run when `include_optional` is false. Unselected definitions are not
/// part of the run at all.
#[derive(Clone, Debug)]
pub struct RunPlan {
    tags: Vec<String>,
    name_filter: Option<String>,
    include_optional: bool,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self::all()
    }
}

/// Definitions chosen by a [`RunPlan`].
pub struct Selection<W: World> {
    /// Definitions to run, in registration order.
    pub run: Vec<Arc<TestDefinition<W>>>,
    /// Definitions reported as skipped.
    pub skipped: Vec<TestMeta>,
}

impl RunPlan {
    /// Every definition, optional ones included.
    pub fn all() -> Self {
        Self {
            tags: Vec::new(),
            name_filter: None,
            include_optional: true,
        }
    }

    /// Restrict to definitions carrying `tag` (or any other listed tag).
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Restrict to definitions whose `category:name` contains `pattern`.
    pub fn name_contains(mut self, pattern: impl Into<String>) -> Self {
        self.name_filter = Some(pattern.into());
        self
    }

    /// Whether non-required definitions run (true) or are skipped (false).
    pub fn include_optional(mut self, include: bool) -> Self {
        self.include_optional = include;
        self
    }

    /// Whether `meta` passes the tag and name filters.
    pub fn matches(&self, meta: &TestMeta) -> bool {
        let tag_ok = self.tags.is_empty() || self.tags.iter().any(|t| meta.has_tag(t));
        let name_ok = self
            .name_filter
            .as_deref()
            .is_none_or(|p| meta.qualified_name().contains(p));
        tag_ok && name_ok
    }

    /// Partition `registry` into definitions to run and to skip.
    pub fn select<W: World>(&self, registry: &Registry<W>) -> Selection<W> {
        let mut selection = Selection {
            run: Vec::new(),
            skipped: Vec::new(),
        };
        for def in registry.definitions().filter(|d| self.matches(&d.meta)) {
            if !def.meta.required && !self.include_optional {
                selection.skipped.push(def.meta.clone());
            } else {
                selection.run.push(Arc::clone(def));
            }
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trial_test_utils::MockWorld;

    fn registry() -> Registry<MockWorld> {
        Registry::default()
    }

    #[test]
    fn builder_applies_defaults_and_overrides() {
        let mut reg = registry();
        let id = reg
            .register("redstone", "lamp", |_| Ok(()))
            .max_ticks(40)
            .tag("smoke")
            .tag("smoke")
            .submit()
            .unwrap();
        let def = reg.get(id).unwrap();
        assert_eq!(def.max_ticks, 40);
        assert_eq!(def.setup_ticks, 0);
        assert_eq!(def.padding, 1);
        assert_eq!(def.extent, Extent::cube(5));
        assert_eq!(def.meta.tags.len(), 1);
        assert!(def.meta.required);
    }

    #[test]
    fn structure_size_is_used_unless_overridden() {
        let mut reg = registry();
        reg.define_structure("piston_door", Extent::new(4, 3, 2)).unwrap();
        let a = reg
            .register("doors", "open", |_| Ok(()))
            .structure("piston_door")
            .submit()
            .unwrap();
        let b = reg
            .register("doors", "wide", |_| Ok(()))
            .structure("piston_door")
            .size(Extent::new(8, 3, 2))
            .submit()
            .unwrap();
        assert_eq!(reg.get(a).unwrap().extent, Extent::new(4, 3, 2));
        assert_eq!(reg.get(b).unwrap().extent, Extent::new(8, 3, 2));
    }

    #[test]
    fn unknown_structure_rejected() {
        let mut reg = registry();
        match reg.register("doors", "x", |_| Ok(())).structure("nope").submit() {
            Err(RegistryError::UnknownStructure { structure, .. }) => assert_eq!(structure, "nope"),
            other => panic!("expected UnknownStructure, got {other:?}"),
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut reg = registry();
        reg.register("a", "b", |_| Ok(())).submit().unwrap();
        match reg.register("a", "b", |_| Ok(())).submit() {
            Err(RegistryError::DuplicateName { name }) => assert_eq!(name, "a:b"),
            other => panic!("expected DuplicateName, got {other:?}"),
        }
        // Same name in another category is fine.
        assert!(reg.register("c", "b", |_| Ok(())).submit().is_ok());
    }

    #[test]
    fn setup_must_fit_in_max_ticks() {
        let mut reg = registry();
        match reg
            .register("a", "b", |_| Ok(()))
            .max_ticks(10)
            .setup_ticks(10)
            .submit()
        {
            Err(RegistryError::SetupExceedsMaxTicks { .. }) => {}
            other => panic!("expected SetupExceedsMaxTicks, got {other:?}"),
        }
    }

    #[test]
    fn zero_attempts_and_ticks_rejected() {
        let mut reg = registry();
        assert!(matches!(
            reg.register("a", "b", |_| Ok(())).max_attempts(0).submit(),
            Err(RegistryError::ZeroMaxAttempts { .. })
        ));
        assert!(matches!(
            reg.register("a", "c", |_| Ok(())).max_ticks(0).submit(),
            Err(RegistryError::ZeroMaxTicks { .. })
        ));
        assert_eq!(
            reg.register("", "c", |_| Ok(())).submit(),
            Err(RegistryError::EmptyName)
        );
    }

    #[test]
    fn rotation_cycles_with_id_and_attempt() {
        let mut reg = registry();
        reg.register("a", "fixed", |_| Ok(())).submit().unwrap();
        let id = reg.register("a", "spun", |_| Ok(())).rotate(true).submit().unwrap();
        let fixed = reg.get(TestId(0)).unwrap();
        let spun = reg.get(id).unwrap();
        assert_eq!(fixed.rotation_for(3), Rotation::None);
        assert_eq!(spun.rotation_for(1), Rotation::Clockwise90);
        assert_eq!(spun.rotation_for(2), Rotation::Clockwise180);
        assert_eq!(spun.rotation_for(4), Rotation::None);
    }

    #[test]
    fn plan_filters_by_tag_and_name_and_skips_optional() {
        let mut reg = registry();
        reg.register("redstone", "lamp", |_| Ok(())).tag("smoke").submit().unwrap();
        reg.register("redstone", "clock", |_| Ok(()))
            .tag("smoke")
            .required(false)
            .submit()
            .unwrap();
        reg.register("mobs", "spawn", |_| Ok(())).tag("slow").submit().unwrap();

        let sel = RunPlan::all().tag("smoke").include_optional(false).select(&reg);
        let run: Vec<_> = sel.run.iter().map(|d| d.meta.name.as_str()).collect();
        let skipped: Vec<_> = sel.skipped.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(run, ["lamp"]);
        assert_eq!(skipped, ["clock"]);

        let sel = RunPlan::all().name_contains("mobs:").select(&reg);
        assert_eq!(sel.run.len(), 1);
        assert!(sel.skipped.is_empty());
    }
}
