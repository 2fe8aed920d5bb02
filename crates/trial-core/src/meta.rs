//! Simulation-independent test metadata.

use serde::Serialize;
use smallvec::SmallVec;

use crate::id::TestId;

/// Tag list of a definition. Most tests carry one or two tags.
pub type Tags = SmallVec<[String; 2]>;

/// The parts of a test definition that reporting needs.
///
/// Separated from the (simulation-generic) definition so that the
/// reporter never has to know which world a test ran against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestMeta {
    /// Registry-assigned id.
    pub id: TestId,
    /// Grouping category (e.g. `redstone`, `mobs`).
    pub category: String,
    /// Name, unique within its category.
    pub name: String,
    /// Suite membership tags.
    pub tags: Tags,
    /// Whether a failure of this test fails the run.
    pub required: bool,
    /// Maximum number of attempts for a required test.
    pub max_attempts: u32,
    /// Mutual-exclusion key, if any.
    pub batch: Option<String>,
}

impl TestMeta {
    /// `category:name`, unique within a registry.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.category, self.name)
    }

    /// Whether the test carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn qualified_name_joins_category_and_name() {
        let meta = TestMeta {
            id: TestId(0),
            category: "redstone".into(),
            name: "lamp_lights".into(),
            tags: smallvec!["smoke".to_string()],
            required: true,
            max_attempts: 1,
            batch: None,
        };
        assert_eq!(meta.qualified_name(), "redstone:lamp_lights");
        assert!(meta.has_tag("smoke"));
        assert!(!meta.has_tag("slow"));
    }
}
