//! Feature descriptions consumed by verification.

use serde::{Deserialize, Serialize};

/// A unit of functionality whose verification state is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Stable identifier, e.g. `auth.login`.
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Module or area the feature belongs to.
    #[serde(default)]
    pub module: Option<String>,
    /// Acceptance criteria, judged individually.
    #[serde(default)]
    pub acceptance: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub test_requirements: Option<TestRequirements>,
}

/// Declared testing obligations of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TestRequirements {
    #[serde(default)]
    pub unit: Option<UnitTestRequirement>,
    #[serde(default)]
    pub e2e: Option<E2eTestRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UnitTestRequirement {
    #[serde(default)]
    pub required: bool,
    /// Explicit test file pattern; wins over every discovery heuristic.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct E2eTestRequirement {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Feature {
    /// Minimal feature with an id and description.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            module: None,
            acceptance: Vec::new(),
            tags: Vec::new(),
            test_requirements: None,
        }
    }

    /// Explicit unit test pattern, if one is declared and non-blank.
    pub fn explicit_test_pattern(&self) -> Option<&str> {
        self.test_requirements
            .as_ref()
            .and_then(|r| r.unit.as_ref())
            .and_then(|u| u.pattern.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// True when any unit or end-to-end test is marked required.
    pub fn requires_tests(&self) -> bool {
        self.test_requirements.as_ref().is_some_and(|r| {
            r.unit.as_ref().is_some_and(|u| u.required)
                || r.e2e.as_ref().is_some_and(|e| e.required)
        })
    }

    /// E2E tags declared by the feature.
    pub fn e2e_tags(&self) -> &[String] {
        self.test_requirements
            .as_ref()
            .and_then(|r| r.e2e.as_ref())
            .map_or(&[][..], |e| e.tags.as_slice())
    }
}
