//! Property results and the checker trait.

use serde::Serialize;

use crate::counterexample::Counterexample;

/// Outcome of checking a single named property.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyResult {
    /// Property name (e.g. "BoundedCapacity")
    pub name: String,
    /// Whether the property held
    pub holds: bool,
    /// Violation message, if any
    pub message: Option<String>,
    /// Failure path, if one was captured
    #[serde(skip)]
    pub counterexample: Option<Counterexample>,
}

impl PropertyResult {
    /// Create a passing result.
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            holds: true,
            message: None,
            counterexample: None,
        }
    }

    /// Create a failing result.
    #[must_use]
    pub fn fail(
        name: impl Into<String>,
        message: impl Into<String>,
        counterexample: Option<Counterexample>,
    ) -> Self {
        Self {
            name: name.into(),
            holds: false,
            message: Some(message.into()),
            counterexample,
        }
    }

    /// One-line summary for logs and assertion messages.
    #[must_use]
    pub fn summary(&self) -> String {
        match (&self.message, self.holds) {
            (_, true) => format!("[PASS] {}", self.name),
            (Some(msg), false) => format!("[FAIL] {}: {}", self.name, msg),
            (None, false) => format!("[FAIL] {}", self.name),
        }
    }
}

/// Anything that can check a set of properties.
pub trait PropertyChecker {
    /// Check every property and return all results, passing or not.
    fn check_all(&self) -> Vec<PropertyResult>;

    /// True if every property holds.
    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.holds)
    }

    /// Only the failing results.
    fn violations(&self) -> Vec<PropertyResult> {
        self.check_all().into_iter().filter(|r| !r.holds).collect()
    }
}
