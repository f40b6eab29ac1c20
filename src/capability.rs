//! Capability triple used to select a workflow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a workflow knows how to build.
///
/// `language` is the programming language (`python`), `dependency_manager` the
/// tool that resolves its dependencies (`pip`), and `application_framework` an
/// optional framework the code is written against. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub dependency_manager: Option<String>,
    #[serde(default)]
    pub application_framework: Option<String>,
}

impl Capability {
    pub fn new(
        language: Option<&str>,
        dependency_manager: Option<&str>,
        application_framework: Option<&str>,
    ) -> Self {
        Self {
            language: language.map(str::to_string),
            dependency_manager: dependency_manager.map(str::to_string),
            application_framework: application_framework.map(str::to_string),
        }
    }

    /// Registry key: lower-cased fields joined by `_`, absent fields as "".
    ///
    /// Positions are kept even when empty so that a new dimension appended
    /// at the end leaves existing keys untouched.
    pub fn key(&self) -> String {
        [
            self.language.as_deref(),
            self.dependency_manager.as_deref(),
            self.application_framework.as_deref(),
        ]
        .iter()
        .map(|field| field.unwrap_or("").to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            display_field(&self.language),
            display_field(&self.dependency_manager),
            display_field(&self.application_framework)
        )
    }
}

pub(crate) fn display_field(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("(none)")
}
