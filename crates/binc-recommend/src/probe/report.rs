//! Status report types for the dependency probe

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::resources::ResourceStatus;

/// Outcome of probing a single library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStatus {
    pub available: bool,
    /// Version requirement, present when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Facilities provided, present when available
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// Why the library is unusable, present when unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LibraryStatus {
    pub fn available(version: &str, components: &[&str]) -> Self {
        Self {
            available: true,
            version: Some(version.to_string()),
            components: components.iter().map(|c| c.to_string()).collect(),
            reason: None,
        }
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            version: None,
            components: Vec::new(),
            reason: Some(reason.into()),
        }
    }
}

/// Library counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_libraries: usize,
    pub available: usize,
    pub missing: usize,
}

/// Diagnostic snapshot of the probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub summary: Summary,
    /// Per-library detail keyed by library name
    pub details: BTreeMap<String, LibraryStatus>,
    /// Remediation hint per missing library
    pub recommendations: BTreeMap<String, String>,
    /// Language resource files and their state
    pub resources: Vec<ResourceStatus>,
    /// Available libraries whose resources are unusable
    pub degraded: Vec<String>,
}

impl StatusReport {
    /// Whether every tracked library is available and none is degraded
    pub fn is_healthy(&self) -> bool {
        self.summary.missing == 0 && self.degraded.is_empty()
    }
}
