//! Backend selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::probe::{CapabilitySet, Library};

/// The three numerical strategies, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Alternating least squares matrix factorization
    Factorization,
    /// Truncated SVD with a cosine nearest-neighbour index
    Toolkit,
    /// Dense user×user cosine similarity
    Fallback,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Factorization,
        BackendKind::Toolkit,
        BackendKind::Fallback,
    ];

    /// Pick the best backend the capability set supports.
    ///
    /// Pure function of `caps` (and of what this build compiled in).
    pub fn select(caps: &CapabilitySet) -> BackendKind {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.is_supported_by(caps))
            .unwrap_or(BackendKind::Fallback)
    }

    /// Libraries the backend needs. The fallback only uses `ndarray`, which
    /// every build links, so it runs under any capability set.
    pub fn requirements(&self) -> &'static [Library] {
        match self {
            BackendKind::Factorization => &[Library::Ndarray, Library::Nalgebra, Library::Rand],
            BackendKind::Toolkit => &[Library::Ndarray, Library::Nalgebra],
            BackendKind::Fallback => &[],
        }
    }

    /// Whether this build contains the backend's code
    pub fn is_compiled(&self) -> bool {
        match self {
            BackendKind::Factorization => cfg!(feature = "als"),
            BackendKind::Toolkit => cfg!(feature = "linalg"),
            BackendKind::Fallback => true,
        }
    }

    pub fn is_supported_by(&self, caps: &CapabilitySet) -> bool {
        self.is_compiled() && self.requirements().iter().all(|lib| caps.contains(*lib))
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Factorization => "factorization",
            BackendKind::Toolkit => "toolkit",
            BackendKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "factorization" | "als" => Ok(BackendKind::Factorization),
            "toolkit" | "svd" => Ok(BackendKind::Toolkit),
            "fallback" | "cosine" => Ok(BackendKind::Fallback),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}
