//! Optional libraries tracked by the dependency probe
//!
//! Each library maps to a Cargo feature (and usually an optional crate).
//! `ndarray` is the only unconditional one.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A library whose presence changes what the engine can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Library {
    /// Dense n-dimensional arrays; required by every backend
    Ndarray,
    /// SVD and Cholesky decompositions
    Nalgebra,
    /// Seeded random initialization for factor matrices
    Rand,
    /// Data-parallel per-row solves
    Rayon,
    /// Compressed sparse row storage for interaction matrices
    Sparse,
    /// Sentiment lexicon support (needs downloaded language data)
    Lexicon,
}

/// Name did not match any tracked library
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown library: {0}")]
pub struct UnknownLibrary(pub String);

impl Library {
    /// Every tracked library, in probe order
    pub const ALL: [Library; 6] = [
        Library::Ndarray,
        Library::Nalgebra,
        Library::Rand,
        Library::Rayon,
        Library::Sparse,
        Library::Lexicon,
    ];

    /// Stable lowercase name used in reports and configuration
    pub fn name(&self) -> &'static str {
        match self {
            Library::Ndarray => "ndarray",
            Library::Nalgebra => "nalgebra",
            Library::Rand => "rand",
            Library::Rayon => "rayon",
            Library::Sparse => "sparse",
            Library::Lexicon => "lexicon",
        }
    }

    /// Cargo feature that compiles the library in, `None` if always present
    pub fn feature(&self) -> Option<&'static str> {
        match self {
            Library::Ndarray => None,
            Library::Nalgebra => Some("linalg"),
            Library::Rand => Some("als"),
            Library::Rayon => Some("parallel"),
            Library::Sparse => Some("sparse"),
            Library::Lexicon => Some("sentiment"),
        }
    }

    /// Whether this build includes the library
    pub fn compiled(&self) -> bool {
        match self {
            Library::Ndarray => true,
            Library::Nalgebra => cfg!(feature = "linalg"),
            Library::Rand => cfg!(feature = "als"),
            Library::Rayon => cfg!(feature = "parallel"),
            Library::Sparse => cfg!(feature = "sparse"),
            Library::Lexicon => cfg!(feature = "sentiment"),
        }
    }

    /// Version requirement the library was built against
    pub fn version(&self) -> &'static str {
        match self {
            Library::Ndarray => "0.16",
            Library::Nalgebra => "0.33",
            Library::Rand => "0.8",
            Library::Rayon => "1.10",
            Library::Sparse | Library::Lexicon => env!("CARGO_PKG_VERSION"),
        }
    }

    /// Engine facilities the library provides
    pub fn components(&self) -> &'static [&'static str] {
        match self {
            Library::Ndarray => &["Array2", "dot"],
            Library::Nalgebra => &["SVD", "Cholesky"],
            Library::Rand => &["StdRng"],
            Library::Rayon => &["par_iter"],
            Library::Sparse => &["CsrMatrix"],
            Library::Lexicon => &["Lexicon", "SentimentAnalyzer"],
        }
    }

    /// What stops working when the library is missing
    pub fn degradation(&self) -> &'static str {
        match self {
            Library::Ndarray => "Only the dense cosine fallback can run.",
            Library::Nalgebra => "Falling back to dense cosine similarity.",
            Library::Rand => "Using SVD nearest-neighbour collaborative filtering.",
            Library::Rayon => "Factorization solves run sequentially.",
            Library::Sparse => "Interaction matrices are stored dense.",
            Library::Lexicon => "Sentiment is derived from ratings only.",
        }
    }

    /// Required by every backend above the fallback
    pub fn is_critical(&self) -> bool {
        matches!(self, Library::Ndarray)
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Library {
    type Err = UnknownLibrary;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Library::ALL
            .into_iter()
            .find(|lib| lib.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownLibrary(s.to_string()))
    }
}

/// The set of libraries detected as usable
///
/// Passed by value into the engine so backend selection never consults
/// global state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    libraries: BTreeSet<Library>,
}

impl CapabilitySet {
    /// No optional libraries at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Every library this build was compiled with
    pub fn compiled() -> Self {
        Library::ALL.into_iter().filter(Library::compiled).collect()
    }

    pub fn contains(&self, library: Library) -> bool {
        self.libraries.contains(&library)
    }

    /// Builder-style insert
    pub fn with(mut self, library: Library) -> Self {
        self.libraries.insert(library);
        self
    }

    /// Builder-style removal
    pub fn without(mut self, library: Library) -> Self {
        self.libraries.remove(&library);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = Library> + '_ {
        self.libraries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

impl FromIterator<Library> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Library>>(iter: I) -> Self {
        Self {
            libraries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.libraries.iter().map(Library::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
