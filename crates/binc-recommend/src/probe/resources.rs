//! Language resources needed by the lexicon capability
//!
//! Resources live under the probe's data directory. When one is missing and
//! fetching is enabled, a [`ResourceFetcher`] is asked to download it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// A data file a library needs at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageResource {
    /// Short name used in logs and reports
    pub name: &'static str,
    /// Location relative to the data directory
    pub relative_path: &'static str,
    /// File name relative to the fetch base URL
    pub remote_name: &'static str,
}

impl LanguageResource {
    /// Absolute location of this resource under `data_dir`
    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.relative_path)
    }
}

/// VADER valence lexicon (`token<TAB>mean<TAB>stddev<TAB>ratings`)
pub const VADER_LEXICON: LanguageResource = LanguageResource {
    name: "vader_lexicon",
    relative_path: "sentiment/vader_lexicon.txt",
    remote_name: "vader_lexicon.txt",
};

/// Resources required by the lexicon library
pub const LEXICON_RESOURCES: &[LanguageResource] = &[VADER_LEXICON];

/// Observed state of a resource at report time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Already on disk
    Present,
    /// Downloaded during this report
    Fetched,
    /// Absent and fetching is disabled
    Missing,
    /// Absent and the download failed
    FetchFailed(String),
}

impl ResourceState {
    /// Whether the resource can be used after this report
    pub fn is_usable(&self) -> bool {
        matches!(self, ResourceState::Present | ResourceState::Fetched)
    }
}

/// Per-resource entry in a status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub name: String,
    pub path: PathBuf,
    pub state: ResourceState,
}

/// Source of language resources
pub trait ResourceFetcher: Send + Sync {
    /// Download `resource` and write it to `dest`
    fn fetch(&self, resource: &LanguageResource, dest: &Path) -> Result<(), ProbeError>;
}

/// Downloads resources over HTTP from `<base_url>/<remote_name>`
#[cfg(feature = "fetch")]
pub struct HttpFetcher {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "fetch")]
impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProbeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ProbeError::Fetch {
                resource: "http client".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn url_for(&self, resource: &LanguageResource) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            resource.remote_name
        )
    }
}

#[cfg(feature = "fetch")]
impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, resource: &LanguageResource, dest: &Path) -> Result<(), ProbeError> {
        let url = self.url_for(resource);
        let fetch_err = |message: String| ProbeError::Fetch {
            resource: resource.name.to_string(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_err(format!("{} returned {}", url, response.status())));
        }
        let body = response.bytes().map_err(|e| fetch_err(e.to_string()))?;

        write_resource(dest, &body)
    }
}

/// Write resource bytes, creating parent directories
pub fn write_resource(dest: &Path, bytes: &[u8]) -> Result<(), ProbeError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, bytes)?;
    Ok(())
}
