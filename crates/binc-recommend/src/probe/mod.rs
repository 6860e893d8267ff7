//! Dependency probe
//!
//! Determines once which optional libraries are usable and publishes the
//! result as a read-only [`CapabilitySet`]. A missing library is an ordinary
//! outcome recorded as data; nothing here returns an error to the caller.
//!
//! Availability combines two sources:
//! - compile time: the Cargo feature behind each library
//! - run time: `disabled_libraries` in [`ProbeConfig`] (and `BINC_RECS_DISABLE`)

mod library;
mod report;
mod resources;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use library::{CapabilitySet, Library, UnknownLibrary};
pub use report::{LibraryStatus, StatusReport, Summary};
#[cfg(feature = "fetch")]
pub use resources::HttpFetcher;
pub use resources::{
    write_resource, LanguageResource, ResourceFetcher, ResourceState, ResourceStatus,
    LEXICON_RESOURCES, VADER_LEXICON,
};

use crate::config::ProbeConfig;

/// Probes optional libraries and language resources
pub struct DependencyManager {
    config: ProbeConfig,
    data_dir: PathBuf,
    statuses: BTreeMap<Library, LibraryStatus>,
    fetcher: Option<Box<dyn ResourceFetcher>>,
}

impl DependencyManager {
    /// Probe with the given configuration and the default fetcher
    pub fn new(config: ProbeConfig) -> Self {
        let fetcher = default_fetcher(&config);
        Self::build(config, fetcher)
    }

    /// Probe with an explicit resource fetcher
    pub fn with_fetcher(config: ProbeConfig, fetcher: Box<dyn ResourceFetcher>) -> Self {
        Self::build(config, Some(fetcher))
    }

    /// Probe with default configuration
    pub fn detect() -> Self {
        Self::new(ProbeConfig::default())
    }

    fn build(config: ProbeConfig, fetcher: Option<Box<dyn ResourceFetcher>>) -> Self {
        let statuses = check(&config);
        let data_dir = config.resolved_data_dir();
        Self {
            config,
            data_dir,
            statuses,
            fetcher,
        }
    }

    /// Whether `name` is a known library that is usable. Unknown names are
    /// reported as unavailable.
    pub fn is_available(&self, name: &str) -> bool {
        name.parse::<Library>()
            .map(|lib| self.library_available(lib))
            .unwrap_or(false)
    }

    pub fn library_available(&self, library: Library) -> bool {
        self.statuses
            .get(&library)
            .map(|s| s.available)
            .unwrap_or(false)
    }

    /// Probe outcome for one library
    pub fn status(&self, library: Library) -> Option<&LibraryStatus> {
        self.statuses.get(&library)
    }

    /// Usable libraries, to hand to the engine
    pub fn capabilities(&self) -> CapabilitySet {
        self.statuses
            .iter()
            .filter(|(_, status)| status.available)
            .map(|(lib, _)| *lib)
            .collect()
    }

    /// Directory language resources are read from
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Location of a language resource under the data directory
    pub fn resource_path(&self, resource: &LanguageResource) -> PathBuf {
        resource.path_in(&self.data_dir)
    }

    /// Build a status report.
    ///
    /// When `fetch_missing_resources` is set, absent lexicon resources are
    /// fetched first. Fetch failures only mark the lexicon as degraded.
    pub fn status_report(&self) -> StatusReport {
        let available = self.statuses.values().filter(|s| s.available).count();
        let summary = Summary {
            total_libraries: self.statuses.len(),
            available,
            missing: self.statuses.len() - available,
        };

        let details = self
            .statuses
            .iter()
            .map(|(lib, status)| (lib.name().to_string(), status.clone()))
            .collect();

        let recommendations = self
            .statuses
            .iter()
            .filter(|(_, status)| !status.available)
            .map(|(lib, _)| (lib.name().to_string(), self.install_hint(*lib)))
            .collect();

        let mut resources = Vec::new();
        let mut degraded = Vec::new();
        if self.library_available(Library::Lexicon) {
            resources = LEXICON_RESOURCES
                .iter()
                .map(|resource| self.resource_status(resource))
                .collect();
            if resources.iter().any(|r| !r.state.is_usable()) {
                degraded.push(Library::Lexicon.name().to_string());
            }
        }

        StatusReport {
            summary,
            details,
            recommendations,
            resources,
            degraded,
        }
    }

    /// Log the report: summary, one line per library, then hints
    pub fn log_status(&self) {
        let report = self.status_report();
        tracing::info!(
            "Dependency status: {}/{} libraries available",
            report.summary.available,
            report.summary.total_libraries
        );

        for (name, status) in &report.details {
            if status.available {
                tracing::info!(
                    "  {} v{}",
                    name,
                    status.version.as_deref().unwrap_or("unknown")
                );
            } else {
                tracing::warn!(
                    "  {} - {}",
                    name,
                    status.reason.as_deref().unwrap_or("not available")
                );
            }
        }

        for resource in &report.resources {
            if !resource.state.is_usable() {
                tracing::warn!("  resource {} unusable: {:?}", resource.name, resource.state);
            }
        }

        if !report.recommendations.is_empty() {
            tracing::info!("Installation recommendations:");
            for hint in report.recommendations.values() {
                tracing::info!("  {}", hint);
            }
        }
    }

    fn install_hint(&self, library: Library) -> String {
        if library.compiled() && self.config.is_disabled(library.name()) {
            return format!(
                "Remove '{}' from probe.disabled_libraries to re-enable it",
                library.name()
            );
        }
        match library.feature() {
            Some(feature) => format!(
                "Rebuild with: cargo build --features {} ({})",
                feature,
                library.degradation()
            ),
            None => format!("{} is a required dependency", library.name()),
        }
    }

    fn resource_status(&self, resource: &LanguageResource) -> ResourceStatus {
        let path = self.resource_path(resource);
        let state = if path.exists() {
            ResourceState::Present
        } else if !self.config.fetch_missing_resources {
            ResourceState::Missing
        } else {
            self.fetch_resource(resource, &path)
        };
        ResourceStatus {
            name: resource.name.to_string(),
            path,
            state,
        }
    }

    fn fetch_resource(&self, resource: &LanguageResource, path: &Path) -> ResourceState {
        let Some(fetcher) = &self.fetcher else {
            tracing::warn!(
                "Cannot fetch {}: no resource fetcher (build with the `fetch` feature)",
                resource.name
            );
            return ResourceState::FetchFailed(crate::error::ProbeError::NoFetcher.to_string());
        };

        tracing::info!("Downloading missing language resource: {}", resource.name);
        match fetcher.fetch(resource, path) {
            Ok(()) => {
                tracing::info!("Downloaded {}", resource.name);
                ResourceState::Fetched
            }
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", resource.name, e);
                ResourceState::FetchFailed(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for DependencyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyManager")
            .field("data_dir", &self.data_dir)
            .field("statuses", &self.statuses)
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

/// Probe every tracked library. Never fails; each outcome is logged.
fn check(config: &ProbeConfig) -> BTreeMap<Library, LibraryStatus> {
    Library::ALL
        .into_iter()
        .map(|lib| {
            let status = if !lib.compiled() {
                let feature = lib.feature().unwrap_or("default");
                LibraryStatus::missing(format!("compiled without the `{}` feature", feature))
            } else if config.is_disabled(lib.name()) {
                LibraryStatus::missing("disabled by configuration")
            } else {
                LibraryStatus::available(lib.version(), lib.components())
            };

            if status.available {
                tracing::info!("{} {} available", lib, lib.version());
            } else if lib.is_critical() {
                tracing::error!("{} not available. This is a critical dependency!", lib);
            } else {
                tracing::warn!("{} not available. {}", lib, lib.degradation());
            }

            (lib, status)
        })
        .collect()
}

#[cfg(feature = "fetch")]
fn default_fetcher(config: &ProbeConfig) -> Option<Box<dyn ResourceFetcher>> {
    match HttpFetcher::new(config.resource_base_url.clone()) {
        Ok(fetcher) => Some(Box::new(fetcher)),
        Err(e) => {
            tracing::warn!("HTTP resource fetcher unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "fetch"))]
fn default_fetcher(_config: &ProbeConfig) -> Option<Box<dyn ResourceFetcher>> {
    None
}
