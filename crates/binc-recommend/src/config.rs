//! Configuration for binc-recommend
//!
//! Centralized configuration for the dependency probe, backend
//! hyperparameters, popularity padding and interaction signal weights.
//! Every section has defaults, so a TOML file only needs the keys it
//! overrides:
//!
//! ```toml
//! [probe]
//! disabled_libraries = ["rand"]
//! fetch_missing_resources = true
//!
//! [engine.factorization]
//! factors = 32
//!
//! [signals.weights]
//! purchase = 12.0
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::signal::InteractionKind;

/// Environment variable holding extra comma-separated libraries to disable
pub const DISABLE_ENV_VAR: &str = "BINC_RECS_DISABLE";

/// Default base URL for language resource downloads
pub const DEFAULT_RESOURCE_BASE_URL: &str =
    "https://raw.githubusercontent.com/cjhutto/vaderSentiment/master/vaderSentiment";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Dependency probe settings
    pub probe: ProbeConfig,
    /// Backend hyperparameters
    pub engine: EngineConfig,
    /// Recommendation padding
    pub service: ServiceConfig,
    /// Interaction signal weights
    pub signals: SignalConfig,
}

/// Dependency probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Libraries to treat as unavailable even when compiled in
    pub disabled_libraries: Vec<String>,
    /// Directory holding language resources (platform data dir when unset)
    pub data_dir: Option<PathBuf>,
    /// Download missing language resources when a report is requested
    pub fetch_missing_resources: bool,
    /// Base URL resources are fetched from
    pub resource_base_url: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            disabled_libraries: Vec::new(),
            data_dir: None,
            fetch_missing_resources: false,
            resource_base_url: DEFAULT_RESOURCE_BASE_URL.to_string(),
        }
    }
}

impl ProbeConfig {
    /// Data directory, falling back to `<platform data dir>/binc/recommend`
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|d| d.join("binc").join("recommend"))
            .unwrap_or_else(|| PathBuf::from(".binc-recommend"))
    }

    /// Add comma-separated library names to the disabled list
    pub fn merge_disabled(&mut self, list: &str) {
        for name in list.split(',') {
            let name = name.trim().to_ascii_lowercase();
            if !name.is_empty() && !self.disabled_libraries.contains(&name) {
                self.disabled_libraries.push(name);
            }
        }
    }

    /// Apply `BINC_RECS_DISABLE` from the environment
    pub fn apply_env(&mut self) {
        if let Ok(list) = std::env::var(DISABLE_ENV_VAR) {
            self.merge_disabled(&list);
        }
    }

    /// Whether a library has been disabled by configuration
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_libraries
            .iter()
            .any(|d| d.eq_ignore_ascii_case(name))
    }
}

/// Hyperparameters for all three backends
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub factorization: FactorizationConfig,
    pub toolkit: ToolkitConfig,
    pub fallback: FallbackConfig,
}

/// Alternating least squares parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorizationConfig {
    /// Latent factors per user and item
    pub factors: usize,
    /// Alternating sweeps over users and items
    pub iterations: usize,
    /// L2 regularization (lambda)
    pub regularization: f64,
    /// Seed for factor initialization
    pub seed: u64,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            factors: 100,
            iterations: 20,
            regularization: 0.01,
            seed: 42,
        }
    }
}

/// Truncated SVD + nearest neighbour parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Maximum latent dimensions kept from the SVD
    pub components: usize,
    /// Neighbours consulted per query
    pub neighbors: usize,
    /// Added to distances before inverting them
    pub distance_epsilon: f64,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            components: 50,
            neighbors: 10,
            distance_epsilon: 1e-8,
        }
    }
}

/// Dense cosine similarity parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Most similar users consulted per query
    pub neighbors: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self { neighbors: 10 }
    }
}

/// Recommendation padding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Pad short collaborative results with popular products
    pub popular_fallback: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            popular_fallback: true,
        }
    }
}

/// Interaction signal weighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Accumulated weight a product needs to count as preferred
    pub preferred_threshold: f64,
    /// Maximum preferred products reported per user
    pub preferred_limit: usize,
    /// Per-kind weight overrides, keyed by kind name (`purchase`, `like`, ...)
    pub weights: BTreeMap<String, f64>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            preferred_threshold: 5.0,
            preferred_limit: 20,
            weights: BTreeMap::new(),
        }
    }
}

impl RecommendConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Standard config location: `<platform config dir>/binc/recommend.toml`
    pub fn standard_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("binc").join("recommend.toml"))
    }

    /// Load from the standard location if present, defaults otherwise.
    /// `BINC_RECS_DISABLE` is applied in both cases.
    pub fn load_standard() -> Result<Self, ConfigError> {
        let mut config = match Self::standard_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading recommendation config from {:?}", path);
                Self::load(&path)?
            }
            _ => Self::default(),
        };
        config.probe.apply_env();
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.engine.factorization;
        if f.factors == 0 {
            return Err(ConfigError::OutOfRange(
                "factorization.factors must be positive".to_string(),
            ));
        }
        if f.iterations == 0 {
            return Err(ConfigError::OutOfRange(
                "factorization.iterations must be positive".to_string(),
            ));
        }
        // lambda keeps the normal equations positive definite when there are
        // fewer products than factors
        if !(f.regularization > 0.0 && f.regularization.is_finite()) {
            return Err(ConfigError::OutOfRange(
                "factorization.regularization must be a positive number".to_string(),
            ));
        }

        let t = &self.engine.toolkit;
        if t.components == 0 {
            return Err(ConfigError::OutOfRange(
                "toolkit.components must be positive".to_string(),
            ));
        }
        if t.neighbors == 0 || self.engine.fallback.neighbors == 0 {
            return Err(ConfigError::OutOfRange(
                "neighbors must be positive".to_string(),
            ));
        }
        if !(t.distance_epsilon > 0.0) {
            return Err(ConfigError::OutOfRange(
                "toolkit.distance_epsilon must be positive".to_string(),
            ));
        }

        if let Some(kind) = self
            .signals
            .weights
            .keys()
            .find(|k| k.parse::<InteractionKind>().is_err())
        {
            return Err(ConfigError::OutOfRange(format!(
                "unknown signal kind '{}'",
                kind
            )));
        }
        if let Some((kind, _)) = self.signals.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(ConfigError::OutOfRange(format!(
                "signal weight for '{}' must be finite",
                kind
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RecommendConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.factorization.factors, 100);
        assert_eq!(config.engine.factorization.iterations, 20);
        assert_eq!(config.engine.toolkit.components, 50);
        assert_eq!(config.engine.fallback.neighbors, 10);
    }

    #[test]
    fn test_partial_toml() {
        let config = RecommendConfig::from_toml(
            r#"
            [probe]
            disabled_libraries = ["nalgebra"]

            [engine.factorization]
            factors = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.probe.disabled_libraries, vec!["nalgebra"]);
        assert_eq!(config.engine.factorization.factors, 8);
        assert_eq!(config.engine.factorization.iterations, 20);
        assert!(config.service.popular_fallback);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = RecommendConfig::default();
        config.signals.weights.insert("purchase".to_string(), 12.0);
        let toml = config.to_toml().unwrap();
        assert_eq!(RecommendConfig::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_json_serialization() {
        let config = RecommendConfig::default();
        let json = config.to_json().unwrap();
        let parsed = RecommendConfig::from_json(&json).unwrap();
        assert_eq!(parsed.engine.toolkit.neighbors, config.engine.toolkit.neighbors);
    }

    #[test]
    fn test_out_of_range() {
        let mut config = RecommendConfig::default();
        config.engine.factorization.factors = 0;
        assert!(config.validate().is_err());

        let mut config = RecommendConfig::default();
        config.engine.toolkit.distance_epsilon = 0.0;
        assert!(config.validate().is_err());

        let mut config = RecommendConfig::default();
        config.signals.weights.insert("view".to_string(), f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_regularization_must_be_positive() {
        for lambda in [0.0, -0.5, f64::INFINITY] {
            let mut config = RecommendConfig::default();
            config.engine.factorization.regularization = lambda;
            assert!(config.validate().is_err(), "lambda {} accepted", lambda);
        }

        let mut config = RecommendConfig::default();
        config.engine.factorization.regularization = 1e-6;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_disabled() {
        let mut probe = ProbeConfig::default();
        probe.merge_disabled(" Rayon, sparse,,rayon ");
        assert_eq!(probe.disabled_libraries, vec!["rayon", "sparse"]);
        assert!(probe.is_disabled("RAYON"));
        assert!(!probe.is_disabled("ndarray"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommend.toml");
        std::fs::write(&path, "[engine.fallback]\nneighbors = 3\n").unwrap();
        let config = RecommendConfig::load(&path).unwrap();
        assert_eq!(config.engine.fallback.neighbors, 3);

        assert!(matches!(
            RecommendConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
