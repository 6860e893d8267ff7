//! binc-recommend - Collaborative filtering with capability-based backends
//!
//! This crate provides the recommendation engine behind the binc store:
//!
//! - **Probe**: detects which optional numerical libraries this build and
//!   configuration can use, and which language resources are on disk
//! - **Engine**: builds a user×product interaction matrix and fits one of
//!   three backends, chosen once from the probe's capability set
//! - **Signal**: folds raw user actions (view, like, purchase, ...) into
//!   weighted interaction scores
//! - **Service**: pads collaborative results with popular products
//! - **Sentiment**: lexicon-based review scoring (feature `sentiment`)
//! - **Config**: TOML/JSON configuration for all of the above
//!
//! # Backends
//!
//! ```text
//! Factorization  implicit ALS            needs ndarray + nalgebra + rand
//! Toolkit        truncated SVD + kNN     needs ndarray + nalgebra
//! Fallback       dense cosine similarity needs ndarray
//! ```
//!
//! # Example
//!
//! ```
//! use binc_recommend::{CollaborativeFilteringEngine, DependencyManager, EngineConfig, Interaction};
//!
//! let probe = DependencyManager::detect();
//! let mut engine = CollaborativeFilteringEngine::new(&probe.capabilities(), EngineConfig::default());
//! let batch = vec![
//!     Interaction::new(1, 1, 5.0),
//!     Interaction::new(1, 2, 1.0),
//!     Interaction::new(2, 1, 4.0),
//!     Interaction::new(2, 3, 5.0),
//! ];
//! assert!(engine.train(&batch));
//! assert!(engine.recommend(1, 2).len() <= 2);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod io;
pub mod probe;
#[cfg(feature = "sentiment")]
pub mod sentiment;
pub mod service;
pub mod signal;

pub use config::{
    EngineConfig, FactorizationConfig, FallbackConfig, ProbeConfig, RecommendConfig,
    ServiceConfig, SignalConfig, ToolkitConfig,
};
pub use engine::{
    BackendKind, CollaborativeFilteringEngine, SharedEngine, TrainSummary, TrainedState,
};
pub use error::{ConfigError, ProbeError, RecommendError, Result};
pub use interaction::{
    Interaction, InteractionRecord, ProductId, Recommendation, RecommendationSource, UserId,
};
pub use probe::{CapabilitySet, DependencyManager, Library, StatusReport};
#[cfg(feature = "sentiment")]
pub use sentiment::{Lexicon, Review, SentimentAnalyzer, SentimentLabel, SentimentScore};
pub use service::RecommendationService;
pub use signal::{InteractionKind, SignalAggregator, SignalEvent};
