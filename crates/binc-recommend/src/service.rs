//! Recommendation service
//!
//! Wraps the engine with product popularity so that a query always has
//! something to offer: collaborative results come first, then popular
//! products the user has not already rated positively.

use std::collections::{BTreeMap, HashSet};

use crate::config::{RecommendConfig, ServiceConfig};
use crate::engine::{CollaborativeFilteringEngine, TrainSummary};
use crate::error::Result;
use crate::interaction::{Interaction, ProductId, Recommendation, UserId};
use crate::probe::{CapabilitySet, DependencyManager};
use crate::signal::SignalAggregator;

#[derive(Debug)]
pub struct RecommendationService {
    engine: CollaborativeFilteringEngine,
    config: ServiceConfig,
    popularity: Vec<(ProductId, f64)>,
}

impl RecommendationService {
    pub fn new(caps: &CapabilitySet, config: &RecommendConfig) -> Self {
        Self::with_engine(
            CollaborativeFilteringEngine::new(caps, config.engine.clone()),
            config.service.clone(),
        )
    }

    /// Build from a probe's capabilities
    pub fn from_probe(probe: &DependencyManager, config: &RecommendConfig) -> Self {
        Self::new(&probe.capabilities(), config)
    }

    pub fn with_engine(engine: CollaborativeFilteringEngine, config: ServiceConfig) -> Self {
        Self {
            engine,
            config,
            popularity: Vec::new(),
        }
    }

    pub fn engine(&self) -> &CollaborativeFilteringEngine {
        &self.engine
    }

    /// Train the engine and, on success, recompute popularity
    pub fn try_train(&mut self, interactions: &[Interaction]) -> Result<TrainSummary> {
        let summary = self.engine.try_train(interactions)?;
        self.popularity = popularity(interactions);
        Ok(summary)
    }

    pub fn train(&mut self, interactions: &[Interaction]) -> bool {
        match self.try_train(interactions) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Training failed: {}", e);
                false
            }
        }
    }

    /// Train on the accumulated totals of a signal aggregator
    pub fn train_signals(&mut self, signals: &SignalAggregator) -> bool {
        self.train(&signals.interactions())
    }

    /// Most popular products, at most `n`
    pub fn popular(&self, n: usize) -> Vec<Recommendation> {
        self.popularity
            .iter()
            .take(n)
            .map(|&(product_id, score)| Recommendation::popular(product_id, score))
            .collect()
    }

    /// Collaborative results, padded with popular products when enabled
    pub fn recommend(&self, user_id: UserId, n: usize) -> Vec<Recommendation> {
        let mut recs = self.engine.recommend(user_id, n);
        if recs.len() >= n || !self.config.popular_fallback {
            return recs;
        }

        let mut seen: HashSet<ProductId> = recs.iter().map(|r| r.product_id).collect();
        if let Some(state) = self.engine.state() {
            seen.extend(
                state
                    .rated_products(user_id)
                    .into_iter()
                    .filter(|(_, value)| *value > 0.0)
                    .map(|(product_id, _)| product_id),
            );
        }

        let padding: Vec<Recommendation> = self
            .popularity
            .iter()
            .filter(|(product_id, _)| !seen.contains(product_id))
            .take(n - recs.len())
            .map(|&(product_id, score)| Recommendation::popular(product_id, score))
            .collect();
        if !padding.is_empty() {
            tracing::debug!(
                "Padded recommendations for user {} with {} popular products",
                user_id,
                padding.len()
            );
        }
        recs.extend(padding);
        recs
    }
}

/// Sum of positive scores per product, descending, ties by product id
fn popularity(interactions: &[Interaction]) -> Vec<(ProductId, f64)> {
    let mut totals: BTreeMap<ProductId, f64> = BTreeMap::new();
    for interaction in interactions.iter().filter(|i| i.score > 0.0) {
        *totals.entry(interaction.product_id).or_insert(0.0) += interaction.score;
    }
    let mut ranked: Vec<(ProductId, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}
