//! Interaction signals
//!
//! Raw user actions (views, likes, purchases, ...) are folded into one
//! weighted score per (user, product) pair, which is what the engine trains
//! on.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SignalConfig;
use crate::interaction::{Interaction, ProductId, UserId};

/// Kind of user action on a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Like,
    Dislike,
    AddToCart,
    Purchase,
    Review,
    Share,
    Compare,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 8] = [
        InteractionKind::View,
        InteractionKind::Like,
        InteractionKind::Dislike,
        InteractionKind::AddToCart,
        InteractionKind::Purchase,
        InteractionKind::Review,
        InteractionKind::Share,
        InteractionKind::Compare,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Like => "like",
            InteractionKind::Dislike => "dislike",
            InteractionKind::AddToCart => "add_to_cart",
            InteractionKind::Purchase => "purchase",
            InteractionKind::Review => "review",
            InteractionKind::Share => "share",
            InteractionKind::Compare => "compare",
        }
    }

    /// Weight used when configuration does not override it
    pub fn default_weight(&self) -> f64 {
        match self {
            InteractionKind::View => 1.0,
            InteractionKind::Like => 3.0,
            InteractionKind::Dislike => -2.0,
            InteractionKind::AddToCart => 5.0,
            InteractionKind::Purchase => 10.0,
            InteractionKind::Review => 7.0,
            InteractionKind::Share => 4.0,
            InteractionKind::Compare => 2.0,
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('-', "_");
        InteractionKind::ALL
            .into_iter()
            .find(|kind| kind.name() == needle)
            .ok_or_else(|| format!("unknown interaction kind: {}", s))
    }
}

/// One observed user action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub kind: InteractionKind,
}

impl SignalEvent {
    pub fn new(user_id: UserId, product_id: ProductId, kind: InteractionKind) -> Self {
        Self {
            user_id,
            product_id,
            kind,
        }
    }
}

/// Accumulates weighted signals per (user, product)
#[derive(Debug, Clone)]
pub struct SignalAggregator {
    weights: BTreeMap<InteractionKind, f64>,
    threshold: f64,
    limit: usize,
    totals: BTreeMap<(UserId, ProductId), f64>,
}

impl Default for SignalAggregator {
    fn default() -> Self {
        Self::new(&SignalConfig::default())
    }
}

impl SignalAggregator {
    /// Weights start at their defaults; entries in `config.weights` override
    /// them. Unknown kind names are skipped with a warning.
    pub fn new(config: &SignalConfig) -> Self {
        let mut weights: BTreeMap<InteractionKind, f64> = InteractionKind::ALL
            .into_iter()
            .map(|kind| (kind, kind.default_weight()))
            .collect();
        for (name, weight) in &config.weights {
            match name.parse::<InteractionKind>() {
                Ok(kind) => {
                    weights.insert(kind, *weight);
                }
                Err(e) => tracing::warn!("Ignoring signal weight: {}", e),
            }
        }

        Self {
            weights,
            threshold: config.preferred_threshold,
            limit: config.preferred_limit,
            totals: BTreeMap::new(),
        }
    }

    pub fn weight(&self, kind: InteractionKind) -> f64 {
        self.weights
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_weight())
    }

    /// Add the event's weight to its pair's total
    pub fn record(&mut self, event: SignalEvent) {
        let weight = self.weight(event.kind);
        *self
            .totals
            .entry((event.user_id, event.product_id))
            .or_insert(0.0) += weight;
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = SignalEvent>) {
        for event in events {
            self.record(event);
        }
    }

    pub fn total(&self, user_id: UserId, product_id: ProductId) -> f64 {
        self.totals
            .get(&(user_id, product_id))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Accumulated totals as a training batch, ordered by (user, product)
    pub fn interactions(&self) -> Vec<Interaction> {
        self.totals
            .iter()
            .map(|(&(user_id, product_id), &score)| Interaction::new(user_id, product_id, score))
            .collect()
    }

    /// Products whose total exceeds the configured threshold, strongest
    /// first, at most the configured limit
    pub fn preferred_products(&self, user_id: UserId) -> Vec<(ProductId, f64)> {
        self.preferred_products_with(user_id, self.threshold, self.limit)
    }

    pub fn preferred_products_with(
        &self,
        user_id: UserId,
        threshold: f64,
        limit: usize,
    ) -> Vec<(ProductId, f64)> {
        let mut preferred: Vec<(ProductId, f64)> = self
            .totals
            .range((user_id, ProductId::MIN)..=(user_id, ProductId::MAX))
            .filter(|(_, &total)| total > threshold)
            .map(|(&(_, product_id), &total)| (product_id, total))
            .collect();
        preferred.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        preferred.truncate(limit);
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("view", InteractionKind::View, 1.0)]
    #[case("like", InteractionKind::Like, 3.0)]
    #[case("dislike", InteractionKind::Dislike, -2.0)]
    #[case("add_to_cart", InteractionKind::AddToCart, 5.0)]
    #[case("Add-To-Cart", InteractionKind::AddToCart, 5.0)]
    #[case("purchase", InteractionKind::Purchase, 10.0)]
    #[case("review", InteractionKind::Review, 7.0)]
    #[case("share", InteractionKind::Share, 4.0)]
    #[case("compare", InteractionKind::Compare, 2.0)]
    fn test_kind_weights(#[case] name: &str, #[case] kind: InteractionKind, #[case] weight: f64) {
        let parsed: InteractionKind = name.parse().unwrap();
        assert_eq!(parsed, kind);
        assert_eq!(parsed.default_weight(), weight);
    }

    #[test]
    fn test_record_accumulates() {
        let mut agg = SignalAggregator::default();
        agg.extend([
            SignalEvent::new(1, 10, InteractionKind::View),
            SignalEvent::new(1, 10, InteractionKind::Purchase),
            SignalEvent::new(1, 20, InteractionKind::Dislike),
            SignalEvent::new(2, 10, InteractionKind::Like),
        ]);
        assert_eq!(agg.total(1, 10), 11.0);
        assert_eq!(agg.total(1, 20), -2.0);
        assert_eq!(agg.total(3, 10), 0.0);

        let batch = agg.interactions();
        assert_eq!(
            batch,
            vec![
                Interaction::new(1, 10, 11.0),
                Interaction::new(1, 20, -2.0),
                Interaction::new(2, 10, 3.0),
            ]
        );
    }

    #[test]
    fn test_config_overrides_weight() {
        let mut config = SignalConfig::default();
        config.weights.insert("view".to_string(), 0.5);
        config.weights.insert("teleport".to_string(), 9.0);
        let agg = SignalAggregator::new(&config);
        assert_eq!(agg.weight(InteractionKind::View), 0.5);
        assert_eq!(agg.weight(InteractionKind::Purchase), 10.0);
    }

    #[test]
    fn test_preferred_products() {
        let mut agg = SignalAggregator::default();
        agg.extend([
            SignalEvent::new(1, 1, InteractionKind::AddToCart),
            SignalEvent::new(1, 2, InteractionKind::Purchase),
            SignalEvent::new(1, 3, InteractionKind::Review),
            SignalEvent::new(1, 4, InteractionKind::Review),
            SignalEvent::new(2, 5, InteractionKind::Purchase),
        ]);
        // add_to_cart alone (5.0) does not exceed the threshold
        assert_eq!(
            agg.preferred_products(1),
            vec![(2, 10.0), (3, 7.0), (4, 7.0)]
        );
        assert_eq!(agg.preferred_products_with(1, 5.0, 1), vec![(2, 10.0)]);
        assert!(agg.preferred_products(9).is_empty());
    }
}
