//! Engine integration tests

mod common;

use std::collections::{HashMap, HashSet};

use binc_recommend::{
    BackendKind, CapabilitySet, CollaborativeFilteringEngine, DependencyManager, EngineConfig,
    Interaction, InteractionRecord, ProbeConfig, RecommendConfig, RecommendationService,
    RecommendationSource,
};
use common::{compiled_backends, engine, quick_config, scenario};
use proptest::prelude::*;
use rstest::rstest;

// === Backend selection ===

#[test]
fn test_selection_is_deterministic() {
    let probe = DependencyManager::detect();
    let caps = probe.capabilities();
    let first = BackendKind::select(&caps);
    for _ in 0..5 {
        assert_eq!(BackendKind::select(&caps), first);
    }
}

#[test]
fn test_disabling_nalgebra_forces_fallback() {
    let config = ProbeConfig {
        disabled_libraries: vec!["nalgebra".to_string()],
        ..ProbeConfig::default()
    };
    let probe = DependencyManager::new(config);
    let engine = CollaborativeFilteringEngine::new(&probe.capabilities(), EngineConfig::default());
    assert_eq!(engine.backend(), BackendKind::Fallback);
}

#[cfg(feature = "linalg")]
#[test]
fn test_disabling_rand_selects_toolkit() {
    let config = ProbeConfig {
        disabled_libraries: vec!["rand".to_string()],
        ..ProbeConfig::default()
    };
    let probe = DependencyManager::new(config);
    assert_eq!(BackendKind::select(&probe.capabilities()), BackendKind::Toolkit);
}

#[test]
fn test_every_capability_set_can_force_the_selected_backend() {
    let probe = DependencyManager::detect();
    for caps in [CapabilitySet::none(), probe.capabilities()] {
        let selected = BackendKind::select(&caps);
        let forced =
            CollaborativeFilteringEngine::with_backend(&caps, EngineConfig::default(), selected);
        assert_eq!(forced.unwrap().backend(), selected);
    }
}

#[cfg(feature = "als")]
#[test]
fn test_default_factorization_trains_small_catalog() {
    let config = RecommendConfig::default();
    config.validate().unwrap();
    assert!(config.engine.factorization.factors > 3);

    let mut engine = engine(BackendKind::Factorization, config.engine);
    let summary = engine.try_train(&scenario()).unwrap();
    assert_eq!(summary.products, 3);
}

// === Scenario ===

#[test]
fn test_fallback_scenario_recommends_product_three() {
    let mut engine = engine(BackendKind::Fallback, EngineConfig::default());
    assert!(engine.train(&scenario()));

    let recs = engine.recommend(1, 2);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].product_id, 3);
    assert!(recs[0].score > 0.0);
}

#[rstest]
#[case(BackendKind::Factorization)]
#[case(BackendKind::Toolkit)]
#[case(BackendKind::Fallback)]
fn test_scenario_excludes_rated_products(#[case] kind: BackendKind) {
    if !kind.is_compiled() {
        return;
    }
    let mut engine = engine(kind, EngineConfig::default());
    assert!(engine.train(&scenario()));
    assert_eq!(engine.backend(), kind);

    let recs = engine.recommend(1, 2);
    assert!(recs.len() <= 2);
    assert!(recs.iter().all(|r| r.product_id == 3));
    assert!(recs.iter().all(|r| r.source == RecommendationSource::Collaborative));
}

#[rstest]
#[case(BackendKind::Factorization)]
#[case(BackendKind::Toolkit)]
#[case(BackendKind::Fallback)]
fn test_empty_batch_keeps_prior_state(#[case] kind: BackendKind) {
    if !kind.is_compiled() {
        return;
    }
    let mut engine = engine(kind, quick_config());
    assert!(!engine.train(&[]));
    assert!(!engine.is_trained());

    assert!(engine.train(&scenario()));
    let before = engine.recommend(1, 5);
    assert!(!engine.train(&[]));
    assert!(engine.is_trained());
    assert_eq!(engine.recommend(1, 5), before);
}

#[test]
fn test_untrained_and_unknown_user_are_empty() {
    for kind in compiled_backends() {
        let mut engine = engine(kind, quick_config());
        assert!(engine.recommend(1, 10).is_empty());
        engine.train(&scenario());
        assert!(engine.recommend(404, 10).is_empty());
    }
}

#[test]
fn test_train_records_from_csv() {
    let csv = "user_id,product_id,score\n1,1,5\n1,2,1\n2,1,4\n2,3,5\n";
    let records = binc_recommend::io::read_interactions(csv.as_bytes()).unwrap();
    let mut engine = engine(BackendKind::Fallback, EngineConfig::default());
    assert!(engine.train_records(&records));
    assert_eq!(engine.recommend(1, 1)[0].product_id, 3);

    let broken = vec![InteractionRecord {
        user_id: Some(1),
        product_id: Some(1),
        score: None,
    }];
    assert!(!engine.train_records(&broken));
    assert_eq!(engine.num_users(), 2);
}

#[test]
fn test_sparse_and_dense_storage_agree() {
    let data = vec![
        Interaction::new(1, 1, 5.0),
        Interaction::new(1, 2, 2.0),
        Interaction::new(2, 1, 3.0),
        Interaction::new(2, 3, 4.0),
        Interaction::new(3, 2, 1.0),
        Interaction::new(3, 4, 5.0),
        Interaction::new(3, 1, 2.0),
    ];
    let dense_caps = common::capabilities_for(BackendKind::Fallback);
    let sparse_caps = dense_caps.clone().with(binc_recommend::Library::Sparse);

    let mut dense = CollaborativeFilteringEngine::new(&dense_caps, EngineConfig::default());
    let mut sparse = CollaborativeFilteringEngine::new(&sparse_caps, EngineConfig::default());
    let dense_summary = dense.try_train(&data).unwrap();
    let sparse_summary = sparse.try_train(&data).unwrap();

    assert!(!dense_summary.sparse);
    assert_eq!(sparse_summary.sparse, cfg!(feature = "sparse"));
    for user in 1..=3 {
        assert_eq!(dense.recommend(user, 4), sparse.recommend(user, 4));
    }
}

#[test]
fn test_service_pads_with_popular_products() {
    let config = RecommendConfig::default();
    let caps = CapabilitySet::none();
    let mut service = RecommendationService::new(&caps, &config);
    let mut data = scenario();
    data.push(Interaction::new(3, 4, 2.0));
    assert!(service.train(&data));

    let recs = service.recommend(1, 3);
    assert_eq!(recs[0].product_id, 3);
    assert_eq!(recs[0].source, RecommendationSource::Collaborative);
    assert_eq!(recs[1].product_id, 4);
    assert_eq!(recs[1].source, RecommendationSource::Popular);
    assert_eq!(recs.len(), 2);
}

// === Properties ===

fn batch_strategy() -> impl Strategy<Value = Vec<Interaction>> {
    prop::collection::vec((1i64..8, 1i64..10, -3.0f64..10.0), 1..40).prop_map(|rows| {
        rows.into_iter()
            .map(|(u, p, s)| Interaction::new(u, p, (s * 2.0).round() / 2.0))
            .collect()
    })
}

/// Final value per (user, product) after last-wins deduplication
fn positively_rated(batch: &[Interaction], user: i64) -> HashSet<i64> {
    let mut last: HashMap<i64, f64> = HashMap::new();
    for i in batch.iter().filter(|i| i.user_id == user) {
        last.insert(i.product_id, i.score);
    }
    last.into_iter()
        .filter(|(_, score)| *score > 0.0)
        .map(|(product, _)| product)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_recommend_respects_contract(batch in batch_strategy(), n in 0usize..6) {
        for kind in compiled_backends() {
            let mut engine = engine(kind, quick_config());
            prop_assert!(engine.train(&batch));

            for user in 1i64..8 {
                let recs = engine.recommend(user, n);
                prop_assert!(recs.len() <= n);

                let ids: HashSet<i64> = recs.iter().map(|r| r.product_id).collect();
                prop_assert_eq!(ids.len(), recs.len(), "duplicate products for {}", kind);

                let rated = positively_rated(&batch, user);
                prop_assert!(ids.is_disjoint(&rated), "{} recommended a rated product", kind);

                prop_assert!(recs.iter().all(|r| r.score.is_finite()));
                prop_assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
            }
        }
    }

    #[test]
    fn test_fallback_never_produces_non_finite(batch in batch_strategy()) {
        let mut engine = engine(BackendKind::Fallback, quick_config());
        prop_assert!(engine.train(&batch));
        for user in 1i64..8 {
            for rec in engine.recommend(user, 10) {
                prop_assert!(rec.score.is_finite() && rec.score > 0.0);
            }
        }
    }
}
