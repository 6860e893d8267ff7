//! Shared fixtures for integration tests

#![allow(dead_code)]

use binc_recommend::{
    BackendKind, CapabilitySet, CollaborativeFilteringEngine, EngineConfig, FactorizationConfig,
    Interaction, Library,
};

/// Two users sharing product 1; user 2 also likes product 3
pub fn scenario() -> Vec<Interaction> {
    vec![
        Interaction::new(1, 1, 5.0),
        Interaction::new(1, 2, 1.0),
        Interaction::new(2, 1, 4.0),
        Interaction::new(2, 3, 5.0),
    ]
}

/// Capabilities that admit exactly `kind` as the best backend
pub fn capabilities_for(kind: BackendKind) -> CapabilitySet {
    let base = CapabilitySet::none().with(Library::Ndarray);
    match kind {
        BackendKind::Factorization => base.with(Library::Nalgebra).with(Library::Rand),
        BackendKind::Toolkit => base.with(Library::Nalgebra),
        BackendKind::Fallback => base,
    }
}

/// Engine config small enough for property tests
pub fn quick_config() -> EngineConfig {
    EngineConfig {
        factorization: FactorizationConfig {
            factors: 4,
            iterations: 3,
            ..FactorizationConfig::default()
        },
        ..EngineConfig::default()
    }
}

pub fn engine(kind: BackendKind, config: EngineConfig) -> CollaborativeFilteringEngine {
    CollaborativeFilteringEngine::with_backend(&capabilities_for(kind), config, kind)
        .expect("backend compiled into this build")
}

/// Backends compiled into this build
pub fn compiled_backends() -> Vec<BackendKind> {
    BackendKind::ALL
        .into_iter()
        .filter(|kind| kind.is_compiled())
        .collect()
}
