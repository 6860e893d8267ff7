//! Collaborative filtering engine
//!
//! The engine picks one backend from a [`CapabilitySet`] when it is built,
//! then trains on interaction batches and answers top-N queries. A trained
//! state (mappings, matrix, fitted model) is committed as one unit: a failed
//! training run leaves the previous state untouched.

mod backend;
#[cfg(feature = "als")]
mod factorization;
mod fallback;
mod matrix;
mod rank;
mod shared;
#[cfg(feature = "linalg")]
mod toolkit;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use backend::BackendKind;
pub use matrix::{prepare, CsrMatrix, IdMapping, InteractionMatrix, PreparedData};
pub use shared::SharedEngine;

use crate::config::EngineConfig;
use crate::error::{RecommendError, Result};
use crate::interaction::{
    validate_records, Interaction, InteractionRecord, ProductId, Recommendation, UserId,
};
use crate::probe::{CapabilitySet, Library};

/// A fitted backend model
pub(crate) trait CollaborativeModel: Sized {
    /// Fit on `matrix`; `caps` gates optional runtime helpers such as rayon
    fn fit(
        matrix: &InteractionMatrix,
        config: &EngineConfig,
        caps: &CapabilitySet,
    ) -> Result<Self>;

    /// Unordered (product index, score) candidates for one user
    fn candidates(&self, matrix: &InteractionMatrix, user: usize) -> Result<Vec<(usize, f64)>>;
}

pub(crate) enum TrainedModel {
    #[cfg(feature = "als")]
    Factorization(factorization::AlsModel),
    #[cfg(feature = "linalg")]
    Toolkit(toolkit::SvdKnnModel),
    Fallback(fallback::CosineModel),
}

impl TrainedModel {
    fn fit(
        backend: BackendKind,
        matrix: &InteractionMatrix,
        config: &EngineConfig,
        caps: &CapabilitySet,
    ) -> Result<Self> {
        match backend {
            #[cfg(feature = "als")]
            BackendKind::Factorization => Ok(TrainedModel::Factorization(
                factorization::AlsModel::fit(matrix, config, caps)?,
            )),
            #[cfg(feature = "linalg")]
            BackendKind::Toolkit => Ok(TrainedModel::Toolkit(toolkit::SvdKnnModel::fit(
                matrix, config, caps,
            )?)),
            BackendKind::Fallback => Ok(TrainedModel::Fallback(fallback::CosineModel::fit(
                matrix, config, caps,
            )?)),
            #[allow(unreachable_patterns)]
            other => Err(RecommendError::BackendUnavailable(other)),
        }
    }

    fn candidates(&self, matrix: &InteractionMatrix, user: usize) -> Result<Vec<(usize, f64)>> {
        match self {
            #[cfg(feature = "als")]
            TrainedModel::Factorization(model) => model.candidates(matrix, user),
            #[cfg(feature = "linalg")]
            TrainedModel::Toolkit(model) => model.candidates(matrix, user),
            TrainedModel::Fallback(model) => model.candidates(matrix, user),
        }
    }
}

/// Outcome of a successful training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub backend: BackendKind,
    pub users: usize,
    pub products: usize,
    pub interactions: usize,
    pub sparse: bool,
}

/// Everything produced by one training run
pub struct TrainedState {
    backend: BackendKind,
    users: IdMapping,
    products: IdMapping,
    matrix: InteractionMatrix,
    model: TrainedModel,
}

impl TrainedState {
    /// Build mappings and matrix, then fit `backend`
    pub(crate) fn fit(
        backend: BackendKind,
        interactions: &[Interaction],
        config: &EngineConfig,
        caps: &CapabilitySet,
    ) -> Result<(Self, TrainSummary)> {
        let sparse = cfg!(feature = "sparse") && caps.contains(Library::Sparse);
        let PreparedData {
            users,
            products,
            matrix,
        } = prepare(interactions, sparse)?;

        let model = TrainedModel::fit(backend, &matrix, config, caps)?;
        let summary = TrainSummary {
            backend,
            users: users.len(),
            products: products.len(),
            interactions: interactions.len(),
            sparse,
        };

        Ok((
            Self {
                backend,
                users,
                products,
                matrix,
                model,
            },
            summary,
        ))
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_products(&self) -> usize {
        self.products.len()
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.users.index_of(user_id).is_some()
    }

    /// Stored (product, value) pairs for a user
    pub fn rated_products(&self, user_id: UserId) -> Vec<(ProductId, f64)> {
        let Some(user) = self.users.index_of(user_id) else {
            return Vec::new();
        };
        self.matrix
            .row_entries(user)
            .into_iter()
            .filter_map(|(idx, value)| self.products.id_at(idx).map(|id| (id, value)))
            .collect()
    }

    pub fn recommend(&self, user_id: UserId, n: usize) -> Result<Vec<Recommendation>> {
        let user = self
            .users
            .index_of(user_id)
            .ok_or(RecommendError::UnknownUser(user_id))?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let candidates = self.model.candidates(&self.matrix, user)?;
        Ok(rank::top_n(candidates, &self.products, n))
    }
}

impl std::fmt::Debug for TrainedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedState")
            .field("backend", &self.backend)
            .field("users", &self.users.len())
            .field("products", &self.products.len())
            .field("sparse", &self.matrix.is_sparse())
            .finish()
    }
}

/// Log a recommendation failure and degrade to an empty list
pub(crate) fn empty_on_error(result: Result<Vec<Recommendation>>) -> Vec<Recommendation> {
    match result {
        Ok(recs) => recs,
        Err(RecommendError::NotTrained) => {
            tracing::warn!("Model not trained yet");
            Vec::new()
        }
        Err(RecommendError::UnknownUser(user_id)) => {
            tracing::warn!("User {} not in training data", user_id);
            Vec::new()
        }
        Err(e) => {
            tracing::error!("Recommendation failed: {}", e);
            Vec::new()
        }
    }
}

/// Single-owner collaborative filtering engine
#[derive(Debug)]
pub struct CollaborativeFilteringEngine {
    backend: BackendKind,
    capabilities: CapabilitySet,
    config: EngineConfig,
    state: Option<Arc<TrainedState>>,
}

impl CollaborativeFilteringEngine {
    /// Select the best backend `caps` supports
    pub fn new(caps: &CapabilitySet, config: EngineConfig) -> Self {
        let backend = BackendKind::select(caps);
        tracing::info!("Using {} backend for collaborative filtering", backend);
        Self {
            backend,
            capabilities: caps.clone(),
            config,
            state: None,
        }
    }

    /// Force a backend; fails when this build or `caps` cannot run it
    pub fn with_backend(
        caps: &CapabilitySet,
        config: EngineConfig,
        backend: BackendKind,
    ) -> Result<Self> {
        if !backend.is_supported_by(caps) {
            return Err(RecommendError::BackendUnavailable(backend));
        }
        tracing::info!("Using {} backend for collaborative filtering", backend);
        Ok(Self {
            backend,
            capabilities: caps.clone(),
            config,
            state: None,
        })
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    pub fn num_users(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.num_users())
    }

    pub fn num_products(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.num_products())
    }

    /// The committed trained state, if any
    pub fn state(&self) -> Option<Arc<TrainedState>> {
        self.state.clone()
    }

    pub fn try_train(&mut self, interactions: &[Interaction]) -> Result<TrainSummary> {
        let (state, summary) =
            TrainedState::fit(self.backend, interactions, &self.config, &self.capabilities)?;
        self.state = Some(Arc::new(state));
        tracing::info!(
            "Trained {} model on {} interactions",
            self.backend,
            summary.interactions
        );
        Ok(summary)
    }

    /// Train, logging any failure; the previous state survives a failure
    pub fn train(&mut self, interactions: &[Interaction]) -> bool {
        match self.try_train(interactions) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Training failed: {}", e);
                false
            }
        }
    }

    /// Validate loosely-typed records, then train
    pub fn train_records(&mut self, records: &[InteractionRecord]) -> bool {
        match validate_records(records) {
            Ok(interactions) => self.train(&interactions),
            Err(e) => {
                tracing::error!("Training failed: {}", e);
                false
            }
        }
    }

    pub fn try_recommend(&self, user_id: UserId, n: usize) -> Result<Vec<Recommendation>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let state = self.state.as_ref().ok_or(RecommendError::NotTrained)?;
        state.recommend(user_id, n)
    }

    /// Top-`n` products for a user; empty when untrained or the user is
    /// unknown
    pub fn recommend(&self, user_id: UserId, n: usize) -> Vec<Recommendation> {
        empty_on_error(self.try_recommend(user_id, n))
    }
}
