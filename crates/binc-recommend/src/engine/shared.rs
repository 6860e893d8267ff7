//! Thread-safe engine for concurrent services
//!
//! Training fits outside any lock and then swaps the `Arc` of the trained
//! state under a short write lock. Readers clone the `Arc` and query without
//! holding a lock. Concurrent training runs are serialized by `train_lock`.

use std::sync::{Arc, Mutex, RwLock};

use super::{empty_on_error, BackendKind, TrainSummary, TrainedState};
use crate::config::EngineConfig;
use crate::error::{RecommendError, Result};
use crate::interaction::{validate_records, Interaction, InteractionRecord, Recommendation, UserId};
use crate::probe::CapabilitySet;

#[derive(Debug)]
pub struct SharedEngine {
    backend: BackendKind,
    capabilities: CapabilitySet,
    config: EngineConfig,
    state: RwLock<Option<Arc<TrainedState>>>,
    train_lock: Mutex<()>,
}

impl SharedEngine {
    pub fn new(caps: &CapabilitySet, config: EngineConfig) -> Self {
        let backend = BackendKind::select(caps);
        tracing::info!("Using {} backend for collaborative filtering", backend);
        Self {
            backend,
            capabilities: caps.clone(),
            config,
            state: RwLock::new(None),
            train_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Current trained state; cheap to clone and safe to hold across a retrain
    pub fn snapshot(&self) -> Option<Arc<TrainedState>> {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn num_users(&self) -> usize {
        self.snapshot().map_or(0, |s| s.num_users())
    }

    pub fn num_products(&self) -> usize {
        self.snapshot().map_or(0, |s| s.num_products())
    }

    pub fn try_train(&self, interactions: &[Interaction]) -> Result<TrainSummary> {
        let _training = match self.train_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let (state, summary) =
            TrainedState::fit(self.backend, interactions, &self.config, &self.capabilities)?;
        let state = Arc::new(state);

        match self.state.write() {
            Ok(mut guard) => *guard = Some(state),
            Err(poisoned) => *poisoned.into_inner() = Some(state),
        }
        tracing::info!(
            "Trained {} model on {} interactions",
            self.backend,
            summary.interactions
        );
        Ok(summary)
    }

    pub fn train(&self, interactions: &[Interaction]) -> bool {
        match self.try_train(interactions) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Training failed: {}", e);
                false
            }
        }
    }

    pub fn train_records(&self, records: &[InteractionRecord]) -> bool {
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
        let state = self.snapshot().ok_or(RecommendError::NotTrained)?;
        state.recommend(user_id, n)
    }

    pub fn recommend(&self, user_id: UserId, n: usize) -> Vec<Recommendation> {
        empty_on_error(self.try_recommend(user_id, n))
    }
}
