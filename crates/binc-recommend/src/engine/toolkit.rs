//! Truncated SVD with a brute-force cosine nearest-neighbour index
//!
//! Users are projected onto the leading left singular vectors scaled by
//! their singular values. Neighbours are found in that latent space and
//! vote with their raw ratings, weighted by inverse cosine distance.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use super::matrix::InteractionMatrix;
use super::rank;
use super::CollaborativeModel;
use crate::config::EngineConfig;
use crate::engine::BackendKind;
use crate::error::{RecommendError, Result};
use crate::probe::CapabilitySet;

/// Cosine-distance index over the rows of a feature matrix
pub(crate) struct CosineIndex {
    features: Array2<f64>,
    norms: Array1<f64>,
}

impl CosineIndex {
    pub(crate) fn new(features: Array2<f64>) -> Self {
        let norms = features.rows().into_iter().map(|r| r.dot(&r).sqrt()).collect();
        Self { features, norms }
    }

    pub(crate) fn len(&self) -> usize {
        self.features.nrows()
    }

    /// Cosine distance `1 - cos`, clamped at zero. Rows with zero norm are
    /// at distance 1 from everything.
    pub(crate) fn distance(&self, a: usize, b: usize) -> f64 {
        let denom = self.norms[a] * self.norms[b];
        if denom == 0.0 {
            return 1.0;
        }
        let cos = self.features.row(a).dot(&self.features.row(b)) / denom;
        (1.0 - cos).max(0.0)
    }

    /// The `k` nearest rows to `row`, excluding `row` itself
    pub(crate) fn query(&self, row: usize, k: usize) -> Vec<(usize, f64)> {
        rank::nearest(
            (0..self.len()).map(|other| (other, self.distance(row, other))),
            row,
            k,
        )
    }
}

pub(crate) struct SvdKnnModel {
    index: CosineIndex,
    neighbors: usize,
    epsilon: f64,
}

/// Leading `k` components of `U Σ`, by descending singular value
fn latent_features(dense: &Array2<f64>, k: usize) -> Result<Array2<f64>> {
    let (m, n) = dense.dim();
    let matrix = DMatrix::from_fn(m, n, |r, c| dense[[r, c]]);
    let svd = matrix
        .try_svd(true, false, f64::EPSILON, 0)
        .ok_or_else(|| RecommendError::linalg(BackendKind::Toolkit, "SVD did not converge"))?;
    let u = svd.u.ok_or_else(|| {
        RecommendError::linalg(BackendKind::Toolkit, "SVD produced no left vectors")
    })?;
    let sigma = svd.singular_values;

    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]).then(a.cmp(&b)));
    order.truncate(k);

    Ok(Array2::from_shape_fn((m, order.len()), |(r, j)| {
        u[(r, order[j])] * sigma[order[j]]
    }))
}

impl CollaborativeModel for SvdKnnModel {
    fn fit(
        matrix: &InteractionMatrix,
        config: &EngineConfig,
        _caps: &CapabilitySet,
    ) -> Result<Self> {
        let dense = matrix.to_dense();
        let (m, n) = dense.dim();
        let k = config.toolkit.components.min(m).min(n);

        let features = latent_features(&dense, k)?;
        tracing::info!(
            "Trained SVD model with {} components over {} users",
            features.ncols(),
            m
        );

        Ok(Self {
            index: CosineIndex::new(features),
            neighbors: config.toolkit.neighbors,
            epsilon: config.toolkit.distance_epsilon,
        })
    }

    fn candidates(&self, matrix: &InteractionMatrix, user: usize) -> Result<Vec<(usize, f64)>> {
        let mut scores = Array1::<f64>::zeros(matrix.ncols());
        for (other, distance) in self.index.query(user, self.neighbors) {
            let weight = 1.0 / (distance + self.epsilon);
            scores.scaled_add(weight, &matrix.row_dense(other));
        }
        Ok(rank::positive_unrated(&scores, &matrix.row_dense(user)))
    }
}
