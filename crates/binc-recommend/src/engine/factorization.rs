//! Implicit-feedback alternating least squares
//!
//! Each stored value is read as a preference (`1` when positive, `0`
//! otherwise) with confidence `|value|`. User and item factors are solved in
//! turn from the weighted normal equations
//! `(YᵀY + Σ (c - 1) y yᵀ + λI) x = Σ c p y`, one Cholesky solve per row.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::matrix::InteractionMatrix;
use super::CollaborativeModel;
use crate::config::{EngineConfig, FactorizationConfig};
use crate::engine::BackendKind;
use crate::error::{RecommendError, Result};
use crate::probe::{CapabilitySet, Library};

pub(crate) struct AlsModel {
    user_factors: Array2<f64>,
    item_factors: Array2<f64>,
}

impl AlsModel {
    /// Fit factors; `parallel` spreads the per-row solves over rayon's pool
    /// when this build has it.
    pub(crate) fn train(
        matrix: &InteractionMatrix,
        config: &FactorizationConfig,
        parallel: bool,
    ) -> Result<Self> {
        let factors = config.factors;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut user_factors =
            Array2::from_shape_fn((matrix.nrows(), factors), |_| rng.gen::<f64>() * 0.01);
        let mut item_factors =
            Array2::from_shape_fn((matrix.ncols(), factors), |_| rng.gen::<f64>() * 0.01);

        let by_user = matrix.by_rows();
        let by_item = matrix.by_columns();

        for iteration in 0..config.iterations {
            user_factors = solve_side(&by_user, &item_factors, config.regularization, parallel)?;
            item_factors = solve_side(&by_item, &user_factors, config.regularization, parallel)?;

            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!(
                    "ALS iteration {}: loss {:.6}",
                    iteration + 1,
                    loss(&by_user, &user_factors, &item_factors)
                );
            }
        }

        tracing::info!(
            "Trained ALS model: {} factors, {} iterations",
            factors,
            config.iterations
        );
        Ok(Self {
            user_factors,
            item_factors,
        })
    }

    /// Predicted preference of `user` for every product
    pub(crate) fn scores(&self, user: usize) -> Array1<f64> {
        self.item_factors.dot(&self.user_factors.row(user))
    }

    #[cfg(test)]
    pub(crate) fn user_factors(&self) -> &Array2<f64> {
        &self.user_factors
    }
}

impl CollaborativeModel for AlsModel {
    fn fit(
        matrix: &InteractionMatrix,
        config: &EngineConfig,
        caps: &CapabilitySet,
    ) -> Result<Self> {
        Self::train(
            matrix,
            &config.factorization,
            caps.contains(Library::Rayon),
        )
    }

    fn candidates(&self, matrix: &InteractionMatrix, user: usize) -> Result<Vec<(usize, f64)>> {
        let rated = matrix.row_dense(user);
        Ok(self
            .scores(user)
            .iter()
            .zip(rated.iter())
            .enumerate()
            .filter(|(_, (_, &value))| value == 0.0)
            .map(|(idx, (&score, _))| (idx, score))
            .collect())
    }
}

/// Solve every row of one side against the fixed factors of the other
fn solve_side(
    entries: &[Vec<(usize, f64)>],
    fixed: &Array2<f64>,
    regularization: f64,
    parallel: bool,
) -> Result<Array2<f64>> {
    let factors = fixed.ncols();
    let y = DMatrix::from_fn(fixed.nrows(), factors, |r, c| fixed[[r, c]]);
    let gram = y.transpose() * &y + DMatrix::identity(factors, factors) * regularization;
    let solve = |row: &Vec<(usize, f64)>| solve_row(row, &y, &gram);

    #[cfg(feature = "parallel")]
    let rows: Vec<DVector<f64>> = if parallel {
        entries.par_iter().map(solve).collect::<Result<_>>()?
    } else {
        entries.iter().map(solve).collect::<Result<_>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<DVector<f64>> = {
        let _ = parallel;
        entries.iter().map(solve).collect::<Result<_>>()?
    };

    Ok(Array2::from_shape_fn((rows.len(), factors), |(r, c)| {
        rows[r][c]
    }))
}

fn solve_row(
    entries: &[(usize, f64)],
    y: &DMatrix<f64>,
    gram: &DMatrix<f64>,
) -> Result<DVector<f64>> {
    let factors = gram.nrows();
    if entries.is_empty() {
        return Ok(DVector::zeros(factors));
    }

    let mut a = gram.clone();
    let mut b = DVector::zeros(factors);
    for &(j, value) in entries {
        let yj = y.row(j).transpose();
        let confidence = value.abs();
        let preference = if value > 0.0 { 1.0 } else { 0.0 };
        a.ger(confidence - 1.0, &yj, &yj, 1.0);
        b.axpy(confidence * preference, &yj, 1.0);
    }

    a.cholesky().map(|chol| chol.solve(&b)).ok_or_else(|| {
        RecommendError::linalg(
            BackendKind::Factorization,
            "normal equations are not positive definite",
        )
    })
}

/// Mean squared preference error over stored entries
fn loss(by_user: &[Vec<(usize, f64)>], users: &Array2<f64>, items: &Array2<f64>) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for (u, row) in by_user.iter().enumerate() {
        for &(i, value) in row {
            let preference = if value > 0.0 { 1.0 } else { 0.0 };
            let predicted = users.row(u).dot(&items.row(i));
            total += (preference - predicted).powi(2);
            count += 1;
        }
    }
    total / count.max(1) as f64
}
