//! Dense user-based cosine similarity
//!
//! Needs nothing beyond `ndarray`. Rows are L2-normalized (zero rows stay
//! zero) and the full similarity matrix is one product `N · Nᵀ`.

use ndarray::{Array1, Array2, Axis};

use super::matrix::InteractionMatrix;
use super::rank;
use super::CollaborativeModel;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::probe::CapabilitySet;

pub(crate) struct CosineModel {
    similarity: Array2<f64>,
    neighbors: usize,
}

#[cfg(test)]
impl CosineModel {
    pub(crate) fn similarity(&self) -> &Array2<f64> {
        &self.similarity
    }
}

/// Row-normalize, leaving zero-norm rows untouched
pub(crate) fn normalize_rows(matrix: &Array2<f64>) -> Array2<f64> {
    let norms = matrix
        .map_axis(Axis(1), |row| row.dot(&row).sqrt())
        .mapv(|n| if n == 0.0 { 1.0 } else { n });
    matrix / &norms.insert_axis(Axis(1))
}

impl CollaborativeModel for CosineModel {
    fn fit(
        matrix: &InteractionMatrix,
        config: &EngineConfig,
        _caps: &CapabilitySet,
    ) -> Result<Self> {
        let normalized = normalize_rows(&matrix.to_dense());
        let similarity = normalized.dot(&normalized.t());

        tracing::info!(
            "Trained cosine similarity model over {} users",
            similarity.nrows()
        );
        Ok(Self {
            similarity,
            neighbors: config.fallback.neighbors,
        })
    }

    fn candidates(&self, matrix: &InteractionMatrix, user: usize) -> Result<Vec<(usize, f64)>> {
        let similarities = self.similarity.row(user);
        let neighbours = rank::most_similar(
            similarities.iter().copied().enumerate(),
            user,
            self.neighbors,
        );

        let mut scores = Array1::<f64>::zeros(matrix.ncols());
        for (other, sim) in neighbours {
            if sim > 0.0 {
                scores.scaled_add(sim, &matrix.row_dense(other));
            }
        }

        Ok(rank::positive_unrated(&scores, &matrix.row_dense(user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::matrix::prepare;
    use crate::interaction::Interaction;
    use ndarray::array;

    #[test]
    fn test_normalize_rows_zero_guard() {
        let m = array![[3.0, 4.0], [0.0, 0.0]];
        let n = normalize_rows(&m);
        assert!((n[[0, 0]] - 0.6).abs() < 1e-12);
        assert!((n[[0, 1]] - 0.8).abs() < 1e-12);
        assert_eq!(n.row(1).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_zero_row_similarity_is_finite() {
        let data = vec![
            Interaction::new(1, 1, 5.0),
            Interaction::new(2, 1, 0.0),
            Interaction::new(3, 2, 2.0),
        ];
        let prepared = prepare(&data, false).unwrap();
        let model = CosineModel::fit(
            &prepared.matrix,
            &EngineConfig::default(),
            &CapabilitySet::none(),
        )
        .unwrap();

        assert!(model.similarity().iter().all(|v| v.is_finite()));
        assert!(model.similarity().row(1).iter().all(|&v| v == 0.0));
        assert!((model.similarity()[[0, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_candidates_weighted_by_similarity() {
        let data = vec![
            Interaction::new(1, 1, 5.0),
            Interaction::new(1, 2, 1.0),
            Interaction::new(2, 1, 4.0),
            Interaction::new(2, 3, 5.0),
        ];
        let prepared = prepare(&data, true).unwrap();
        let model = CosineModel::fit(
            &prepared.matrix,
            &EngineConfig::default(),
            &CapabilitySet::none(),
        )
        .unwrap();

        let candidates = model.candidates(&prepared.matrix, 0).unwrap();
        assert_eq!(candidates.len(), 1);
        let (product, score) = candidates[0];
        assert_eq!(product, 2);
        // sim(u1, u2) = 20 / (sqrt(26) * sqrt(41)); weighted by u2's rating of 5
        let expected = 5.0 * 20.0 / (26.0_f64.sqrt() * 41.0_f64.sqrt());
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_negative_similarity_ignored() {
        let data = vec![
            Interaction::new(1, 1, 1.0),
            Interaction::new(2, 1, -1.0),
            Interaction::new(2, 2, 3.0),
        ];
        let prepared = prepare(&data, false).unwrap();
        let model = CosineModel::fit(
            &prepared.matrix,
            &EngineConfig::default(),
            &CapabilitySet::none(),
        )
        .unwrap();
        assert!(model.candidates(&prepared.matrix, 0).unwrap().is_empty());
    }
}
