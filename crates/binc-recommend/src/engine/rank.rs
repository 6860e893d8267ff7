//! Ordering helpers shared by the backends
//!
//! Products: descending score, then ascending external product id.
//! Neighbours: best first, then ascending user index.

use std::cmp::Ordering;

use ndarray::Array1;

use super::matrix::IdMapping;
use crate::interaction::Recommendation;

/// Turn (product index, score) candidates into at most `n` recommendations
pub(crate) fn top_n(
    candidates: Vec<(usize, f64)>,
    products: &IdMapping,
    n: usize,
) -> Vec<Recommendation> {
    let mut ranked: Vec<(i64, f64)> = candidates
        .into_iter()
        .filter(|(_, score)| score.is_finite())
        .filter_map(|(idx, score)| products.id_at(idx).map(|id| (id, score)))
        .collect();

    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked.truncate(n);

    ranked
        .into_iter()
        .map(|(id, score)| Recommendation::collaborative(id, score))
        .collect()
}

/// Candidates from an accumulated score vector: products the user has rated
/// (`rated > 0`) are dropped, as are non-positive scores
pub(crate) fn positive_unrated(scores: &Array1<f64>, rated: &Array1<f64>) -> Vec<(usize, f64)> {
    scores
        .iter()
        .zip(rated.iter())
        .enumerate()
        .filter(|(_, (&score, &rating))| rating <= 0.0 && score > 0.0)
        .map(|(idx, (&score, _))| (idx, score))
        .collect()
}

/// The `k` highest-valued entries other than `exclude`
pub(crate) fn most_similar(
    values: impl Iterator<Item = (usize, f64)>,
    exclude: usize,
    k: usize,
) -> Vec<(usize, f64)> {
    select(values, exclude, k, |a, b| b.partial_cmp(a))
}

/// The `k` lowest-valued entries other than `exclude`
pub(crate) fn nearest(
    values: impl Iterator<Item = (usize, f64)>,
    exclude: usize,
    k: usize,
) -> Vec<(usize, f64)> {
    select(values, exclude, k, |a, b| a.partial_cmp(b))
}

fn select(
    values: impl Iterator<Item = (usize, f64)>,
    exclude: usize,
    k: usize,
    cmp: impl Fn(&f64, &f64) -> Option<Ordering>,
) -> Vec<(usize, f64)> {
    let mut picked: Vec<(usize, f64)> = values
        .filter(|(idx, value)| *idx != exclude && value.is_finite())
        .collect();
    picked.sort_by(|a, b| cmp(&a.1, &b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
    picked.truncate(k);
    picked
}
