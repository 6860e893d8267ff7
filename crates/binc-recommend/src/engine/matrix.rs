//! Identifier mappings and the user×product interaction matrix
//!
//! The matrix is CSR when the `sparse` capability is present and a dense
//! `Array2` otherwise. Both forms read 0 where no interaction exists and
//! neither stores explicit zeros, so every backend sees the same data.

use std::collections::{BTreeMap, HashMap};

use ndarray::{Array1, Array2};

use crate::error::{RecommendError, Result};
use crate::interaction::Interaction;

/// Bijection between external identifiers and dense indices
///
/// Indices follow first appearance in the training batch.
#[derive(Debug, Clone, Default)]
pub struct IdMapping {
    ids: Vec<i64>,
    index: HashMap<i64, usize>,
}

impl IdMapping {
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut mapping = Self::default();
        for id in ids {
            mapping.insert(id);
        }
        mapping
    }

    /// Index of `id`, assigning the next free one if unseen
    pub fn insert(&mut self, id: i64) -> usize {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id);
        self.index.insert(id, idx);
        idx
    }

    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn id_at(&self, idx: usize) -> Option<i64> {
        self.ids.get(idx).copied()
    }

    /// Identifiers in index order
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Compressed sparse row matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// Build from (row, col, value) triplets. A repeated cell keeps the last
    /// value given; zero values are not stored.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Self {
        let mut cells: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for (r, c, v) in triplets {
            cells.insert((r, c), v);
        }

        let mut indptr = vec![0usize; nrows + 1];
        let mut indices = Vec::with_capacity(cells.len());
        let mut data = Vec::with_capacity(cells.len());
        for ((r, c), v) in cells {
            if v == 0.0 {
                continue;
            }
            indptr[r + 1] += 1;
            indices.push(c);
            data.push(v);
        }
        for r in 0..nrows {
            indptr[r + 1] += indptr[r];
        }

        Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Stored (column, value) pairs of a row, in column order
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = (self.indptr[r], self.indptr[r + 1]);
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.data[start..end].iter().copied())
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        let (start, end) = (self.indptr[r], self.indptr[r + 1]);
        match self.indices[start..end].binary_search(&c) {
            Ok(pos) => self.data[start + pos],
            Err(_) => 0.0,
        }
    }

    pub fn transpose(&self) -> CsrMatrix {
        let triplets = (0..self.nrows).flat_map(|r| self.row(r).map(move |(c, v)| (c, r, v)));
        CsrMatrix::from_triplets(self.ncols, self.nrows, triplets)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.nrows, self.ncols));
        for r in 0..self.nrows {
            for (c, v) in self.row(r) {
                dense[[r, c]] = v;
            }
        }
        dense
    }
}

/// User×product interaction matrix
#[derive(Debug, Clone)]
pub enum InteractionMatrix {
    Sparse(CsrMatrix),
    Dense(Array2<f64>),
}

impl InteractionMatrix {
    pub fn nrows(&self) -> usize {
        match self {
            InteractionMatrix::Sparse(m) => m.nrows(),
            InteractionMatrix::Dense(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            InteractionMatrix::Sparse(m) => m.ncols(),
            InteractionMatrix::Dense(m) => m.ncols(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, InteractionMatrix::Sparse(_))
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        match self {
            InteractionMatrix::Sparse(m) => m.get(r, c),
            InteractionMatrix::Dense(m) => m[[r, c]],
        }
    }

    /// Non-zero (column, value) pairs of a row
    pub fn row_entries(&self, r: usize) -> Vec<(usize, f64)> {
        match self {
            InteractionMatrix::Sparse(m) => m.row(r).collect(),
            InteractionMatrix::Dense(m) => m
                .row(r)
                .iter()
                .enumerate()
                .filter(|(_, &v)| v != 0.0)
                .map(|(c, &v)| (c, v))
                .collect(),
        }
    }

    /// A full row as a dense vector
    pub fn row_dense(&self, r: usize) -> Array1<f64> {
        match self {
            InteractionMatrix::Sparse(m) => {
                let mut row = Array1::zeros(m.ncols());
                for (c, v) in m.row(r) {
                    row[c] = v;
                }
                row
            }
            InteractionMatrix::Dense(m) => m.row(r).to_owned(),
        }
    }

    /// Non-zero entries grouped by row
    pub fn by_rows(&self) -> Vec<Vec<(usize, f64)>> {
        (0..self.nrows()).map(|r| self.row_entries(r)).collect()
    }

    /// Non-zero entries grouped by column (rows of the transpose)
    pub fn by_columns(&self) -> Vec<Vec<(usize, f64)>> {
        match self {
            InteractionMatrix::Sparse(m) => {
                let t = m.transpose();
                (0..t.nrows()).map(|r| t.row(r).collect()).collect()
            }
            InteractionMatrix::Dense(m) => m
                .columns()
                .into_iter()
                .map(|col| {
                    col.iter()
                        .enumerate()
                        .filter(|(_, &v)| v != 0.0)
                        .map(|(r, &v)| (r, v))
                        .collect()
                })
                .collect(),
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            InteractionMatrix::Sparse(m) => m.to_dense(),
            InteractionMatrix::Dense(m) => m.clone(),
        }
    }
}

/// Mappings plus matrix built from one training batch
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub users: IdMapping,
    pub products: IdMapping,
    pub matrix: InteractionMatrix,
}

/// Build mappings and the interaction matrix.
///
/// Fails on an empty batch or a non-finite score. For a repeated
/// (user, product) pair the last interaction wins.
pub fn prepare(interactions: &[Interaction], sparse: bool) -> Result<PreparedData> {
    if interactions.is_empty() {
        return Err(RecommendError::EmptyBatch);
    }
    if let Some(index) = interactions.iter().position(|i| !i.score.is_finite()) {
        return Err(RecommendError::InvalidScore { index });
    }

    let mut users = IdMapping::default();
    let mut products = IdMapping::default();
    let cells: Vec<(usize, usize, f64)> = interactions
        .iter()
        .map(|i| (users.insert(i.user_id), products.insert(i.product_id), i.score))
        .collect();

    let (n_users, n_products) = (users.len(), products.len());
    let matrix = if sparse {
        InteractionMatrix::Sparse(CsrMatrix::from_triplets(n_users, n_products, cells))
    } else {
        let mut dense = Array2::zeros((n_users, n_products));
        for (u, p, v) in cells {
            dense[[u, p]] = v;
        }
        InteractionMatrix::Dense(dense)
    };

    tracing::info!(
        "Created user-item matrix: {} users x {} products ({})",
        n_users,
        n_products,
        if sparse { "sparse" } else { "dense" }
    );

    Ok(PreparedData {
        users,
        products,
        matrix,
    })
}
