// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cosine similarity scoring and top-K ranking.
//!
//! Pure numeric functions with no state: a query vector is scored against a
//! row-major embedding matrix, then the K best rows are selected with a
//! deterministic tie-break (first corpus row wins).

use anyhow::{bail, Result};
use rayon::prelude::*;

/// Row-major matrix of embeddings, one row per corpus entry.
///
/// All rows share one width, enforced at construction. Row order is the
/// corpus order and is load-bearing for tie-breaking.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    data: Vec<f32>,
    width: usize,
    rows: usize,
}

impl EmbeddingMatrix {
    /// Builds a matrix from provider output, enforcing uniform row width.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self {
                data: Vec::new(),
                width: 0,
                rows: 0,
            });
        };

        let width = first.len();
        if width == 0 {
            bail!("embedding rows must not be empty");
        }

        let mut data = Vec::with_capacity(width * rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                bail!(
                    "embedding row {} has width {} (expected {})",
                    i,
                    row.len(),
                    width
                );
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            data,
            width,
            rows: rows.len(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Returns row `i` as a slice. Panics if out of range.
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.width;
        &self.data[start..start + self.width]
    }
}

/// Computes cosine similarity between two vectors.
///
/// Degenerate inputs (length mismatch, empty, zero-norm) score 0.0 rather
/// than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Normalizes a vector to unit L2 length in place. Zero vectors stay zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

/// Scores a query against every matrix row, preserving row order.
pub fn score_rows(query: &[f32], corpus: &EmbeddingMatrix) -> Vec<f32> {
    if corpus.is_empty() {
        return Vec::new();
    }

    (0..corpus.row_count())
        .into_par_iter()
        .map(|i| cosine_similarity(query, corpus.row(i)))
        .collect()
}

/// Selects the indices of the K highest scores, descending.
///
/// Ties keep corpus order (lower index first), so repeated calls over the
/// same scores rank identically.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(k);
    ranked
}
