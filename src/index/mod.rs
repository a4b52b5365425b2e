// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant index types and lifecycle management.
//!
//! A tenant index pairs section records with their embedding matrix, row `i`
//! of the matrix embedding record `i`'s searchable text. Indexes are built
//! lazily by [`manager::IndexManager`] and treated as immutable once built.

pub mod manager;

pub use manager::IndexManager;

use anyhow::{bail, Result};
use serde::Serialize;
use std::time::SystemTime;

use crate::similarity::EmbeddingMatrix;
use crate::store::SectionRecord;

/// Lifecycle state of one tenant's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Unbuilt,
    Building,
    Ready,
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantStatus::Unbuilt => write!(f, "unbuilt"),
            TenantStatus::Building => write!(f, "building"),
            TenantStatus::Ready => write!(f, "ready"),
        }
    }
}

/// The text a section is embedded under.
///
/// Fixed concatenation of title, content, and category; separators stay even
/// when a field is empty. Changing this invalidates every built index, so it
/// lives in exactly one place.
pub fn searchable_text(record: &SectionRecord) -> String {
    format!("{} {} {}", record.title, record.content, record.category)
}

/// A ranked section with its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub section: SectionRecord,
    /// Cosine similarity in [-1, 1]; [0, 1] in practice for text embeddings.
    pub score: f32,
}

/// Immutable searchable state for one tenant.
pub struct TenantIndex {
    sections: Vec<SectionRecord>,
    matrix: EmbeddingMatrix,
    built_at: SystemTime,
}

impl TenantIndex {
    /// Pairs records with their embeddings, enforcing the row alignment
    /// invariant.
    pub fn new(sections: Vec<SectionRecord>, matrix: EmbeddingMatrix) -> Result<Self> {
        if matrix.row_count() != sections.len() {
            bail!(
                "embedding rows ({}) do not match section count ({})",
                matrix.row_count(),
                sections.len()
            );
        }

        Ok(Self {
            sections,
            matrix,
            built_at: SystemTime::now(),
        })
    }

    pub fn sections(&self) -> &[SectionRecord] {
        &self.sections
    }

    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
