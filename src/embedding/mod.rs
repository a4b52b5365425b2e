// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - turns section text and questions into dense vectors.
//!
//! Providers implement one trait so the index layer never cares whether
//! vectors come from the bundled fastembed model, an external command, or the
//! deterministic offline provider used in tests.

pub mod provider;

pub use provider::{
    CommandProvider, DummyProvider, EmbeddingProvider, EmbeddingSettings, FastEmbedder,
    DEFAULT_EMBEDDING_DIM,
};

use anyhow::{bail, Result};

use crate::config::{EmbeddingProviderKind, EmbeddingsConfig};

/// Constructs the embedding provider selected by configuration.
pub fn build_provider(config: &EmbeddingsConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider() {
        EmbeddingProviderKind::Builtin => {
            let settings = EmbeddingSettings {
                model: provider::parse_model(config.model())?,
                batch_size: config.batch_size(),
                max_chars: config.max_chars(),
                normalize: config.normalize(),
            };
            Ok(Box::new(FastEmbedder::new(settings)?))
        }
        EmbeddingProviderKind::Command => {
            let Some(command) = config.command() else {
                bail!("embeddings.provider = \"command\" requires embeddings.command");
            };
            Ok(Box::new(CommandProvider::new(
                command.to_string(),
                config.model().to_string(),
            )))
        }
        EmbeddingProviderKind::Dummy => Ok(Box::new(DummyProvider::new(DEFAULT_EMBEDDING_DIM))),
    }
}
