// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for askbook
//!
//! Loads configuration from .askbookrc.toml in the current directory or
//! ~/.config/askbook/config.toml. Every field is optional; getters supply
//! the defaults.

use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable holding the completion API key. Never read from the
/// config file.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Bundled fastembed model
    #[default]
    Builtin,
    /// External command speaking JSON over stdin/stdout
    Command,
    /// Deterministic hash-based vectors (tests, offline smoke runs)
    Dummy,
}

/// Section warehouse configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Get the database path (defaults to .askbook/handbook.sqlite)
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(".askbook").join("handbook.sqlite"))
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Provider type (builtin, command, dummy)
    pub provider: Option<EmbeddingProviderKind>,
    /// Model identifier for the embedding provider
    pub model: Option<String>,
    /// Command to execute for the command provider
    pub command: Option<String>,
    /// Batch size for corpus embedding
    pub batch_size: Option<usize>,
    /// Per-text character cap before embedding
    pub max_chars: Option<usize>,
    /// Whether to L2-normalize vectors at the provider
    pub normalize: Option<bool>,
}

impl EmbeddingsConfig {
    /// Get provider kind (defaults to Builtin)
    pub fn provider(&self) -> EmbeddingProviderKind {
        self.provider.unwrap_or_default()
    }

    /// Get model identifier (defaults to "all-minilm-l6-v2")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("all-minilm-l6-v2")
    }

    /// Get command for the command provider
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Get batch size (defaults to 64)
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(64)
    }

    /// Get max chars per text (defaults to 2000)
    pub fn max_chars(&self) -> usize {
        self.max_chars.unwrap_or(2000)
    }

    /// Get normalization flag (defaults to true)
    pub fn normalize(&self) -> bool {
        self.normalize.unwrap_or(true)
    }
}

/// Answer composition configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnswersConfig {
    /// Whether to use a completion model when a key is present
    pub enabled: Option<bool>,
    /// Completion model identifier
    pub model: Option<String>,
    /// Output token budget for one answer
    pub max_tokens: Option<usize>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Deadline for one completion call, in seconds
    pub timeout_secs: Option<u64>,
}

impl AnswersConfig {
    /// Get enabled flag (defaults to true)
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Get completion model (defaults to claude-3-7-sonnet-20250219)
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| "claude-3-7-sonnet-20250219".to_string())
    }

    /// Get max output tokens (defaults to 1000)
    pub fn max_tokens(&self) -> usize {
        self.max_tokens.unwrap_or(1000)
    }

    /// Get temperature (defaults to 0.3)
    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.3)
    }

    /// Get completion timeout in seconds (defaults to 60)
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(60)
    }
}

/// Search configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of sections returned per question
    pub top_k: Option<usize>,
}

impl SearchConfig {
    /// Get top-K (defaults to 3)
    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(3)
    }
}

/// Configuration loaded from .askbookrc.toml or ~/.config/askbook/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Warehouse configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Answer configuration
    #[serde(default)]
    pub answers: AnswersConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .askbookrc.toml in current directory
    /// 2. ~/.config/askbook/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(&PathBuf::from(".askbookrc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("askbook").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    fn load_from_path(path: &PathBuf) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the warehouse configuration
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingsConfig {
        &self.embeddings
    }

    /// Get the answer configuration
    pub fn answers(&self) -> &AnswersConfig {
        &self.answers
    }

    /// Get the search configuration
    pub fn search(&self) -> &SearchConfig {
        &self.search
    }
}
