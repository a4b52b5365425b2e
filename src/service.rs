// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval service facade.
//!
//! Composes the index manager and answer composer into the single operation
//! request handlers consume: ask a question for one school, get back an
//! answer plus the cited sections. Also exposes the operational surface
//! (warm, invalidate, status).

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::answer::{AnswerComposer, AnthropicModel, CompletionModel};
use crate::config::{Config, API_KEY_ENV};
use crate::embedding::build_provider;
use crate::errors::AskError;
use crate::index::{IndexManager, SearchHit, TenantStatus};
use crate::store::{SectionStore, SqliteSectionStore};

/// Answer plus cited sources, the shape handed to the request layer.
#[derive(Debug, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Citation entry for one ranked section.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub title: String,
    pub category: String,
    pub section_id: String,
    pub similarity: f32,
    pub excerpt: Option<String>,
}

impl From<SearchHit> for SourceRef {
    fn from(hit: SearchHit) -> Self {
        Self {
            title: hit.section.title,
            category: hit.section.category,
            section_id: hit.section.section_id,
            similarity: hit.score,
            excerpt: hit.section.excerpt,
        }
    }
}

/// Result of an explicit index build.
#[derive(Debug, Serialize)]
pub struct WarmReport {
    pub tenant: String,
    pub ready: bool,
    pub sections: usize,
    pub reason: Option<String>,
}

/// Facade over index management and answer composition.
pub struct RetrievalService {
    manager: IndexManager,
    composer: AnswerComposer,
    top_k: usize,
}

impl RetrievalService {
    pub fn new(manager: IndexManager, composer: AnswerComposer, top_k: usize) -> Self {
        Self {
            manager,
            composer,
            top_k: top_k.max(1),
        }
    }

    /// Wires the service from configuration: SQLite store, configured
    /// embedding provider, and the completion model when enabled and keyed.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = Arc::new(SqliteSectionStore::open(config.store().path())?);
        Self::with_store(config, store)
    }

    /// Same wiring with a caller-supplied store.
    pub fn with_store(config: &Config, store: Arc<dyn SectionStore>) -> anyhow::Result<Self> {
        let provider = build_provider(config.embeddings())?;
        let manager = IndexManager::new(store, provider);
        let model = build_completion_model(config)?;
        let composer = AnswerComposer::new(
            model,
            config.answers().max_tokens(),
            config.answers().temperature(),
        );
        Ok(Self::new(manager, composer, config.search().top_k()))
    }

    /// Answers a question against one school's handbook.
    ///
    /// Fails only for a blank tenant or corrupt stored state; every degraded
    /// dependency becomes a templated answer with whatever sources exist.
    pub fn ask(&self, question: &str, tenant_id: &str) -> Result<AskOutcome, AskError> {
        let hits = self.manager.search(tenant_id, question, self.top_k)?;
        let tenant_name = tenant_display_name(&hits, tenant_id.trim());
        let answer = self.composer.compose(question, &hits, tenant_name);
        debug!(
            tenant = %tenant_id.trim(),
            sources = hits.len(),
            "composed answer"
        );

        let sources = hits.into_iter().map(SourceRef::from).collect();
        Ok(AskOutcome { answer, sources })
    }

    /// Builds a school's index ahead of traffic.
    ///
    /// A build that cannot proceed (no data, degraded dependency) is reported
    /// in the result rather than erroring, so operators see the reason.
    pub fn warm(&self, tenant_id: &str) -> Result<WarmReport, AskError> {
        match self.manager.try_build(tenant_id) {
            Ok(sections) => Ok(WarmReport {
                tenant: tenant_id.trim().to_string(),
                ready: true,
                sections,
                reason: None,
            }),
            Err(AskError::Unavailable { tenant, reason }) => Ok(WarmReport {
                tenant,
                ready: false,
                sections: 0,
                reason: Some(reason),
            }),
            Err(err) => Err(err),
        }
    }

    /// Returns the school's index to `Unbuilt`.
    pub fn invalidate(&self, tenant_id: &str) -> Result<(), AskError> {
        self.manager.invalidate(tenant_id)
    }

    /// Reports the school's index lifecycle state.
    pub fn status(&self, tenant_id: &str) -> Result<TenantStatus, AskError> {
        self.manager.status(tenant_id)
    }

    /// Whether answers can use a completion model in this process.
    pub fn has_completion_model(&self) -> bool {
        self.composer.has_model()
    }
}

/// Display name for the tenant: the first result's school name, else the
/// tenant id itself (no result carries the name when the list is empty).
fn tenant_display_name<'a>(hits: &'a [SearchHit], tenant_id: &'a str) -> &'a str {
    hits.first()
        .map(|hit| hit.section.school_name.as_str())
        .unwrap_or(tenant_id)
}

fn build_completion_model(config: &Config) -> anyhow::Result<Option<Box<dyn CompletionModel>>> {
    if !config.answers().enabled() {
        return Ok(None);
    }

    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            debug!("{} not set; template answers only", API_KEY_ENV);
            return Ok(None);
        }
    };

    let model = AnthropicModel::new(
        api_key,
        config.answers().model(),
        Duration::from_secs(config.answers().timeout_secs()),
    )?;
    Ok(Some(Box::new(model)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SectionRecord;

    fn hit(title: &str, school_name: &str, score: f32) -> SearchHit {
        SearchHit {
            section: SectionRecord {
                section_id: "s1".into(),
                tenant_id: "demo_u".into(),
                title: title.into(),
                category: "Academic Policies".into(),
                content: "Plagiarism is prohibited.".into(),
                excerpt: Some("No plagiarism.".into()),
                handbook_title: "Student Handbook".into(),
                academic_year: "2024-2025".into(),
                school_name: school_name.into(),
            },
            score,
        }
    }

    #[test]
    fn test_tenant_display_name_prefers_first_hit() {
        let hits = vec![hit("A", "Demo University", 0.9), hit("B", "Other U", 0.1)];
        assert_eq!(tenant_display_name(&hits, "demo_u"), "Demo University");
    }

    #[test]
    fn test_tenant_display_name_falls_back_to_id() {
        assert_eq!(tenant_display_name(&[], "unknown_school"), "unknown_school");
    }

    #[test]
    fn test_source_ref_carries_wire_fields() {
        let source = SourceRef::from(hit("Academic Integrity Policy", "Demo University", 0.9));
        assert_eq!(source.title, "Academic Integrity Policy");
        assert_eq!(source.category, "Academic Policies");
        assert_eq!(source.section_id, "s1");
        assert!((source.similarity - 0.9).abs() < 1e-6);
        assert_eq!(source.excerpt.as_deref(), Some("No plagiarism."));
    }
}
