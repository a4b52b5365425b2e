// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-tenant index lifecycle: lazy builds, single-flight per tenant, and
//! search with the absorb-or-propagate error policy.
//!
//! Per tenant the state machine is `Unbuilt -> Building -> Ready`. A build
//! failure returns the tenant to `Unbuilt` and the triggering search call
//! degrades to an empty result list; only corrupt stored state escalates to
//! the caller.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::embedding::EmbeddingProvider;
use crate::errors::{AskError, IndexError};
use crate::index::{searchable_text, SearchHit, TenantIndex, TenantStatus};
use crate::similarity::{score_rows, top_k, EmbeddingMatrix};
use crate::store::SectionStore;

/// One tenant's lifecycle slot.
///
/// `build_lock` serializes builds and invalidation for this tenant only;
/// `index` swaps atomically between `None` (Unbuilt) and a shared `Ready`
/// index; `building` exists so `status` can observe an in-flight build
/// without touching the build lock.
#[derive(Default)]
struct TenantSlot {
    build_lock: Mutex<()>,
    index: RwLock<Option<Arc<TenantIndex>>>,
    building: AtomicBool,
}

/// Owns every tenant index and decides when to (re)build.
///
/// Constructed explicitly with its collaborators so tests can substitute
/// fakes; no ambient singletons.
pub struct IndexManager {
    store: Arc<dyn SectionStore>,
    provider: Mutex<Box<dyn EmbeddingProvider>>,
    tenants: RwLock<HashMap<String, Arc<TenantSlot>>>,
}

impl IndexManager {
    pub fn new(store: Arc<dyn SectionStore>, provider: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            provider: Mutex::new(provider),
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Searches a tenant's handbook for the sections closest to `question`.
    ///
    /// Builds the tenant index on first use. Degraded dependencies (no data,
    /// store or embedding failure) yield `Ok` with an empty list and the
    /// tenant stays `Unbuilt` for a later retry; a blank tenant fails with
    /// [`AskError::MissingTenant`] before any external call; corrupt stored
    /// state fails with [`AskError::Internal`].
    pub fn search(
        &self,
        tenant_id: &str,
        question: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, AskError> {
        let tenant = validate_tenant(tenant_id)?;
        let slot = self.slot(tenant);

        let index = match self.obtain_index(&slot, tenant) {
            Ok(index) => index,
            Err(err) if err.is_retryable() => {
                warn!(tenant = %tenant, error = %err, "index unavailable; returning no sections");
                return Ok(Vec::new());
            }
            Err(err) => {
                error!(tenant = %tenant, operation = "build", error = %err, "corrupt index state");
                return Err(AskError::Internal {
                    tenant: tenant.to_string(),
                    operation: "build",
                    source: anyhow::Error::new(err),
                });
            }
        };

        let query = match self.provider.lock().embed_one(question) {
            Ok(query) => query,
            Err(err) => {
                warn!(tenant = %tenant, error = %err, "question embedding failed; returning no sections");
                return Ok(Vec::new());
            }
        };

        if query.len() != index.matrix().width() {
            let err = IndexError::Corrupt {
                tenant: tenant.to_string(),
                detail: format!(
                    "query width {} does not match index width {}",
                    query.len(),
                    index.matrix().width()
                ),
            };
            error!(tenant = %tenant, operation = "search", error = %err, "corrupt index state");
            return Err(AskError::Internal {
                tenant: tenant.to_string(),
                operation: "search",
                source: anyhow::Error::new(err),
            });
        }

        let scores = score_rows(&query, index.matrix());
        let hits = top_k(&scores, k)
            .into_iter()
            .map(|(i, score)| SearchHit {
                section: index.sections()[i].clone(),
                score,
            })
            .collect();

        Ok(hits)
    }

    /// Builds a tenant's index right away if it is not already `Ready`.
    ///
    /// Unlike [`search`](Self::search), build failures propagate so callers
    /// (the warm path) can report why. Returns the section count.
    pub fn try_build(&self, tenant_id: &str) -> Result<usize, AskError> {
        let tenant = validate_tenant(tenant_id)?;
        let slot = self.slot(tenant);
        match self.obtain_index(&slot, tenant) {
            Ok(index) => Ok(index.len()),
            Err(err) if err.is_retryable() => Err(AskError::Unavailable {
                tenant: tenant.to_string(),
                reason: err.to_string(),
            }),
            Err(err) => Err(AskError::Internal {
                tenant: tenant.to_string(),
                operation: "build",
                source: anyhow::Error::new(err),
            }),
        }
    }

    /// Returns the tenant to `Unbuilt`, waiting out any in-flight build.
    pub fn invalidate(&self, tenant_id: &str) -> Result<(), AskError> {
        let tenant = validate_tenant(tenant_id)?;
        if let Some(slot) = self.tenants.read().get(tenant).cloned() {
            let _guard = slot.build_lock.lock();
            *slot.index.write() = None;
            debug!(tenant = %tenant, "index invalidated");
        }
        Ok(())
    }

    /// Reports a tenant's lifecycle state without blocking on builds.
    pub fn status(&self, tenant_id: &str) -> Result<TenantStatus, AskError> {
        let tenant = validate_tenant(tenant_id)?;
        let Some(slot) = self.tenants.read().get(tenant).cloned() else {
            return Ok(TenantStatus::Unbuilt);
        };

        if slot.index.read().is_some() {
            return Ok(TenantStatus::Ready);
        }
        if slot.building.load(Ordering::SeqCst) {
            return Ok(TenantStatus::Building);
        }
        Ok(TenantStatus::Unbuilt)
    }

    fn slot(&self, tenant: &str) -> Arc<TenantSlot> {
        if let Some(slot) = self.tenants.read().get(tenant) {
            return slot.clone();
        }

        let mut map = self.tenants.write();
        map.entry(tenant.to_string())
            .or_insert_with(|| Arc::new(TenantSlot::default()))
            .clone()
    }

    /// Returns the tenant's `Ready` index, building it if necessary.
    ///
    /// Double-checked around the per-tenant build lock: callers arriving
    /// during a build wait here and then read the winner's index, so a cold
    /// tenant embeds its corpus exactly once.
    fn obtain_index(
        &self,
        slot: &TenantSlot,
        tenant: &str,
    ) -> Result<Arc<TenantIndex>, IndexError> {
        if let Some(index) = slot.index.read().clone() {
            return Ok(index);
        }

        let _guard = slot.build_lock.lock();
        if let Some(index) = slot.index.read().clone() {
            return Ok(index);
        }

        slot.building.store(true, Ordering::SeqCst);
        let result = self.build_index(tenant);
        slot.building.store(false, Ordering::SeqCst);

        let index = Arc::new(result?);
        *slot.index.write() = Some(index.clone());
        Ok(index)
    }

    fn build_index(&self, tenant: &str) -> Result<TenantIndex, IndexError> {
        let started = Instant::now();

        let records = self
            .store
            .fetch_sections(tenant)
            .map_err(IndexError::Store)?;
        if records.is_empty() {
            return Err(IndexError::NoData {
                tenant: tenant.to_string(),
            });
        }
        debug!(tenant = %tenant, sections = records.len(), "building tenant index");

        let texts: Vec<String> = records.iter().map(searchable_text).collect();
        let rows = self
            .provider
            .lock()
            .embed_texts(&texts)
            .map_err(IndexError::Embedding)?;

        let matrix = EmbeddingMatrix::from_rows(rows).map_err(IndexError::Embedding)?;
        let index = TenantIndex::new(records, matrix).map_err(IndexError::Embedding)?;

        debug!(
            tenant = %tenant,
            rows = index.len(),
            width = index.matrix().width(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tenant index ready"
        );
        Ok(index)
    }
}

fn validate_tenant(tenant_id: &str) -> Result<&str, AskError> {
    let tenant = tenant_id.trim();
    if tenant.is_empty() {
        return Err(AskError::MissingTenant);
    }
    Ok(tenant)
}
