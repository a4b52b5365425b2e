// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the retrieval core.
//!
//! The split mirrors the propagation policy: [`AskError`] is what callers of
//! the service see (user-correctable input vs. internal fault), while
//! [`IndexError`] and [`CompletionError`] stay inside the pipeline and are
//! absorbed into degraded-but-successful responses.

use thiserror::Error;

/// Errors surfaced to callers of the retrieval service.
#[derive(Debug, Error)]
pub enum AskError {
    /// No tenant supplied. User-correctable: prompt for a school, don't crash.
    #[error("no school specified")]
    MissingTenant,

    /// The tenant's index could not be built right now (no data, or a
    /// degraded dependency). The ask path absorbs this into an empty result
    /// list; the explicit build path surfaces it so operators see why.
    #[error("index not available for school '{tenant}': {reason}")]
    Unavailable { tenant: String, reason: String },

    /// Malformed stored state or another unexpected internal fault.
    ///
    /// Distinct from the degraded paths on purpose: answering from corrupted
    /// state is worse than reporting failure.
    #[error("internal failure during {operation} for school '{tenant}'")]
    Internal {
        tenant: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised while building or querying a tenant index.
///
/// All variants except [`IndexError::Corrupt`] are absorbed by the manager
/// into an empty result list; `Corrupt` escalates to [`AskError::Internal`].
#[derive(Debug, Error)]
pub enum IndexError {
    /// Tenant exists but has zero indexable sections (or is unknown).
    #[error("no indexable handbook content for school '{tenant}'")]
    NoData { tenant: String },

    /// The section warehouse could not be queried.
    #[error("section store query failed")]
    Store(#[source] anyhow::Error),

    /// The embedding provider failed or is unreachable.
    #[error("embedding failed")]
    Embedding(#[source] anyhow::Error),

    /// Stored index state is inconsistent (row/record count or dimension
    /// mismatch). Never served from.
    #[error("corrupt index state for school '{tenant}': {detail}")]
    Corrupt { tenant: String, detail: String },
}

impl IndexError {
    /// True for failures a later request may succeed past.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, IndexError::Corrupt { .. })
    }
}

/// Errors from the external completion model adapter.
///
/// The answer composer catches every variant and falls back to the
/// deterministic template; none of these reach the end user.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport-level failure, including timeouts.
    #[error("completion request failed")]
    Http(#[source] anyhow::Error),

    /// The API answered with a non-success status.
    #[error("completion API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not contain usable text.
    #[error("completion response had no text content")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(IndexError::NoData {
            tenant: "demo_u".into()
        }
        .is_retryable());
        assert!(IndexError::Embedding(anyhow::anyhow!("model offline")).is_retryable());
        assert!(!IndexError::Corrupt {
            tenant: "demo_u".into(),
            detail: "row count mismatch".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_display_names_tenant() {
        let err = AskError::Internal {
            tenant: "demo_u".into(),
            operation: "search",
            source: anyhow::anyhow!("boom"),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("demo_u"));
        assert!(rendered.contains("search"));
    }
}
