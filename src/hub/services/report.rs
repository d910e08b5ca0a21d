//! Outcome reports for reconciliation passes and catalog refreshes.

use crate::hub::{
    domain::{EndpointId, ToolCatalog},
    ports::TransportError,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Failure contained to a single endpoint during a pass or refresh.
///
/// These never abort the surrounding operation; they are collected and
/// reported alongside the partial result.
#[derive(Debug, Clone, Error)]
pub enum EndpointFailure {
    /// Connecting failed; no live connection was created.
    #[error("failed to connect endpoint {endpoint_id}: {source}")]
    Connect {
        /// Endpoint identity.
        endpoint_id: EndpointId,
        /// Transport failure.
        source: TransportError,
    },

    /// Closing failed; the connection record was removed regardless.
    #[error("failed to close endpoint {endpoint_id}: {source}")]
    Close {
        /// Endpoint identity.
        endpoint_id: EndpointId,
        /// Transport failure.
        source: TransportError,
    },

    /// Listing operations failed; the endpoint contributed no catalog
    /// entries.
    #[error("failed to list operations of endpoint {endpoint_id}: {source}")]
    CatalogList {
        /// Endpoint identity.
        endpoint_id: EndpointId,
        /// Transport failure.
        source: TransportError,
    },
}

impl EndpointFailure {
    /// Returns the identity of the endpoint that failed.
    #[must_use]
    pub const fn endpoint_id(&self) -> &EndpointId {
        match self {
            Self::Connect { endpoint_id, .. }
            | Self::Close { endpoint_id, .. }
            | Self::CatalogList { endpoint_id, .. } => endpoint_id,
        }
    }

    /// Returns the underlying transport failure.
    #[must_use]
    pub const fn transport_error(&self) -> &TransportError {
        match self {
            Self::Connect { source, .. }
            | Self::Close { source, .. }
            | Self::CatalogList { source, .. } => source,
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// Endpoints connected by this pass.
    pub connected: Vec<EndpointId>,
    /// Endpoints torn down by this pass.
    pub disconnected: Vec<EndpointId>,
    /// Endpoints that were already connected and left untouched.
    pub retained: Vec<EndpointId>,
    /// Per-endpoint connect, close and listing failures.
    pub failures: Vec<EndpointFailure>,
    /// Catalog published at the end of the pass.
    pub catalog: Arc<ToolCatalog>,
    /// When the pass finished.
    pub completed_at: DateTime<Utc>,
}

impl ReconcileReport {
    /// Returns whether the pass changed the connection set.
    #[must_use]
    pub const fn changed_connections(&self) -> bool {
        !self.connected.is_empty() || !self.disconnected.is_empty()
    }

    /// Returns whether every per-endpoint step succeeded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a catalog refresh.
#[derive(Debug, Clone)]
pub struct CatalogRefreshReport {
    /// Catalog published by the refresh.
    pub catalog: Arc<ToolCatalog>,
    /// Endpoints whose listing failed and which contributed no entries.
    pub failures: Vec<EndpointFailure>,
}
