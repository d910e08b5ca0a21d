//! Resolution of call-by-name requests to live connections.

use super::connection::ConnectionMap;
use crate::hub::{
    domain::{EndpointDeclaration, EndpointId, EndpointName},
    ports::{ConnectionHandle, TransportError},
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors returned when a call cannot be routed or fails downstream.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No declaration carries the requested display name.
    #[error("no endpoint named '{0}' is declared")]
    EndpointNotFound(String),

    /// The endpoint is declared but has no live connection.
    #[error("endpoint '{name}' ({endpoint_id}) is not connected")]
    NotConnected {
        /// Resolved endpoint identity.
        endpoint_id: EndpointId,
        /// Requested display name.
        name: EndpointName,
    },

    /// The endpoint reported a failure for the invocation.
    #[error("operation '{operation}' failed on endpoint {endpoint_id}: {source}")]
    Invocation {
        /// Endpoint identity.
        endpoint_id: EndpointId,
        /// Operation that was invoked.
        operation: String,
        /// Transport failure, unchanged.
        source: TransportError,
    },
}

/// Finds the declaration a display name refers to.
///
/// Display names are not unique. When several declarations share the name,
/// the one with the lowest identity wins and a warning is logged. Every
/// declaration with the name takes part, including disabled and unmanaged
/// ones, so the chosen endpoint may be unconnected while another endpoint
/// with the same name is live.
///
/// # Errors
///
/// Returns [`DispatchError::EndpointNotFound`] when no declaration has the
/// name.
pub fn resolve_target<'a>(
    declarations: &'a [EndpointDeclaration],
    target: &str,
) -> DispatchResult<&'a EndpointDeclaration> {
    let candidates: Vec<_> = declarations
        .iter()
        .filter(|declaration| declaration.name().as_str() == target)
        .collect();

    let chosen = candidates
        .iter()
        .copied()
        .min_by(|left, right| left.id().cmp(right.id()))
        .ok_or_else(|| DispatchError::EndpointNotFound(target.to_owned()))?;

    if candidates.len() > 1 {
        tracing::warn!(
            name = target,
            candidates = candidates.len(),
            chosen = %chosen.id(),
            "display name is ambiguous, routing to lowest identity"
        );
    }
    Ok(chosen)
}

/// Forwards an invocation to the live connection of `declaration`.
///
/// The map is read only long enough to borrow the handle, so a slow call
/// never holds up reconciliation or calls to other endpoints. The borrowed
/// handle cannot be closed until the call returns.
pub(crate) async fn dispatch<H: ConnectionHandle>(
    connections: &RwLock<ConnectionMap<H>>,
    declaration: &EndpointDeclaration,
    operation: &str,
    arguments: Value,
) -> DispatchResult<Value> {
    let handle = {
        let live = connections.read().await;
        let connection = live
            .get(declaration.id())
            .ok_or_else(|| DispatchError::NotConnected {
                endpoint_id: declaration.id().clone(),
                name: declaration.name().clone(),
            })?;
        connection.acquire().await
    };

    tracing::debug!(
        endpoint = %declaration.id(),
        operation,
        "dispatching call"
    );
    handle
        .invoke(operation, arguments)
        .await
        .map_err(|source| DispatchError::Invocation {
            endpoint_id: declaration.id().clone(),
            operation: operation.to_owned(),
            source,
        })
}
