//! Live connection records owned by the hub.

use crate::hub::{
    domain::{EndpointId, EndpointName},
    ports::{ConnectionHandle, TransportResult},
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};

/// Live connections keyed by endpoint identity.
pub(crate) type ConnectionMap<H> = BTreeMap<EndpointId, LiveConnection<H>>;

/// Established link to one endpoint.
///
/// The handle sits behind its own lock. Calls and listings hold a shared
/// guard on it; closing takes the exclusive guard, so a handle is never
/// closed while a call is still using it. Whoever removes the record from
/// the map is responsible for closing the handle.
#[derive(Debug)]
pub(crate) struct LiveConnection<H> {
    endpoint_id: EndpointId,
    endpoint_name: EndpointName,
    handle: Arc<RwLock<H>>,
    connected_at: DateTime<Utc>,
}

impl<H> LiveConnection<H> {
    pub(crate) fn new(
        endpoint_id: EndpointId,
        endpoint_name: EndpointName,
        handle: H,
        connected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint_id,
            endpoint_name,
            handle: Arc::new(RwLock::new(handle)),
            connected_at,
        }
    }

    pub(crate) const fn endpoint_id(&self) -> &EndpointId {
        &self.endpoint_id
    }

    pub(crate) const fn endpoint_name(&self) -> &EndpointName {
        &self.endpoint_name
    }

    /// Borrows the handle for use after the map guard is released.
    ///
    /// Only records still present in the map are acquired, and closing starts
    /// after removal, so this never waits behind a close.
    pub(crate) async fn acquire(&self) -> OwnedRwLockReadGuard<H> {
        Arc::clone(&self.handle).read_owned().await
    }

    /// Updates the label after a rename; the handle is untouched.
    pub(crate) fn relabel(&mut self, name: &EndpointName) {
        if self.endpoint_name != *name {
            self.endpoint_name = name.clone();
        }
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            endpoint_id: self.endpoint_id.clone(),
            endpoint_name: self.endpoint_name.clone(),
            connected_at: self.connected_at,
        }
    }
}

impl<H: ConnectionHandle> LiveConnection<H> {
    /// Closes the handle once every in-flight call on it has finished.
    pub(crate) async fn close(self) -> TransportResult<()> {
        let handle = self.handle.write().await;
        handle.close().await
    }
}

/// Snapshot of one live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Endpoint identity.
    pub endpoint_id: EndpointId,
    /// Display name as last reconciled.
    pub endpoint_name: EndpointName,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
}
