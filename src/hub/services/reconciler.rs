//! Reconciliation of live connections against declared endpoints.

use super::{
    connection::{ConnectionMap, LiveConnection},
    report::EndpointFailure,
};
use crate::hub::{
    domain::{EndpointAddress, EndpointDeclaration, EndpointId, EndpointName, TransportParams},
    ports::{ConnectionHandle, EndpointConnector},
};
use futures::future::join_all;
use mockable::Clock;
use std::collections::{BTreeSet, HashSet, btree_map::Entry};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Connect action for a desired endpoint that has no live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Endpoint identity.
    pub endpoint_id: EndpointId,
    /// Display name at planning time.
    pub endpoint_name: EndpointName,
    /// Address to connect to.
    pub address: EndpointAddress,
    /// Opaque transport parameters.
    pub params: TransportParams,
}

/// Minimal set of actions that converges the live set to the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Live identities that are no longer desired, ordered by identity.
    pub stale: Vec<EndpointId>,
    /// Desired endpoints without a live connection, in declaration order.
    pub missing: Vec<ConnectRequest>,
    /// Desired endpoints that are already live, in declaration order.
    pub retained: Vec<EndpointId>,
}

impl ReconciliationPlan {
    /// Diffs the declarations against the identities currently live.
    ///
    /// An endpoint is desired when it is enabled, uses the managed transport
    /// kind and has an address. When several declarations share an identity
    /// only the first one counts.
    #[must_use]
    pub fn compute<'a>(
        declarations: &[EndpointDeclaration],
        live: impl IntoIterator<Item = &'a EndpointId>,
    ) -> Self {
        let live_ids: BTreeSet<&EndpointId> = live.into_iter().collect();
        let mut desired = HashSet::new();
        let mut plan = Self::default();

        for declaration in declarations {
            let Some(address) = declaration.connect_target() else {
                continue;
            };
            if !desired.insert(declaration.id()) {
                continue;
            }

            if live_ids.contains(declaration.id()) {
                plan.retained.push(declaration.id().clone());
            } else {
                plan.missing.push(ConnectRequest {
                    endpoint_id: declaration.id().clone(),
                    endpoint_name: declaration.name().clone(),
                    address: address.clone(),
                    params: declaration.params().clone(),
                });
            }
        }

        plan.stale = live_ids
            .into_iter()
            .filter(|id| !desired.contains(id))
            .cloned()
            .collect();
        plan
    }

    /// Returns whether the plan has nothing to connect or disconnect.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.stale.is_empty() && self.missing.is_empty()
    }
}

/// What one application of a plan did.
#[derive(Debug, Default)]
pub(crate) struct PassOutcome {
    pub(crate) connected: Vec<EndpointId>,
    pub(crate) disconnected: Vec<EndpointId>,
    pub(crate) retained: Vec<EndpointId>,
    pub(crate) failures: Vec<EndpointFailure>,
}

/// Applies reconciliation plans to the live connection map.
pub(crate) struct Reconciler<T, C> {
    connector: Arc<T>,
    clock: Arc<C>,
}

impl<T, C> Reconciler<T, C>
where
    T: EndpointConnector,
    C: Clock + Send + Sync,
{
    pub(crate) const fn new(connector: Arc<T>, clock: Arc<C>) -> Self {
        Self { connector, clock }
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    /// Runs one pass. The caller guarantees that no other pass runs
    /// concurrently.
    ///
    /// The write lock is held only while records are removed or inserted;
    /// connects and closes run unlocked and concurrently.
    pub(crate) async fn apply(
        &self,
        declarations: &[EndpointDeclaration],
        connections: &RwLock<ConnectionMap<T::Handle>>,
    ) -> PassOutcome {
        let (plan, removed) = {
            let mut live = connections.write().await;
            let plan = ReconciliationPlan::compute(declarations, live.keys());
            let removed: Vec<_> = plan
                .stale
                .iter()
                .filter_map(|id| live.remove(id))
                .collect();
            let mut relabelled = HashSet::new();
            for declaration in declarations {
                if declaration.connect_target().is_some()
                    && relabelled.insert(declaration.id())
                    && let Some(connection) = live.get_mut(declaration.id())
                {
                    connection.relabel(declaration.name());
                }
            }
            (plan, removed)
        };

        tracing::debug!(
            stale = plan.stale.len(),
            missing = plan.missing.len(),
            retained = plan.retained.len(),
            "reconciliation plan computed"
        );

        let ReconciliationPlan {
            missing, retained, ..
        } = plan;
        let ((disconnected, mut failures), (established, connect_failures)) =
            tokio::join!(close_all(removed), self.connect_all(missing));
        failures.extend(connect_failures);

        let mut connected = Vec::with_capacity(established.len());
        let mut redundant = Vec::new();
        {
            let mut live = connections.write().await;
            for connection in established {
                match live.entry(connection.endpoint_id().clone()) {
                    Entry::Vacant(slot) => {
                        connected.push(connection.endpoint_id().clone());
                        slot.insert(connection);
                    }
                    Entry::Occupied(_) => redundant.push(connection),
                }
            }
        }
        if !redundant.is_empty() {
            let (_, close_failures) = close_all(redundant).await;
            failures.extend(close_failures);
        }

        PassOutcome {
            connected,
            disconnected,
            retained,
            failures,
        }
    }

    async fn connect_all(
        &self,
        requests: Vec<ConnectRequest>,
    ) -> (Vec<LiveConnection<T::Handle>>, Vec<EndpointFailure>) {
        let attempts = requests.into_iter().map(|request| async move {
            tracing::info!(
                endpoint = %request.endpoint_id,
                name = %request.endpoint_name,
                address = %request.address,
                "connecting endpoint"
            );
            let outcome = self
                .connector
                .connect(&request.address, &request.params)
                .await;
            (request, outcome)
        });

        let mut connected = Vec::new();
        let mut failures = Vec::new();
        for (request, outcome) in join_all(attempts).await {
            match outcome {
                Ok(handle) => {
                    tracing::info!(
                        endpoint = %request.endpoint_id,
                        name = %request.endpoint_name,
                        "connected endpoint"
                    );
                    connected.push(LiveConnection::new(
                        request.endpoint_id,
                        request.endpoint_name,
                        handle,
                        self.clock.utc(),
                    ));
                }
                Err(source) => {
                    tracing::warn!(
                        endpoint = %request.endpoint_id,
                        name = %request.endpoint_name,
                        error = %source,
                        "failed to connect endpoint"
                    );
                    failures.push(EndpointFailure::Connect {
                        endpoint_id: request.endpoint_id,
                        source,
                    });
                }
            }
        }
        (connected, failures)
    }
}

/// Closes connections that have already been removed from the map.
///
/// Returns the identities torn down (all of them: a failed close still
/// abandons the handle) and the close failures.
pub(crate) async fn close_all<H: ConnectionHandle>(
    connections: Vec<LiveConnection<H>>,
) -> (Vec<EndpointId>, Vec<EndpointFailure>) {
    let closes = connections.into_iter().map(|connection| async move {
        let endpoint_id = connection.endpoint_id().clone();
        (endpoint_id, connection.close().await)
    });

    let mut disconnected = Vec::new();
    let mut failures = Vec::new();
    for (endpoint_id, outcome) in join_all(closes).await {
        match outcome {
            Ok(()) => tracing::info!(endpoint = %endpoint_id, "disconnected endpoint"),
            Err(source) => {
                tracing::warn!(
                    endpoint = %endpoint_id,
                    error = %source,
                    "failed to close endpoint, dropping it anyway"
                );
                failures.push(EndpointFailure::Close {
                    endpoint_id: endpoint_id.clone(),
                    source,
                });
            }
        }
        disconnected.push(endpoint_id);
    }
    (disconnected, failures)
}
