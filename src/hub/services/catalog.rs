//! Aggregation of per-endpoint operation listings into one catalog.

use super::{
    connection::{ConnectionMap, LiveConnection},
    report::EndpointFailure,
};
use crate::hub::{
    domain::{CatalogEntry, EndpointDeclaration, EndpointName, ToolCatalog},
    ports::ConnectionHandle,
};
use futures::future::join_all;
use std::collections::HashSet;

/// Lists operations on every live connection and merges them.
///
/// Listings run concurrently. An endpoint whose listing fails contributes
/// no entries and is reported as a [`EndpointFailure::CatalogList`].
pub(crate) async fn build_catalog<H: ConnectionHandle>(
    declarations: &[EndpointDeclaration],
    connections: &ConnectionMap<H>,
) -> (ToolCatalog, Vec<EndpointFailure>) {
    let listings = catalog_order(declarations, connections)
        .into_iter()
        .map(|(connection, name)| async move {
            let outcome = connection.acquire().await.list_operations().await;
            (connection, name, outcome)
        });

    let mut entries = Vec::new();
    let mut failures = Vec::new();
    for (connection, name, outcome) in join_all(listings).await {
        match outcome {
            Ok(operations) => {
                tracing::debug!(
                    endpoint = %connection.endpoint_id(),
                    operations = operations.len(),
                    "listed endpoint operations"
                );
                entries.extend(operations.into_iter().map(|operation| {
                    CatalogEntry::new(connection.endpoint_id().clone(), name.clone(), operation)
                }));
            }
            Err(source) => {
                tracing::warn!(
                    endpoint = %connection.endpoint_id(),
                    error = %source,
                    "failed to list endpoint operations"
                );
                failures.push(EndpointFailure::CatalogList {
                    endpoint_id: connection.endpoint_id().clone(),
                    source,
                });
            }
        }
    }

    (ToolCatalog::new(entries), failures)
}

/// Orders live connections by declaration order, then orphans by identity.
///
/// Each connection is paired with the label its entries carry: the current
/// declaration's name, or the name recorded at connect time for orphans.
fn catalog_order<'a, H>(
    declarations: &'a [EndpointDeclaration],
    connections: &'a ConnectionMap<H>,
) -> Vec<(&'a LiveConnection<H>, &'a EndpointName)> {
    let mut visited = HashSet::with_capacity(connections.len());
    let mut ordered = Vec::with_capacity(connections.len());

    for declaration in declarations {
        if let Some(connection) = connections.get(declaration.id())
            && visited.insert(declaration.id())
        {
            ordered.push((connection, declaration.name()));
        }
    }

    ordered.extend(
        connections
            .iter()
            .filter(|(id, _)| !visited.contains(id))
            .map(|(_, connection)| (connection, connection.endpoint_name())),
    );
    ordered
}
