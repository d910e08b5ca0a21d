//! Service facade owning the live connection map and the published catalog.

use super::{
    catalog::build_catalog,
    connection::{ConnectionMap, ConnectionStatus, LiveConnection},
    dispatcher::{DispatchError, dispatch, resolve_target},
    reconciler::{Reconciler, close_all},
    report::{CatalogRefreshReport, EndpointFailure, ReconcileReport},
};
use crate::hub::{
    domain::{EndpointDeclaration, ToolCatalog},
    ports::{EndpointConnector, EndpointSettingsError, EndpointSettingsSource, SettingsChanges},
};
use futures::future::{self, Either};
use mockable::Clock;
use serde_json::Value;
use std::pin::pin;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::{
    sync::{Mutex, RwLock, oneshot, watch},
    task::JoinHandle,
};

/// Service-level errors for hub operations.
#[derive(Debug, Error)]
pub enum ToolHubServiceError {
    /// The desired endpoint set could not be read.
    #[error(transparent)]
    Settings(#[from] EndpointSettingsError),
    /// A call could not be routed or failed downstream.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type for hub service operations.
pub type ToolHubServiceResult<T> = Result<T, ToolHubServiceError>;

/// Background task re-running reconciliation on settings changes.
struct SettingsWatcher {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Keeps live connections converged with the declared endpoint set and
/// routes calls to them.
///
/// The service is an ordinary value: construct it, wrap it in an [`Arc`],
/// call [`ToolHubService::initialize`] to start following settings changes
/// and [`ToolHubService::shutdown`] to release every connection.
pub struct ToolHubService<S, T, C>
where
    S: EndpointSettingsSource + 'static,
    T: EndpointConnector + 'static,
    C: Clock + Send + Sync + 'static,
{
    settings: Arc<S>,
    reconciler: Reconciler<T, C>,
    connections: RwLock<ConnectionMap<T::Handle>>,
    catalog: watch::Sender<Arc<ToolCatalog>>,
    pass_lock: Mutex<()>,
    watcher: Mutex<Option<SettingsWatcher>>,
}

impl<S, T, C> ToolHubService<S, T, C>
where
    S: EndpointSettingsSource + 'static,
    T: EndpointConnector + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a hub with no live connections and an empty catalog.
    #[must_use]
    pub fn new(settings: Arc<S>, connector: Arc<T>, clock: Arc<C>) -> Self {
        let (catalog, _) = watch::channel(Arc::new(ToolCatalog::empty()));
        Self {
            settings,
            reconciler: Reconciler::new(connector, clock),
            connections: RwLock::new(ConnectionMap::new()),
            catalog,
            pass_lock: Mutex::new(()),
            watcher: Mutex::new(None),
        }
    }

    /// Runs the first reconciliation pass and starts following settings
    /// changes.
    ///
    /// Returns `None` without doing anything when the hub is already
    /// initialized. The subscription is taken before the first pass, so a
    /// change landing during that pass triggers a follow-up pass.
    ///
    /// # Errors
    ///
    /// Returns [`ToolHubServiceError::Settings`] when the settings cannot be
    /// loaded; the hub then stays uninitialized.
    pub async fn initialize(self: &Arc<Self>) -> ToolHubServiceResult<Option<ReconcileReport>> {
        let mut watcher = self.watcher.lock().await;
        if watcher.is_some() {
            tracing::debug!("hub already initialized");
            return Ok(None);
        }

        let changes = self.settings.subscribe();
        let report = self.reconcile().await?;
        *watcher = Some(Self::spawn_watcher(Arc::downgrade(self), changes));
        tracing::info!(
            connections = report.connected.len(),
            operations = report.catalog.len(),
            "hub initialized"
        );
        Ok(Some(report))
    }

    fn spawn_watcher(hub: Weak<Self>, mut changes: SettingsChanges) -> SettingsWatcher {
        let (stop, mut stopped) = oneshot::channel();
        let task = tokio::spawn(async move {
            loop {
                let source_open = {
                    let next_change = pin!(changes.changed());
                    match future::select(&mut stopped, next_change).await {
                        Either::Left(_) => break,
                        Either::Right((open, _)) => open,
                    }
                };
                if !source_open {
                    break;
                }
                let Some(service) = hub.upgrade() else {
                    break;
                };
                tracing::debug!(revision = changes.revision(), "settings changed");
                if let Err(error) = service.reconcile().await {
                    tracing::warn!(%error, "reconciliation after settings change failed");
                }
            }
            tracing::debug!("settings watcher stopped");
        });
        SettingsWatcher { stop, task }
    }

    /// Converges live connections to the declared set and rebuilds the
    /// catalog.
    ///
    /// Passes never overlap. Per-endpoint failures do not fail the pass;
    /// they are listed in the report.
    ///
    /// # Errors
    ///
    /// Returns [`ToolHubServiceError::Settings`] when the settings cannot be
    /// loaded. No connection is touched in that case.
    pub async fn reconcile(&self) -> ToolHubServiceResult<ReconcileReport> {
        let _pass = self.pass_lock.lock().await;
        let declarations = self.settings.load().await?;

        let outcome = self
            .reconciler
            .apply(&declarations, &self.connections)
            .await;
        let (catalog, listing_failures) = self.publish_catalog(&declarations).await;

        let mut failures = outcome.failures;
        failures.extend(listing_failures);
        tracing::info!(
            connected = outcome.connected.len(),
            disconnected = outcome.disconnected.len(),
            retained = outcome.retained.len(),
            failures = failures.len(),
            operations = catalog.len(),
            "reconciliation pass complete"
        );

        Ok(ReconcileReport {
            connected: outcome.connected,
            disconnected: outcome.disconnected,
            retained: outcome.retained,
            failures,
            catalog,
            completed_at: self.reconciler.clock().utc(),
        })
    }

    /// Rebuilds the catalog from the current live connections without
    /// connecting or disconnecting anything.
    ///
    /// # Errors
    ///
    /// Returns [`ToolHubServiceError::Settings`] when the settings cannot be
    /// loaded.
    pub async fn refresh_catalog(&self) -> ToolHubServiceResult<CatalogRefreshReport> {
        let _pass = self.pass_lock.lock().await;
        let declarations = self.settings.load().await?;
        let (catalog, failures) = self.publish_catalog(&declarations).await;
        tracing::info!(
            operations = catalog.len(),
            failures = failures.len(),
            "catalog refreshed"
        );
        Ok(CatalogRefreshReport { catalog, failures })
    }

    async fn publish_catalog(
        &self,
        declarations: &[EndpointDeclaration],
    ) -> (Arc<ToolCatalog>, Vec<EndpointFailure>) {
        let (built, failures) = {
            let live = self.connections.read().await;
            build_catalog(declarations, &live).await
        };
        let catalog = Arc::new(built);
        self.catalog.send_replace(Arc::clone(&catalog));
        (catalog, failures)
    }

    /// Returns the most recently published catalog.
    #[must_use]
    pub fn list_catalog(&self) -> Arc<ToolCatalog> {
        Arc::clone(&*self.catalog.borrow())
    }

    /// Subscribes to catalog replacements.
    #[must_use]
    pub fn subscribe_catalog(&self) -> watch::Receiver<Arc<ToolCatalog>> {
        self.catalog.subscribe()
    }

    /// Invokes `operation` on the endpoint whose display name is `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolHubServiceError::Settings`] when the settings cannot be
    /// loaded and [`ToolHubServiceError::Dispatch`] when the target is
    /// unknown, not connected, or the invocation fails.
    pub async fn call(
        &self,
        target: &str,
        operation: &str,
        arguments: Value,
    ) -> ToolHubServiceResult<Value> {
        let declarations = self.settings.load().await?;
        let declaration = resolve_target(&declarations, target)?;
        Ok(dispatch(&self.connections, declaration, operation, arguments).await?)
    }

    /// Returns a snapshot of the live connections ordered by identity.
    pub async fn connections(&self) -> Vec<ConnectionStatus> {
        self.connections
            .read()
            .await
            .values()
            .map(LiveConnection::status)
            .collect()
    }

    /// Stops following settings changes and closes every live connection.
    ///
    /// Waits for an in-flight pass to finish first. Calling this again is
    /// harmless, and the hub can be initialized afresh afterwards. Returns
    /// the close failures; the connections are dropped regardless.
    pub async fn shutdown(&self) -> Vec<EndpointFailure> {
        if let Some(SettingsWatcher { stop, task }) = self.watcher.lock().await.take() {
            drop(stop);
            if let Err(error) = task.await {
                tracing::warn!(%error, "settings watcher ended abnormally");
            }
        }

        let _pass = self.pass_lock.lock().await;
        let drained: Vec<_> = std::mem::take(&mut *self.connections.write().await)
            .into_values()
            .collect();
        let (disconnected, failures) = close_all(drained).await;
        self.catalog.send_replace(Arc::new(ToolCatalog::empty()));
        tracing::info!(
            disconnected = disconnected.len(),
            failures = failures.len(),
            "hub shut down"
        );
        failures
    }
}

impl<S, T, C> Drop for ToolHubService<S, T, C>
where
    S: EndpointSettingsSource + 'static,
    T: EndpointConnector + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().take() {
            watcher.task.abort();
        }
    }
}
