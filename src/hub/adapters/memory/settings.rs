//! In-memory endpoint settings store with live change notifications.

use crate::hub::{
    adapters::json::declarations_from_import,
    domain::{
        EndpointAddress, EndpointDeclaration, EndpointId, EndpointName, TransportKind,
        TransportParams,
    },
    ports::{
        EndpointSettingsError, EndpointSettingsResult, EndpointSettingsSource, SettingsChanges,
    },
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

/// Request payload for adding an endpoint declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEndpoint {
    /// Display name.
    pub name: EndpointName,
    /// Transport kind.
    pub transport: TransportKind,
    /// Whether the endpoint starts enabled.
    pub enabled: bool,
    /// Address for network transports.
    pub address: Option<EndpointAddress>,
    /// Opaque transport parameters.
    pub params: TransportParams,
}

impl NewEndpoint {
    /// Creates an enabled network-streaming endpoint request.
    #[must_use]
    pub fn sse(name: EndpointName, address: EndpointAddress) -> Self {
        Self {
            name,
            transport: TransportKind::Sse,
            enabled: true,
            address: Some(address),
            params: TransportParams::default(),
        }
    }

    /// Creates an enabled local-process endpoint request.
    #[must_use]
    pub const fn stdio(name: EndpointName, params: TransportParams) -> Self {
        Self {
            name,
            transport: TransportKind::Stdio,
            enabled: true,
            address: None,
            params,
        }
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Partial update applied to an existing declaration.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointUpdate {
    /// New display name.
    pub name: Option<EndpointName>,
    /// New enabled flag.
    pub enabled: Option<bool>,
    /// New transport kind.
    pub transport: Option<TransportKind>,
    /// New address; `Some(None)` clears it.
    pub address: Option<Option<EndpointAddress>>,
    /// New transport parameters.
    pub params: Option<TransportParams>,
}

impl EndpointUpdate {
    /// Creates an update that only renames the endpoint.
    #[must_use]
    pub fn rename(name: EndpointName) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    /// Creates an update that only changes the enabled flag.
    #[must_use]
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    fn apply_to(self, declaration: &mut EndpointDeclaration) {
        if let Some(name) = self.name {
            declaration.rename(name);
        }
        if let Some(enabled) = self.enabled {
            declaration.set_enabled(enabled);
        }
        if let Some(transport) = self.transport {
            declaration.set_transport(transport);
        }
        if let Some(address) = self.address {
            declaration.set_address(address);
        }
        if let Some(params) = self.params {
            declaration.set_params(params);
        }
    }
}

/// Thread-safe in-memory settings store.
///
/// Every mutation replaces the declaration sequence and emits exactly one
/// change notification to subscribers.
#[derive(Debug, Clone)]
pub struct InMemoryEndpointSettings {
    servers: Arc<RwLock<Vec<EndpointDeclaration>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for InMemoryEndpointSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEndpointSettings {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_servers(Vec::new())
    }

    /// Creates a store seeded with declarations.
    #[must_use]
    pub fn with_servers(servers: Vec<EndpointDeclaration>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            servers: Arc::new(RwLock::new(servers)),
            revision: Arc::new(revision),
        }
    }

    /// Returns a copy of the current declarations.
    ///
    /// # Errors
    ///
    /// Returns storage errors when lock acquisition fails.
    pub fn servers(&self) -> EndpointSettingsResult<Vec<EndpointDeclaration>> {
        let servers = self.servers.read().map_err(|err| {
            EndpointSettingsError::storage(std::io::Error::other(err.to_string()))
        })?;
        Ok(servers.clone())
    }

    /// Replaces every declaration.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointSettingsError::DuplicateEndpoint`] when two
    /// declarations share an identity, or storage errors when lock
    /// acquisition fails.
    pub fn replace_all(&self, servers: Vec<EndpointDeclaration>) -> EndpointSettingsResult<()> {
        if let Some(duplicate) = first_duplicate_id(&servers) {
            return Err(EndpointSettingsError::DuplicateEndpoint(duplicate));
        }
        self.mutate(|current| {
            *current = servers;
            Ok(())
        })
    }

    /// Adds an endpoint under a freshly generated identity.
    ///
    /// # Errors
    ///
    /// Returns storage errors when lock acquisition fails.
    pub fn add_endpoint(
        &self,
        request: NewEndpoint,
    ) -> EndpointSettingsResult<EndpointDeclaration> {
        let NewEndpoint {
            name,
            transport,
            enabled,
            address,
            params,
        } = request;
        let mut declaration = EndpointDeclaration::new(EndpointId::generate(), name, transport)
            .with_enabled(enabled)
            .with_params(params);
        declaration.set_address(address);

        let added = declaration.clone();
        self.mutate(move |current| {
            current.push(declaration);
            Ok(())
        })?;
        Ok(added)
    }

    /// Applies a partial update to an existing endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointSettingsError::NotFound`] when no endpoint has the
    /// identity, or storage errors when lock acquisition fails.
    pub fn update_endpoint(
        &self,
        id: &EndpointId,
        update: EndpointUpdate,
    ) -> EndpointSettingsResult<EndpointDeclaration> {
        self.mutate(|current| {
            let declaration = find_mut(current, id)?;
            update.apply_to(declaration);
            Ok(declaration.clone())
        })
    }

    /// Removes an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointSettingsError::NotFound`] when no endpoint has the
    /// identity, or storage errors when lock acquisition fails.
    pub fn remove_endpoint(&self, id: &EndpointId) -> EndpointSettingsResult<EndpointDeclaration> {
        self.mutate(|current| {
            let position = current
                .iter()
                .position(|declaration| declaration.id() == id)
                .ok_or_else(|| EndpointSettingsError::NotFound(id.clone()))?;
            Ok(current.remove(position))
        })
    }

    /// Flips the enabled flag and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointSettingsError::NotFound`] when no endpoint has the
    /// identity, or storage errors when lock acquisition fails.
    pub fn toggle_endpoint(&self, id: &EndpointId) -> EndpointSettingsResult<bool> {
        self.mutate(|current| {
            let declaration = find_mut(current, id)?;
            let enabled = !declaration.is_enabled();
            declaration.set_enabled(enabled);
            Ok(enabled)
        })
    }

    /// Appends the servers of an import map (see
    /// [`declarations_from_import`]) and returns the new declarations.
    ///
    /// # Errors
    ///
    /// Returns document or validation errors from the import, or storage
    /// errors when lock acquisition fails. Nothing is appended on error.
    pub fn import_servers(
        &self,
        servers: &Value,
    ) -> EndpointSettingsResult<Vec<EndpointDeclaration>> {
        let imported = declarations_from_import(servers)?;
        let appended = imported.clone();
        self.mutate(move |current| {
            current.extend(imported);
            Ok(())
        })?;
        Ok(appended)
    }

    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<EndpointDeclaration>) -> EndpointSettingsResult<T>,
    ) -> EndpointSettingsResult<T> {
        let outcome = {
            let mut servers = self.servers.write().map_err(|err| {
                EndpointSettingsError::storage(std::io::Error::other(err.to_string()))
            })?;
            change(&mut servers)?
        };
        self.revision.send_modify(|revision| *revision += 1);
        Ok(outcome)
    }
}

fn find_mut<'a>(
    servers: &'a mut [EndpointDeclaration],
    id: &EndpointId,
) -> EndpointSettingsResult<&'a mut EndpointDeclaration> {
    servers
        .iter_mut()
        .find(|declaration| declaration.id() == id)
        .ok_or_else(|| EndpointSettingsError::NotFound(id.clone()))
}

fn first_duplicate_id(servers: &[EndpointDeclaration]) -> Option<EndpointId> {
    let mut seen = std::collections::HashSet::new();
    servers
        .iter()
        .map(EndpointDeclaration::id)
        .find(|id| !seen.insert(*id))
        .cloned()
}

#[async_trait]
impl EndpointSettingsSource for InMemoryEndpointSettings {
    async fn load(&self) -> EndpointSettingsResult<Vec<EndpointDeclaration>> {
        self.servers()
    }

    fn subscribe(&self) -> SettingsChanges {
        SettingsChanges::new(self.revision.subscribe())
    }
}
