//! Endpoint declaration: the desired state of one remote endpoint.

use super::{EndpointAddress, EndpointId, EndpointName, TransportKind, TransportParams};
use serde::{Deserialize, Serialize};

/// Declared endpoint as recorded by the configuration store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDeclaration {
    id: EndpointId,
    name: EndpointName,
    enabled: bool,
    transport: TransportKind,
    address: Option<EndpointAddress>,
    params: TransportParams,
}

impl EndpointDeclaration {
    /// Creates an enabled declaration without an address or parameters.
    #[must_use]
    pub fn new(id: EndpointId, name: EndpointName, transport: TransportKind) -> Self {
        Self {
            id,
            name,
            enabled: true,
            transport,
            address: None,
            params: TransportParams::default(),
        }
    }

    /// Creates an enabled network-streaming declaration.
    #[must_use]
    pub fn sse(id: EndpointId, name: EndpointName, address: EndpointAddress) -> Self {
        Self::new(id, name, TransportKind::Sse).with_address(address)
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the endpoint address.
    #[must_use]
    pub fn with_address(mut self, address: EndpointAddress) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets transport-specific parameters.
    #[must_use]
    pub fn with_params(mut self, params: TransportParams) -> Self {
        self.params = params;
        self
    }

    /// Returns the endpoint identity.
    #[must_use]
    pub const fn id(&self) -> &EndpointId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &EndpointName {
        &self.name
    }

    /// Returns whether the endpoint is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the transport kind.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Returns the optional address.
    #[must_use]
    pub const fn address(&self) -> Option<&EndpointAddress> {
        self.address.as_ref()
    }

    /// Returns the transport parameters.
    #[must_use]
    pub const fn params(&self) -> &TransportParams {
        &self.params
    }

    /// Returns the address to connect to when this declaration should hold a
    /// live connection.
    ///
    /// That is the case only for enabled declarations of a managed transport
    /// kind that carry an address.
    #[must_use]
    pub const fn connect_target(&self) -> Option<&EndpointAddress> {
        if self.enabled && self.transport.is_managed() {
            return self.address.as_ref();
        }
        None
    }

    /// Replaces the display name. The identity is unaffected.
    pub fn rename(&mut self, name: EndpointName) {
        self.name = name;
    }

    /// Sets the enabled flag in place.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Replaces the transport kind.
    pub const fn set_transport(&mut self, transport: TransportKind) {
        self.transport = transport;
    }

    /// Replaces or clears the address.
    pub fn set_address(&mut self, address: Option<EndpointAddress>) {
        self.address = address;
    }

    /// Replaces the transport parameters.
    pub fn set_params(&mut self, params: TransportParams) {
        self.params = params;
    }
}
