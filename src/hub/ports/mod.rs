//! Port contracts for the configuration and transport boundaries.

mod settings;
mod transport;

pub use settings::{
    EndpointSettingsError, EndpointSettingsResult, EndpointSettingsSource, SettingsChanges,
};
pub use transport::{ConnectionHandle, EndpointConnector, TransportError, TransportResult};

#[cfg(test)]
pub use transport::{MockConnectionHandle, MockEndpointConnector};
