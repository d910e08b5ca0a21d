//! In-memory adapters for the settings and transport ports.

mod settings;
mod transport;

pub use settings::{EndpointUpdate, InMemoryEndpointSettings, NewEndpoint};
pub use transport::{InMemoryConnection, InMemoryConnector, RecordedInvocation};
