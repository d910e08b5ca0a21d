//! Domain model for endpoint declarations and the tool catalog.
//!
//! Endpoint declarations describe desired state; the catalog is derived
//! from whatever the live connections advertise. Transport and storage
//! concerns remain outside this boundary.

mod catalog;
mod endpoint;
mod error;
mod ids;
mod transport;

pub use catalog::{CatalogEntry, OperationDescriptor, ToolCatalog};
pub use endpoint::EndpointDeclaration;
pub use error::{HubDomainError, ParseTransportKindError};
pub use ids::{EndpointId, EndpointName};
pub use transport::{EndpointAddress, TransportKind, TransportParams};
