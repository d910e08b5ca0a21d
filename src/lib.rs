//! Toolhub: live connections to remote tool endpoints, a unified tool
//! catalog, and call routing by endpoint name.
//!
//! Consumers declare the endpoints they want in a settings source. The hub
//! converges its live connections to that declaration whenever it changes,
//! merges the operations every connected endpoint advertises into one
//! catalog, and forwards calls to the endpoint that owns them.
//!
//! # Architecture
//!
//! Toolhub follows hexagonal architecture principles:
//!
//! - **Domain**: Endpoint declarations, identities and the catalog model
//! - **Ports**: Settings source, connector and connection handle traits
//! - **Adapters**: In-memory and JSON file settings, in-memory transport
//! - **Services**: Reconciliation, catalog aggregation, dispatch and the
//!   [`hub::services::ToolHubService`] facade
//!
//! # Modules
//!
//! - [`hub`]: Endpoint reconciliation, catalog aggregation and call dispatch

pub mod hub;
