//! Endpoint connection reconciliation, tool catalog aggregation and call
//! dispatch.
//!
//! The hub keeps live connections to a configurable set of remote
//! tool-providing endpoints, merges the operations they advertise into one
//! catalog, and routes calls to the endpoint that owns them. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
