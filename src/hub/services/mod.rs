//! Application services for reconciliation, catalog aggregation and
//! dispatch.

mod catalog;
mod connection;
mod dispatcher;
mod hub;
mod reconciler;
mod report;

pub use connection::ConnectionStatus;
pub use dispatcher::{DispatchError, DispatchResult, resolve_target};
pub use hub::{ToolHubService, ToolHubServiceError, ToolHubServiceResult};
pub use reconciler::{ConnectRequest, ReconciliationPlan};
pub use report::{CatalogRefreshReport, EndpointFailure, ReconcileReport};
