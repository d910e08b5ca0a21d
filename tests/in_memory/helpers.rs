//! Shared fixtures for in-memory hub integration tests.

use mockable::DefaultClock;
use rstest::fixture;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use toolhub::hub::{
    adapters::memory::{InMemoryConnector, InMemoryEndpointSettings},
    domain::{EndpointAddress, EndpointDeclaration, EndpointId, EndpointName, OperationDescriptor},
    services::ToolHubService,
};

/// Hub wired to in-memory settings and transport.
pub type TestHub = ToolHubService<InMemoryEndpointSettings, InMemoryConnector, DefaultClock>;

/// Settings store, connector and the hub that uses both.
pub struct HubContext {
    pub settings: Arc<InMemoryEndpointSettings>,
    pub connector: Arc<InMemoryConnector>,
    pub hub: Arc<TestHub>,
}

impl HubContext {
    /// Creates a context seeded with `declarations`.
    pub fn with_servers(declarations: Vec<EndpointDeclaration>) -> Self {
        let settings = Arc::new(InMemoryEndpointSettings::with_servers(declarations));
        let connector = Arc::new(InMemoryConnector::new());
        let hub = Arc::new(ToolHubService::new(
            Arc::clone(&settings),
            Arc::clone(&connector),
            Arc::new(DefaultClock),
        ));
        Self {
            settings,
            connector,
            hub,
        }
    }

    /// Makes `endpoint` advertise `operations`.
    pub fn advertise(&self, endpoint: &str, operations: &[&str]) {
        self.connector
            .set_operations(
                &address(endpoint),
                operations.iter().map(|name| operation(name)).collect(),
            )
            .expect("catalog setup should succeed");
    }

    /// Returns the open handle instances for `endpoint`.
    pub fn open_instances(&self, endpoint: &str) -> Vec<u64> {
        self.connector
            .open_instances(&address(endpoint))
            .expect("connector state should be readable")
    }
}

/// Provides a context declaring two streaming endpoints, `alpha` and `beta`,
/// each advertising two operations.
#[fixture]
pub fn context() -> HubContext {
    let context = HubContext::with_servers(vec![
        declaration("alpha", "Alpha"),
        declaration("beta", "Beta"),
    ]);
    context.advertise("alpha", &["alpha_read", "alpha_write"]);
    context.advertise("beta", &["beta_search", "beta_fetch"]);
    context
}

/// Returns the identity used for `endpoint`.
pub fn endpoint_id(endpoint: &str) -> EndpointId {
    EndpointId::new(endpoint).expect("valid endpoint id")
}

/// Returns the display name `value`.
pub fn endpoint_name(value: &str) -> EndpointName {
    EndpointName::new(value).expect("valid endpoint name")
}

/// Returns the address used for `endpoint`.
pub fn address(endpoint: &str) -> EndpointAddress {
    EndpointAddress::new(format!("http://{endpoint}.tools.test/sse"))
        .expect("valid endpoint address")
}

/// Returns an enabled streaming declaration for `endpoint`.
pub fn declaration(endpoint: &str, name: &str) -> EndpointDeclaration {
    EndpointDeclaration::sse(
        endpoint_id(endpoint),
        endpoint_name(name),
        address(endpoint),
    )
}

/// Returns an operation accepting any object.
pub fn operation(name: &str) -> OperationDescriptor {
    OperationDescriptor::new(name, json!({"type": "object"}))
        .expect("valid operation")
        .with_description(format!("Runs {name}"))
}

/// Polls `condition` until it holds, failing after five seconds.
pub async fn eventually(mut condition: impl AsyncFnMut() -> bool) {
    let polling = async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), polling)
        .await
        .expect("condition should hold within five seconds");
}
