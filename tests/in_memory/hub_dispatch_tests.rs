//! In-memory integration tests for call-by-name dispatch.

use super::helpers::{HubContext, address, context, declaration, endpoint_id, eventually};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use toolhub::hub::{
    adapters::memory::RecordedInvocation,
    ports::TransportError,
    services::{DispatchError, ToolHubServiceError},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn call_reaches_the_named_endpoint_unchanged(context: HubContext) {
    context.hub.reconcile().await.expect("pass should succeed");
    context
        .connector
        .set_result(&address("beta"), "beta_search", json!({"hits": 3}))
        .expect("result should be set");
    let instance = *context
        .open_instances("beta")
        .first()
        .expect("beta should be open");

    let result = context
        .hub
        .call("Beta", "beta_search", json!({"query": "rust", "limit": 10}))
        .await
        .expect("call should succeed");

    assert_eq!(result, json!({"hits": 3}));
    assert_eq!(
        context
            .connector
            .invocations()
            .expect("connector state should be readable"),
        vec![RecordedInvocation {
            address: address("beta"),
            instance,
            operation: "beta_search".to_owned(),
            arguments: json!({"query": "rust", "limit": 10}),
        }]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn call_to_endpoint_that_failed_to_connect_is_not_connected(context: HubContext) {
    context
        .connector
        .fail_connect(&address("beta"), true)
        .expect("failure should be injected");
    context.hub.reconcile().await.expect("pass should succeed");

    let result = context.hub.call("Beta", "beta_search", json!({})).await;

    assert!(matches!(
        result,
        Err(ToolHubServiceError::Dispatch(DispatchError::NotConnected { endpoint_id: id, .. }))
            if id == endpoint_id("beta")
    ));
    assert!(
        context
            .connector
            .invocations()
            .expect("connector state should be readable")
            .is_empty()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn call_to_unknown_name_is_not_found(context: HubContext) {
    context.hub.reconcile().await.expect("pass should succeed");

    let result = context.hub.call("Gamma", "anything", json!({})).await;

    assert!(matches!(
        result,
        Err(ToolHubServiceError::Dispatch(DispatchError::EndpointNotFound(name))) if name == "Gamma"
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invocation_failure_is_surfaced_with_its_transport_error(context: HubContext) {
    context.hub.reconcile().await.expect("pass should succeed");
    context
        .connector
        .fail_invocation(&address("alpha"), "alpha_write", true)
        .expect("failure should be injected");

    let result = context
        .hub
        .call("Alpha", "alpha_write", json!({"x": 1}))
        .await;

    let Err(ToolHubServiceError::Dispatch(DispatchError::Invocation {
        endpoint_id: id,
        operation,
        source,
    })) = result
    else {
        panic!("expected an invocation failure");
    };
    assert_eq!(id, endpoint_id("alpha"));
    assert_eq!(operation, "alpha_write");
    assert!(matches!(source, TransportError::Invocation(_)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn call_after_shutdown_is_not_connected(context: HubContext) {
    context.hub.reconcile().await.expect("pass should succeed");
    context.hub.shutdown().await;

    let result = context.hub.call("Alpha", "alpha_read", json!({})).await;

    assert!(matches!(
        result,
        Err(ToolHubServiceError::Dispatch(DispatchError::NotConnected { .. }))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_display_name_routes_to_lowest_identity() {
    let context = HubContext::with_servers(vec![
        declaration("mirror-b", "Mirror"),
        declaration("mirror-a", "Mirror"),
    ]);
    context.hub.reconcile().await.expect("pass should succeed");

    context
        .hub
        .call("Mirror", "ping", json!({}))
        .await
        .expect("call should succeed");

    let invocations = context
        .connector
        .invocations()
        .expect("connector state should be readable");
    let addresses: Vec<_> = invocations
        .iter()
        .map(|invocation| invocation.address.clone())
        .collect();
    assert_eq!(addresses, vec![address("mirror-a")]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_call_does_not_hold_up_other_endpoints_during_a_pass(context: HubContext) {
    context.hub.reconcile().await.expect("pass should succeed");
    context
        .connector
        .set_invoke_delay(&address("alpha"), Duration::from_secs(2))
        .expect("delay should be set");

    let slow_hub = Arc::clone(&context.hub);
    let slow_call = tokio::spawn(async move {
        slow_hub.call("Alpha", "alpha_read", json!({})).await
    });
    eventually(async || {
        !context
            .connector
            .invocations()
            .expect("connector state should be readable")
            .is_empty()
    })
    .await;

    context
        .settings
        .remove_endpoint(&endpoint_id("alpha"))
        .expect("alpha should be removed");
    let pass_hub = Arc::clone(&context.hub);
    let pass = tokio::spawn(async move { pass_hub.reconcile().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fast_call = tokio::time::timeout(
        Duration::from_secs(1),
        context.hub.call("Beta", "beta_search", json!({})),
    )
    .await
    .expect("call to beta should not wait for alpha");
    assert!(fast_call.is_ok());

    slow_call
        .await
        .expect("slow call task should finish")
        .expect("slow call should complete on the open handle");
    pass.await
        .expect("pass task should finish")
        .expect("pass should succeed");
    assert_eq!(
        context
            .connector
            .close_count(&address("alpha"))
            .expect("connector state should be readable"),
        1
    );
    assert!(context.open_instances("alpha").is_empty());
}
