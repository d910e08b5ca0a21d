//! In-memory integration tests for reconciliation passes.

use super::helpers::{HubContext, address, context, declaration, endpoint_id, endpoint_name};
use rstest::rstest;
use std::time::Duration;
use toolhub::hub::{
    adapters::memory::{EndpointUpdate, NewEndpoint},
    domain::{EndpointDeclaration, TransportKind, TransportParams},
    services::EndpointFailure,
};

fn operation_names(context: &HubContext) -> Vec<(String, String)> {
    context
        .hub
        .list_catalog()
        .entries()
        .iter()
        .map(|entry| {
            (
                entry.endpoint_name().as_str().to_owned(),
                entry.name().to_owned(),
            )
        })
        .collect()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_pass_connects_every_desired_endpoint(context: HubContext) {
    let report = context.hub.reconcile().await.expect("pass should succeed");

    assert_eq!(
        report.connected,
        vec![endpoint_id("alpha"), endpoint_id("beta")]
    );
    assert!(report.is_clean());
    assert_eq!(
        operation_names(&context),
        vec![
            ("Alpha".to_owned(), "alpha_read".to_owned()),
            ("Alpha".to_owned(), "alpha_write".to_owned()),
            ("Beta".to_owned(), "beta_search".to_owned()),
            ("Beta".to_owned(), "beta_fetch".to_owned()),
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unchanged_settings_cause_no_transport_activity(context: HubContext) {
    let first = context
        .hub
        .reconcile()
        .await
        .expect("first pass should succeed");
    let instances = context.open_instances("alpha");

    let second = context
        .hub
        .reconcile()
        .await
        .expect("second pass should succeed");

    assert!(!second.changed_connections());
    assert_eq!(second.retained, first.connected);
    assert_eq!(context.open_instances("alpha"), instances);
    assert_eq!(
        context
            .connector
            .connect_count(&address("alpha"))
            .expect("connector state should be readable"),
        1
    );
    assert_eq!(first.catalog, second.catalog);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replacing_one_endpoint_leaves_the_other_untouched(context: HubContext) {
    context.advertise("gamma", &["gamma_run"]);
    context
        .hub
        .reconcile()
        .await
        .expect("first pass should succeed");
    let alpha_before = context.open_instances("alpha");

    context
        .settings
        .replace_all(vec![
            declaration("alpha", "Alpha"),
            declaration("gamma", "Gamma"),
        ])
        .expect("settings should be replaced");
    let report = context
        .hub
        .reconcile()
        .await
        .expect("second pass should succeed");

    assert_eq!(report.connected, vec![endpoint_id("gamma")]);
    assert_eq!(report.disconnected, vec![endpoint_id("beta")]);
    assert_eq!(report.retained, vec![endpoint_id("alpha")]);
    assert_eq!(context.open_instances("alpha"), alpha_before);
    assert!(context.open_instances("beta").is_empty());
    assert_eq!(
        context
            .connector
            .close_count(&address("beta"))
            .expect("connector state should be readable"),
        1
    );
    let catalog = context.hub.list_catalog();
    assert_eq!(catalog.for_endpoint("Beta").count(), 0);
    assert!(catalog.find("Gamma", "gamma_run").is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn renaming_relabels_without_reconnecting(context: HubContext) {
    context
        .hub
        .reconcile()
        .await
        .expect("first pass should succeed");
    let instances = context.open_instances("alpha");

    context
        .settings
        .update_endpoint(
            &endpoint_id("alpha"),
            EndpointUpdate::rename(endpoint_name("Primary")),
        )
        .expect("endpoint should be renamed");
    let report = context
        .hub
        .reconcile()
        .await
        .expect("second pass should succeed");

    assert!(!report.changed_connections());
    assert_eq!(context.open_instances("alpha"), instances);
    let catalog = context.hub.list_catalog();
    assert_eq!(catalog.for_endpoint("Primary").count(), 2);
    assert_eq!(catalog.for_endpoint("Alpha").count(), 0);
    let statuses = context.hub.connections().await;
    let alpha = statuses
        .iter()
        .find(|status| status.endpoint_id == endpoint_id("alpha"))
        .expect("alpha should stay connected");
    assert_eq!(alpha.endpoint_name, endpoint_name("Primary"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disabling_an_endpoint_tears_it_down(context: HubContext) {
    context
        .hub
        .reconcile()
        .await
        .expect("first pass should succeed");

    let enabled = context
        .settings
        .toggle_endpoint(&endpoint_id("beta"))
        .expect("endpoint should toggle");
    let report = context
        .hub
        .reconcile()
        .await
        .expect("second pass should succeed");

    assert!(!enabled);
    assert_eq!(report.disconnected, vec![endpoint_id("beta")]);
    assert!(context.open_instances("beta").is_empty());
    assert!(
        context
            .hub
            .list_catalog()
            .for_endpoint("Beta")
            .next()
            .is_none()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unmanaged_and_unaddressed_declarations_are_ignored(context: HubContext) {
    context
        .settings
        .add_endpoint(NewEndpoint::stdio(
            endpoint_name("Local"),
            TransportParams::new().with_command("local-tools"),
        ))
        .expect("stdio endpoint should be added");
    context
        .settings
        .add_endpoint(NewEndpoint {
            name: endpoint_name("Pending"),
            transport: TransportKind::Sse,
            enabled: true,
            address: None,
            params: TransportParams::new(),
        })
        .expect("unaddressed endpoint should be added");

    let report = context.hub.reconcile().await.expect("pass should succeed");

    assert_eq!(report.connected.len(), 2);
    assert!(report.is_clean());
    assert_eq!(
        context
            .connector
            .open_count()
            .expect("connector state should be readable"),
        2
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connect_failure_is_isolated_and_retried_on_next_pass(context: HubContext) {
    context
        .connector
        .fail_connect(&address("beta"), true)
        .expect("failure should be injected");

    let failed = context.hub.reconcile().await.expect("pass should succeed");

    assert_eq!(failed.connected, vec![endpoint_id("alpha")]);
    assert!(matches!(
        failed.failures.as_slice(),
        [EndpointFailure::Connect { endpoint_id, .. }] if endpoint_id.as_str() == "beta"
    ));
    assert_eq!(context.hub.list_catalog().len(), 2);

    context
        .connector
        .fail_connect(&address("beta"), false)
        .expect("failure should be cleared");
    let recovered = context.hub.reconcile().await.expect("pass should succeed");

    assert_eq!(recovered.connected, vec![endpoint_id("beta")]);
    assert_eq!(context.hub.list_catalog().len(), 4);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_failure_yields_partial_catalog(context: HubContext) {
    context
        .connector
        .fail_listing(&address("alpha"), true)
        .expect("failure should be injected");

    let report = context.hub.reconcile().await.expect("pass should succeed");

    assert_eq!(report.connected.len(), 2);
    assert!(matches!(
        report.failures.as_slice(),
        [EndpointFailure::CatalogList { endpoint_id, .. }] if endpoint_id.as_str() == "alpha"
    ));
    assert_eq!(
        operation_names(&context),
        vec![
            ("Beta".to_owned(), "beta_search".to_owned()),
            ("Beta".to_owned(), "beta_fetch".to_owned()),
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn close_failure_does_not_keep_the_connection(context: HubContext) {
    context
        .hub
        .reconcile()
        .await
        .expect("first pass should succeed");
    context
        .connector
        .fail_close(&address("beta"), true)
        .expect("failure should be injected");

    context
        .settings
        .remove_endpoint(&endpoint_id("beta"))
        .expect("endpoint should be removed");
    let report = context
        .hub
        .reconcile()
        .await
        .expect("second pass should succeed");

    assert_eq!(report.disconnected, vec![endpoint_id("beta")]);
    assert!(matches!(
        report.failures.as_slice(),
        [EndpointFailure::Close { .. }]
    ));
    assert_eq!(context.hub.connections().await.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_passes_never_double_connect(context: HubContext) {
    context
        .connector
        .set_connect_delay(Duration::from_millis(50))
        .expect("delay should be set");

    let (first, second) = tokio::join!(context.hub.reconcile(), context.hub.reconcile());
    let first_report = first.expect("first pass should succeed");
    let second_report = second.expect("second pass should succeed");

    assert_eq!(
        first_report.connected.len() + second_report.connected.len(),
        2
    );
    assert_eq!(
        context
            .connector
            .open_count()
            .expect("connector state should be readable"),
        2
    );
    assert_eq!(context.hub.connections().await.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_settings_produce_empty_catalog() {
    let context = HubContext::with_servers(Vec::<EndpointDeclaration>::new());

    let report = context.hub.reconcile().await.expect("pass should succeed");

    assert!(report.connected.is_empty());
    assert!(report.catalog.is_empty());
    assert!(context.hub.list_catalog().is_empty());
}
