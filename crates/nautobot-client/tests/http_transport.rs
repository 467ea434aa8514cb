//! HTTP transport tests against a mock Nautobot API.

use std::time::Duration;

use assert_json_diff::assert_json_eq;
use nautobot_client::{ClientConfig, NautobotClient};
use nautobot_reconcile::{
    DesiredState, Filter, ReconcileError, Reconciler, ResourceSpec, Transport, TransportError,
};
use serde_json::{Value, json};
use wiremock::matchers::{
    body_json, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "0123456789abcdef";

fn client(server: &MockServer) -> NautobotClient {
    NautobotClient::new(&ClientConfig::new(server.uri(), TOKEN)).unwrap()
}

fn filter(value: Value) -> Filter {
    value.as_object().cloned().unwrap()
}

fn page(results: Value, next: Option<String>) -> Value {
    let count = results.as_array().map_or(0, Vec::len);
    json!({"count": count, "next": next, "previous": null, "results": results})
}

#[tokio::test]
async fn query_sends_token_and_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ipam/route-targets/"))
        .and(header("Authorization", format!("Token {TOKEN}").as_str()))
        .and(query_param("name", "65000:65001"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "rt-1", "name": "65000:65001", "tenant": null}]),
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let objects = client(&server)
        .query("ipam/route-targets", &filter(json!({"name": "65000:65001"})))
        .await
        .unwrap();

    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].id, "rt-1");
    assert_eq!(objects[0].get("name"), Some(&json!("65000:65001")));
}

#[tokio::test]
async fn query_follows_next_links() {
    let server = MockServer::start().await;
    let next = format!("{}/api/extras/tags/?limit=1&offset=1", server.uri());
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .and(query_param("offset", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(json!([{"id": "tag-2", "name": "b"}]), None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .and(query_param_is_missing("offset"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(json!([{"id": "tag-1", "name": "a"}]), Some(next))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri(), TOKEN).with_page_size(1);
    let objects = NautobotClient::new(&config)
        .unwrap()
        .query("extras/tags", &Filter::new())
        .await
        .unwrap();

    let ids: Vec<&str> = objects.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["tag-1", "tag-2"]);
}

#[tokio::test]
async fn list_filter_values_repeat_the_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .and(query_param("name", "a"))
        .and(query_param("name", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), None)))
        .expect(1)
        .mount(&server)
        .await;

    let objects = client(&server)
        .query("extras/tags", &filter(json!({"name": ["a", "b"]})))
        .await
        .unwrap();
    assert!(objects.is_empty());
}

#[tokio::test]
async fn create_update_delete_use_rest_verbs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ipam/route-targets/"))
        .and(body_json(json!({"name": "65000:65001", "tags": ["tag-1"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "rt-1",
            "name": "65000:65001",
            "tags": [{"id": "tag-1", "name": "Schnozzberry"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/ipam/route-targets/rt-1/"))
        .and(body_json(json!({"description": "management"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "rt-1",
            "name": "65000:65001",
            "description": "management"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/ipam/route-targets/rt-1/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let created = client
        .create(
            "ipam/route-targets",
            &filter(json!({"name": "65000:65001", "tags": ["tag-1"]})),
        )
        .await
        .unwrap();
    assert_eq!(created.id, "rt-1");

    let updated = client
        .update(
            "ipam/route-targets",
            "rt-1",
            &filter(json!({"description": "management"})),
        )
        .await
        .unwrap();
    assert_json_eq!(
        updated.to_value(),
        json!({"id": "rt-1", "name": "65000:65001", "description": "management"})
    );

    client.delete("ipam/route-targets", "rt-1").await.unwrap();
}

#[tokio::test]
async fn bad_request_maps_to_validation_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ipam/route-targets/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "name": ["Route target with this Name already exists."]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create("ipam/route-targets", &filter(json!({"name": "65000:65001"})))
        .await
        .unwrap_err();

    match err {
        TransportError::Validation { status, errors } => {
            assert_eq!(status, 400);
            assert_eq!(
                errors["name"],
                vec!["Route target with this Name already exists."]
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn status_codes_map_to_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tenancy/tenants/"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"detail": "Invalid token"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/ipam/route-targets/missing/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ipam/vrfs/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .query("tenancy/tenants", &Filter::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransportError::Unauthorized { status: 403, ref message } if message == "Invalid token"
    ));

    let err = client
        .delete("ipam/route-targets", "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::NotFound { ref id, .. } if id == "missing"));

    let err = client.query("ipam/vrfs", &Filter::new()).await.unwrap_err();
    assert!(matches!(err, TransportError::Remote { status: 502, .. }));

    let err = client.query("extras/tags", &Filter::new()).await.unwrap_err();
    assert!(matches!(err, TransportError::Decode { .. }));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ipam/route-targets/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(json!([]), None))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri(), TOKEN).with_timeout(Duration::from_millis(100));
    let err = NautobotClient::new(&config)
        .unwrap()
        .query("ipam/route-targets", &Filter::new())
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}

#[tokio::test]
async fn next_link_to_another_host_is_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "tag-1", "name": "a"}]),
            Some("http://collector.invalid/api/extras/tags/?offset=1".to_string()),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .query("extras/tags", &Filter::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode { .. }));
}

#[tokio::test]
async fn repeating_next_link_stops_pagination() {
    let server = MockServer::start().await;
    let next = format!("{}/api/extras/tags/?limit=1&offset=1", server.uri());
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .and(query_param("offset", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(json!([{"id": "tag-2", "name": "b"}]), Some(next.clone()))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .and(query_param_is_missing("offset"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(json!([{"id": "tag-1", "name": "a"}]), Some(next))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let objects = client(&server)
        .query("extras/tags", &Filter::new())
        .await
        .unwrap();

    assert_eq!(objects.len(), 2);
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = NautobotClient::new(&ClientConfig::new(format!("http://127.0.0.1:{port}"), TOKEN))
        .unwrap()
        .query("ipam/route-targets", &Filter::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Connection { .. }));
}

#[tokio::test]
async fn reconciles_route_target_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tenancy/tenants/"))
        .and(query_param("name", "Test Tenant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "t-1", "name": "Test Tenant"}]),
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ipam/route-targets/"))
        .and(query_param("name", "65000:65001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ipam/route-targets/"))
        .and(body_json(json!({"name": "65000:65001", "tenant": "t-1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "rt-1",
            "name": "65000:65001",
            "tenant": {"id": "t-1", "name": "Test Tenant"},
            "tags": [],
            "custom_fields": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let spec = ResourceSpec::route_target();
    let desired = DesiredState::present(
        &spec,
        filter(json!({"name": "65000:65001", "tenant": "Test Tenant"})),
    )
    .unwrap();

    let outcome = Reconciler::new(&client, &spec)
        .reconcile(&desired)
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_json_eq!(
        outcome.object.unwrap(),
        json!({
            "id": "rt-1",
            "name": "65000:65001",
            "tenant": "t-1",
            "tags": [],
            "custom_fields": {}
        })
    );
}

#[tokio::test]
async fn remote_rejection_becomes_validation_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ipam/route-targets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), None)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ipam/route-targets/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "name": ["Ensure this field has no more than 21 characters."]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let spec = ResourceSpec::route_target();
    let desired =
        DesiredState::present(&spec, filter(json!({"name": "65000:65001:too-long-name"}))).unwrap();

    let err = Reconciler::new(&client, &spec)
        .reconcile(&desired)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::ValidationRejected { field: Some(ref field), .. } if field == "name"
    ));
}
