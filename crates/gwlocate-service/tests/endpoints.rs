//! HTTP-level tests against the fixture snapshot.

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::Value;

use gwlocate_service::{router, GeolocationResponse};
use gwlocate_service_shared::test_utils::{
    empty_state, fixture_clients, test_request_id, test_state,
};
use gwlocate_service_shared::MetricsConfig;

const FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn server() -> TestServer {
    TestServer::new(router(test_state(), &MetricsConfig::default())).unwrap()
}

#[tokio::test]
async fn json_ranks_nearest_gateway_first() {
    let response = server()
        .get("/json")
        .add_header(
            FORWARDED_FOR,
            HeaderValue::from_static(fixture_clients::SEATTLE),
        )
        .await;

    response.assert_status_ok();
    let body: GeolocationResponse = response.json();
    assert_eq!(body.ip, fixture_clients::SEATTLE);
    assert_eq!(body.cc, "US");
    assert_eq!(body.city, "Seattle");
    assert_eq!(body.lat, "47.606200");
    assert_eq!(body.lon, "-122.332100");
    assert_eq!(body.gateways[0], fixture_clients::SEATTLE_GATEWAY);
    // Six fixture gateways, one denylisted.
    assert_eq!(body.gateways.len(), 5);
    assert!(!body
        .gateways
        .iter()
        .any(|g| g == fixture_clients::DENYLISTED_GATEWAY));
}

#[tokio::test]
async fn json_groups_co_located_gateways() {
    let response = server()
        .get("/json")
        .add_header(
            FORWARDED_FOR,
            HeaderValue::from_static(fixture_clients::AMSTERDAM),
        )
        .await;

    response.assert_status_ok();
    let body: GeolocationResponse = response.json();
    let mut nearest: Vec<&str> = body.gateways[..2].iter().map(String::as_str).collect();
    nearest.sort_unstable();
    assert_eq!(nearest, ["ams-gw1.example.net", "ams-gw2.example.net"]);
}

#[tokio::test]
async fn json_uses_first_forwarded_entry() {
    let response = server()
        .get("/json")
        .add_header(
            FORWARDED_FOR,
            HeaderValue::from_static("192.0.2.55, 198.51.100.7"),
        )
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["ip"], fixture_clients::AMSTERDAM);
    assert_eq!(body["cc"], "NL");
}

#[tokio::test]
async fn json_country_only_record() {
    let response = server()
        .get("/json")
        .add_header(
            FORWARDED_FOR,
            HeaderValue::from_static(fixture_clients::COUNTRY_ONLY),
        )
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["cc"], "DE");
    assert_eq!(body["city"], "");
    assert_eq!(body["gateways"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn text_endpoint_renders_location() {
    let response = server()
        .get("/")
        .add_header(
            FORWARDED_FOR,
            HeaderValue::from_static(fixture_clients::SEATTLE),
        )
        .await;

    response.assert_status_ok();
    let content_type = response.header(header::CONTENT_TYPE);
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    assert_eq!(
        response.text(),
        "Your IP: 198.51.100.7\nYour Country: US\nYour City: Seattle\n\
         Your Coordinates: 47.606200, -122.332100\n"
    );
}

#[tokio::test]
async fn unknown_address_is_not_found() {
    let request_id = test_request_id();
    let response = server()
        .get("/json")
        .add_header(
            FORWARDED_FOR,
            HeaderValue::from_static(fixture_clients::UNKNOWN),
        )
        .add_header(REQUEST_ID, HeaderValue::from_str(&request_id).unwrap())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        "application/problem+json"
    );
    let body: Value = response.json();
    assert_eq!(body["type"], "/problems/address-not-found");
    assert_eq!(body["instance"], request_id.as_str());
}

#[tokio::test]
async fn malformed_forwarded_header_is_bad_request() {
    let response = server()
        .get("/")
        .add_header(FORWARDED_FOR, HeaderValue::from_static("not-an-ip"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["type"], "/problems/invalid-address");
    assert!(body["instance"].as_str().is_some());
}

#[tokio::test]
async fn missing_address_is_bad_request() {
    // The mock transport supplies no peer address.
    let response = server().get("/json").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoints() {
    let server = server();

    let live = server.get("/health/live").await;
    live.assert_status_ok();
    let body: Value = live.json();
    assert_eq!(body["status"], "ok");

    let ready = server.get("/health/ready").await;
    ready.assert_status_ok();
    let body: Value = ready.json();
    assert_eq!(body["gateways_loaded"], 6);
    assert_eq!(body["locations_indexed"], 5);
}

#[tokio::test]
async fn empty_snapshot_is_not_ready_but_still_answers() {
    let server = TestServer::new(router(empty_state(), &MetricsConfig::default())).unwrap();

    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let response = server
        .get("/json")
        .add_header(
            FORWARDED_FOR,
            HeaderValue::from_static(fixture_clients::SEATTLE),
        )
        .await;
    response.assert_status_ok();
    let body: GeolocationResponse = response.json();
    assert!(body.gateways.is_empty());
}

#[tokio::test]
async fn metrics_endpoint_responds() {
    let response = server().get("/metrics").await;
    response.assert_status_ok();
    assert!(response.text().starts_with('#') || response.text().is_empty());
}

#[tokio::test]
async fn metrics_served_at_configured_path() {
    let metrics = MetricsConfig {
        enabled: true,
        path: "/internal/metrics".to_string(),
    };
    let server = TestServer::new(router(test_state(), &metrics)).unwrap();

    server.get("/internal/metrics").await.assert_status_ok();
    server
        .get("/metrics")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disabled_metrics_are_not_routed() {
    let metrics = MetricsConfig {
        enabled: false,
        ..MetricsConfig::default()
    };
    let server = TestServer::new(router(test_state(), &metrics)).unwrap();

    server
        .get("/metrics")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server.get("/health/live").await.assert_status_ok();
}
