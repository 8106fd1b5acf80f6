use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glider::error::FetchError;
use glider::status::{Observation, SpaceApiSource, StatusSource};

async fn source_for(server: &MockServer, timeout: Duration) -> SpaceApiSource {
    SpaceApiSource::new(format!("{}/status.json", server.uri()), timeout).unwrap()
}

#[tokio::test]
async fn poll_reads_state_and_people_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "space": "Example Space",
            "state": { "open": true, "lastchange": 1_700_000_000 },
            "sensors": { "people_now_present": [ { "value": "5", "unit": "people" } ] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5)).await;
    assert_eq!(source.poll().await.unwrap(), Observation::open(5));
    server.verify().await;
}

#[tokio::test]
async fn server_error_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5)).await;
    assert!(matches!(source.poll().await, Err(FetchError::Status(503))));
}

#[tokio::test]
async fn garbage_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5)).await;
    assert!(matches!(source.poll().await, Err(FetchError::Malformed(_))));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "state": { "open": false } }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_millis(200)).await;
    assert!(matches!(source.poll().await, Err(FetchError::Timeout)));
}
