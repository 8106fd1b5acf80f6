use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glider::presence::{
    AvatarSet, FieldStatus, PresenceField, ReconciliationEngine, StepOutcome,
};
use glider::status::{Observation, OccupancyState};
use glider::transport::discord::{
    DiscordGateway, DiscordHttpClient, DiscordPresenceSink, GLIDER_INTENTS,
};

async fn mount_ok(server: &MockServer, verb: &str, route: &str, times: u64) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn rate_limited_channel_is_retried_on_next_cycle() {
    let server = MockServer::start().await;
    // First rename is throttled; the mock is mounted first so it wins once.
    Mock::given(method("PATCH"))
        .and(path("/api/v10/channels/500"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0.2"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_ok(&server, "PATCH", "/api/v10/channels/500", 1).await;
    mount_ok(&server, "PATCH", "/api/v10/guilds/12/members/@me", 1).await;
    mount_ok(&server, "PATCH", "/api/v10/users/@me", 1).await;

    let http = DiscordHttpClient::new("test-token", Duration::from_secs(5))
        .unwrap()
        .with_base_url(format!("{}/api/v10", server.uri()));
    let (_gateway, commander) = DiscordGateway::new("test-token".into(), GLIDER_INTENTS);
    let sink = Arc::new(DiscordPresenceSink::new(
        Arc::new(http),
        commander,
        "500",
        Some("12".into()),
    ));
    let mut engine = ReconciliationEngine::new(
        sink,
        "500",
        AvatarSet::new(Some(vec![1]), Some(vec![2]), Some(vec![3])),
    );

    let open = Observation::open(2);
    let first = engine.reconcile(&open).await;
    assert_eq!(first.nickname, StepOutcome::Applied);
    assert!(matches!(first.channel, StepOutcome::Deferred { .. }));
    assert_eq!(first.avatar, StepOutcome::Skipped);
    assert_eq!(engine.announced().occupancy, OccupancyState::Unknown);
    assert_eq!(engine.announced().person_count, Some(2));
    assert!(engine.has_pending_retry());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let second = engine.reconcile(&open).await;
    assert_eq!(second.nickname, StepOutcome::Skipped);
    assert_eq!(second.channel, StepOutcome::Applied);
    assert_eq!(second.avatar, StepOutcome::Applied);
    assert_eq!(engine.announced().occupancy, OccupancyState::Open);
    assert_eq!(
        engine.announced().status(PresenceField::ChannelName),
        FieldStatus::Synced
    );
    assert!(!engine.has_pending_retry());

    // Steady state: no further calls.
    assert!(engine.reconcile(&open).await.is_noop());
    server.verify().await;
}
