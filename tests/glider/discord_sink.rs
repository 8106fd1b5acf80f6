use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glider::error::SinkError;
use glider::presence::PresenceSink;
use glider::transport::discord::{
    DiscordGateway, DiscordHttpClient, DiscordPresenceSink, GLIDER_INTENTS,
};

fn sink_for(server: &MockServer, guild_id: Option<&str>) -> DiscordPresenceSink {
    let http = DiscordHttpClient::new("test-token", Duration::from_secs(5))
        .unwrap()
        .with_base_url(format!("{}/api/v10", server.uri()));
    let (_gateway, commander) = DiscordGateway::new("test-token".into(), GLIDER_INTENTS);
    DiscordPresenceSink::new(
        Arc::new(http),
        commander,
        "500",
        guild_id.map(str::to_string),
    )
}

#[tokio::test]
async fn guild_is_resolved_from_status_channel_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v10/channels/500"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "500", "type": 0, "guild_id": "77" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/guilds/77/members/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let sink = sink_for(&server, None);
    sink.set_member_nickname("🔴 Closed").await.unwrap();
    sink.set_member_nickname("🟢 Open (1 🧙)").await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn configured_guild_skips_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/guilds/12/members/@me"))
        .and(body_json(json!({ "nick": "🟡 Unknown" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    sink_for(&server, Some("12"))
        .set_member_nickname("🟡 Unknown")
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn channel_rate_limit_maps_to_retryable_error() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/channels/500"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12.5"))
        .mount(&server)
        .await;

    let error = sink_for(&server, Some("12"))
        .set_channel_name("500", "🟢🔓-space-is-open")
        .await
        .unwrap_err();
    assert!(error.is_retryable());
    assert_eq!(error.retry_after(), Some(Duration::from_millis(12_500)));
}

#[tokio::test]
async fn permission_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/users/@me"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "Missing Permissions", "code": 50013 })),
        )
        .mount(&server)
        .await;

    let error = sink_for(&server, Some("12"))
        .set_own_avatar(&[0x89, b'P', b'N', b'G'])
        .await
        .unwrap_err();
    assert!(matches!(error, SinkError::Rejected { .. }));
    assert!(!error.is_retryable());
}
