use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glider::transport::discord::{DiscordApiError, DiscordHttpClient};

fn client_for(server: &MockServer) -> DiscordHttpClient {
    DiscordHttpClient::new("test-token", Duration::from_secs(5))
        .unwrap()
        .with_base_url(format!("{}/api/v10", server.uri()))
}

#[tokio::test]
async fn nickname_patch_carries_bot_auth() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/guilds/42/members/@me"))
        .and(header("authorization", "Bot test-token"))
        .and(body_json(json!({ "nick": "🟢 Open (3 🧙)" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .modify_current_member_nick("42", "🟢 Open (3 🧙)")
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn rate_limit_fails_fast_until_reset() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/channels/7"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "30")
                .set_body_json(json!({ "message": "You are being rate limited.", "retry_after": 30.0, "global": false })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.modify_channel_name("7", "🔴🔒-space-is-closed").await;
    let Err(DiscordApiError::RateLimited { retry_after, .. }) = first else {
        panic!("expected rate limit, got {first:?}");
    };
    assert_eq!(retry_after, Duration::from_secs(30));

    // Same route, different channel id: same bucket, no request sent.
    let second = client.modify_channel_name("8", "🟢🔓-space-is-open").await;
    let Err(DiscordApiError::RateLimited { retry_after, .. }) = second else {
        panic!("expected local rate limit, got {second:?}");
    };
    assert!(retry_after > Duration::from_secs(25));
    server.verify().await;
}

#[tokio::test]
async fn current_user_and_gateway_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v10/users/@me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "999", "username": "glider" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v10/gateway/bot"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "url": "wss://gateway.example", "shards": 1 })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.get_current_user().await.unwrap();
    assert_eq!(user["username"], "glider");
    let gateway = client.get_gateway_bot().await.unwrap();
    assert_eq!(gateway["url"], "wss://gateway.example");
}

#[tokio::test]
async fn avatar_is_sent_as_png_data_uri() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/users/@me"))
        .and(body_json(json!({ "avatar": "data:image/png;base64,AQID" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1" })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .modify_current_user_avatar(&[1, 2, 3])
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn missing_channel_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v10/channels/404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Unknown Channel", "code": 10003 })),
        )
        .mount(&server)
        .await;

    let error = client_for(&server).get_channel("404").await.unwrap_err();
    assert!(error.is_not_found());
    assert!(error.retry_after().is_none());
}

#[tokio::test]
async fn embed_message_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v10/channels/9/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m1" })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .send_embed("9", "Title", "Body", &[("`!help`", "Shows this")])
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    let embed = &body["embeds"][0];
    assert_eq!(embed["title"], "Title");
    assert_eq!(embed["description"], "Body");
    assert_eq!(embed["fields"][0]["name"], "`!help`");
    assert_eq!(embed["fields"][0]["value"], "Shows this");
}
