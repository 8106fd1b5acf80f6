use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glider::presence::{
    AvatarSet, ConfirmationFilter, EnabledFlag, PresenceController, ReconciliationEngine,
};
use glider::status::SpaceApiSource;
use glider::transport::discord::{
    DiscordGateway, DiscordHttpClient, DiscordPresenceSink, DiscordVoiceConnector, EventRouter,
    GLIDER_INTENTS, GatewayEvent, VoiceStateSnapshot,
};
use glider::voice::{ConnectionWatchdog, MembershipPhase, VoiceConnector};

const COMMAND_CHANNEL: &str = "300";
const VOICE_CHANNEL: &str = "100";
const BOT_USER: &str = "999";

struct Harness {
    router: EventRouter,
    connector: Arc<DiscordVoiceConnector>,
    watchdog: Arc<ConnectionWatchdog>,
    controller: Arc<PresenceController>,
    _gateway: DiscordGateway,
}

fn harness(server: &MockServer, state_dir: &Path, username: Option<&str>) -> Harness {
    let http = Arc::new(
        DiscordHttpClient::new("test-token", Duration::from_secs(5))
            .unwrap()
            .with_base_url(format!("{}/api/v10", server.uri())),
    );
    let (gateway, commander) = DiscordGateway::new("test-token".into(), GLIDER_INTENTS);
    let sink = Arc::new(DiscordPresenceSink::new(
        Arc::clone(&http),
        commander.clone(),
        "200",
        Some("12".into()),
    ));
    let source = Arc::new(
        SpaceApiSource::new(format!("{}/status.json", server.uri()), Duration::from_secs(5))
            .unwrap(),
    );
    let controller = Arc::new(PresenceController::new(
        source,
        EnabledFlag::load(state_dir.join("enabled")),
        ConfirmationFilter::new(Duration::from_secs(180)),
        ReconciliationEngine::new(sink, "200", AvatarSet::new(None, None, None)),
    ));
    let connector = Arc::new(DiscordVoiceConnector::new(Arc::clone(&http), commander));
    let watchdog = Arc::new(ConnectionWatchdog::new(
        connector.clone(),
        VOICE_CHANNEL,
        Duration::from_secs(60),
    ));
    let router = EventRouter::new(
        http,
        Arc::clone(&controller),
        Arc::clone(&connector),
        Arc::clone(&watchdog),
        COMMAND_CHANNEL,
        username.map(str::to_string),
    );
    Harness {
        router,
        connector,
        watchdog,
        controller,
        _gateway: gateway,
    }
}

fn ready() -> GatewayEvent {
    GatewayEvent::Ready {
        session_id: "s".into(),
        resume_gateway_url: "wss://resume.example".into(),
        user_id: BOT_USER.into(),
    }
}

fn message(channel_id: &str, author_id: &str, content: &str) -> GatewayEvent {
    GatewayEvent::MessageCreate {
        channel_id: channel_id.into(),
        author_id: author_id.into(),
        author_is_bot: false,
        content: content.into(),
        guild_id: Some("12".into()),
        message_id: "m".into(),
    }
}

async fn wait_for_requests(server: &MockServer, route: &str, count: usize) -> usize {
    for _ in 0..100 {
        let seen = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == route)
            .count();
        if seen >= count {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    0
}

#[tokio::test]
async fn help_replies_with_embed_in_command_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v10/channels/300/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "r" })))
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let h = harness(&server, tmp.path(), None);

    h.router.handle_event(ready()).await;
    h.router.handle_event(message(COMMAND_CHANNEL, "1", "  !HELP ")).await;

    let route = "/api/v10/channels/300/messages";
    assert_eq!(wait_for_requests(&server, route, 1).await, 1);
    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["embeds"][0]["title"], "🪂 Glider sees you");
    assert_eq!(body["embeds"][0]["fields"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn messages_outside_channel_or_from_self_are_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "r" })))
        .expect(0)
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let h = harness(&server, tmp.path(), None);

    h.router.handle_event(ready()).await;
    h.router.handle_event(message("301", "1", "!help")).await;
    h.router.handle_event(message(COMMAND_CHANNEL, BOT_USER, "!help")).await;
    h.router
        .handle_event(GatewayEvent::MessageCreate {
            channel_id: COMMAND_CHANNEL.into(),
            author_id: "2".into(),
            author_is_bot: true,
            content: "!help".into(),
            guild_id: Some("12".into()),
            message_id: "m".into(),
        })
        .await;
    h.router.handle_event(message(COMMAND_CHANNEL, "1", "!glider maybe")).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.verify().await;
}

#[tokio::test]
async fn disable_command_persists_flag_and_announces_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/guilds/12/members/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/channels/200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let h = harness(&server, tmp.path(), None);

    h.router.handle_event(ready()).await;
    h.router.handle_event(message(COMMAND_CHANNEL, "1", "!glider off")).await;

    assert_eq!(
        wait_for_requests(&server, "/api/v10/guilds/12/members/@me", 1).await,
        1
    );
    assert!(!h.controller.is_enabled());
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("enabled")).unwrap(),
        "0"
    );
    let received = server.received_requests().await.unwrap();
    let nick = received
        .iter()
        .find(|request| request.url.path() == "/api/v10/guilds/12/members/@me")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&nick.body).unwrap();
    assert_eq!(body["nick"], "🟡 Unknown");
}

#[tokio::test]
async fn bot_voice_state_updates_membership() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let h = harness(&server, tmp.path(), None);
    h.router.handle_event(ready()).await;

    h.router
        .handle_event(GatewayEvent::GuildCreate {
            guild_id: "12".into(),
            voice_states: vec![VoiceStateSnapshot {
                guild_id: Some("12".into()),
                user_id: BOT_USER.into(),
                channel_id: Some(VOICE_CHANNEL.into()),
            }],
        })
        .await;
    assert_eq!(h.connector.current_channel().as_deref(), Some(VOICE_CHANNEL));
    assert_eq!(h.watchdog.phase(), MembershipPhase::ConnectedCorrect);

    // Someone else leaving does not touch the bot's membership.
    h.router
        .handle_event(GatewayEvent::VoiceStateUpdate(VoiceStateSnapshot {
            guild_id: Some("12".into()),
            user_id: "1".into(),
            channel_id: None,
        }))
        .await;
    assert_eq!(h.watchdog.phase(), MembershipPhase::ConnectedCorrect);

    h.router
        .handle_event(GatewayEvent::VoiceStateUpdate(VoiceStateSnapshot {
            guild_id: Some("12".into()),
            user_id: BOT_USER.into(),
            channel_id: Some("101".into()),
        }))
        .await;
    assert_eq!(h.watchdog.phase(), MembershipPhase::ConnectedWrongChannel);
}

#[tokio::test]
async fn username_is_applied_once_across_sessions() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v10/users/@me"))
        .and(wiremock::matchers::body_json(json!({ "username": "glider" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": BOT_USER })))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let h = harness(&server, tmp.path(), Some("glider"));

    h.router.handle_event(ready()).await;
    h.router.handle_event(ready()).await;
    assert!(h.connector.is_bot_user(BOT_USER));
    server.verify().await;
}

#[tokio::test]
async fn fresh_session_forgets_stale_membership() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let h = harness(&server, tmp.path(), None);

    h.router.handle_event(ready()).await;
    h.router
        .handle_event(GatewayEvent::VoiceStateUpdate(VoiceStateSnapshot {
            guild_id: Some("12".into()),
            user_id: BOT_USER.into(),
            channel_id: Some(VOICE_CHANNEL.into()),
        }))
        .await;
    assert_eq!(h.watchdog.phase(), MembershipPhase::ConnectedCorrect);

    h.router.handle_event(ready()).await;
    h.router
        .handle_event(GatewayEvent::GuildCreate {
            guild_id: "12".into(),
            voice_states: vec![],
        })
        .await;
    assert_eq!(h.connector.current_channel(), None);
    assert_eq!(h.watchdog.phase(), MembershipPhase::Disconnected);
}

#[tokio::test]
async fn guild_snapshot_without_bot_clears_membership() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let h = harness(&server, tmp.path(), None);
    h.router.handle_event(ready()).await;
    h.router
        .handle_event(GatewayEvent::VoiceStateUpdate(VoiceStateSnapshot {
            guild_id: Some("12".into()),
            user_id: BOT_USER.into(),
            channel_id: Some(VOICE_CHANNEL.into()),
        }))
        .await;

    // Another guild's snapshot leaves the membership alone.
    h.router
        .handle_event(GatewayEvent::GuildCreate {
            guild_id: "13".into(),
            voice_states: vec![],
        })
        .await;
    assert_eq!(h.watchdog.phase(), MembershipPhase::ConnectedCorrect);

    h.router
        .handle_event(GatewayEvent::GuildCreate {
            guild_id: "12".into(),
            voice_states: vec![VoiceStateSnapshot {
                guild_id: Some("12".into()),
                user_id: "1".into(),
                channel_id: Some(VOICE_CHANNEL.into()),
            }],
        })
        .await;
    assert_eq!(h.connector.current_channel(), None);
    assert_eq!(h.watchdog.phase(), MembershipPhase::Disconnected);
}
