use anyhow::{Context, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, interval};
use tokio_tungstenite::tungstenite::Message;

use super::http_client::DiscordHttpClient;
use super::types::{DEFAULT_GATEWAY_URL, DEFAULT_HEARTBEAT_INTERVAL_MS, GatewayOpcode};
use crate::error::TransportError;
use crate::presence::Activity;

const COMMAND_QUEUE_CAPACITY: usize = 32;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct DiscordGatewayState {
    pub session_id: Mutex<Option<String>>,
    pub sequence: AtomicI64,
    pub resume_gateway_url: Mutex<Option<String>>,
    /// Last presence sent, replayed in Identify after a fresh session.
    pub presence: std::sync::Mutex<Option<Value>>,
}

impl Default for DiscordGatewayState {
    fn default() -> Self {
        Self {
            session_id: Mutex::new(None),
            sequence: AtomicI64::new(-1),
            resume_gateway_url: Mutex::new(None),
            presence: std::sync::Mutex::new(None),
        }
    }
}

/// One member's voice membership as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceStateSnapshot {
    pub guild_id: Option<String>,
    pub user_id: String,
    /// `None` when the member left voice.
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready {
        session_id: String,
        resume_gateway_url: String,
        user_id: String,
    },
    GuildCreate {
        guild_id: String,
        voice_states: Vec<VoiceStateSnapshot>,
    },
    MessageCreate {
        channel_id: String,
        author_id: String,
        author_is_bot: bool,
        content: String,
        guild_id: Option<String>,
        message_id: String,
    },
    VoiceStateUpdate(VoiceStateSnapshot),
}

/// Outbound gateway command.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCommand {
    PresenceUpdate(Value),
    VoiceStateUpdate {
        guild_id: String,
        channel_id: Option<String>,
    },
}

impl GatewayCommand {
    pub fn payload(&self) -> Value {
        match self {
            Self::PresenceUpdate(presence) => json!({
                "op": GatewayOpcode::PresenceUpdate as u8,
                "d": presence,
            }),
            Self::VoiceStateUpdate {
                guild_id,
                channel_id,
            } => json!({
                "op": GatewayOpcode::VoiceStateUpdate as u8,
                "d": {
                    "guild_id": guild_id,
                    "channel_id": channel_id,
                    "self_mute": true,
                    "self_deaf": true,
                }
            }),
        }
    }
}

pub fn presence_payload(activity: &Activity) -> Value {
    json!({
        "since": null,
        "activities": [{
            "name": activity.name,
            "type": activity.kind as u8,
        }],
        "status": activity.status.to_string(),
        "afk": false,
    })
}

/// Cloneable handle for queuing outbound gateway commands. Commands are
/// written once the session is ready.
#[derive(Clone)]
pub struct GatewayCommander {
    tx: mpsc::Sender<GatewayCommand>,
    state: Arc<DiscordGatewayState>,
}

impl GatewayCommander {
    pub fn update_presence(&self, activity: &Activity) -> Result<(), TransportError> {
        let presence = presence_payload(activity);
        *self
            .state
            .presence
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(presence.clone());
        self.enqueue(GatewayCommand::PresenceUpdate(presence))
    }

    pub fn join_voice(&self, guild_id: &str, channel_id: &str) -> Result<(), TransportError> {
        self.enqueue(GatewayCommand::VoiceStateUpdate {
            guild_id: guild_id.to_string(),
            channel_id: Some(channel_id.to_string()),
        })
    }

    pub fn leave_voice(&self, guild_id: &str) -> Result<(), TransportError> {
        self.enqueue(GatewayCommand::VoiceStateUpdate {
            guild_id: guild_id.to_string(),
            channel_id: None,
        })
    }

    fn enqueue(&self, command: GatewayCommand) -> Result<(), TransportError> {
        self.tx
            .try_send(command)
            .map_err(|error| TransportError::Gateway(format!("command queue: {error}")))
    }
}

enum MessageFlow {
    Continue,
    SessionReady,
    Reconnect,
}

pub struct DiscordGateway {
    bot_token: String,
    intents: u64,
    state: Arc<DiscordGatewayState>,
    commands: Mutex<mpsc::Receiver<GatewayCommand>>,
}

impl DiscordGateway {
    pub fn new(bot_token: String, intents: u64) -> (Self, GatewayCommander) {
        let state = Arc::new(DiscordGatewayState::default());
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let gateway = Self {
            bot_token,
            intents,
            state: Arc::clone(&state),
            commands: Mutex::new(rx),
        };
        (gateway, GatewayCommander { tx, state })
    }

    /// Keeps a session alive, reconnecting when Discord asks to. Returns
    /// only on errors so the supervisor can back off.
    pub async fn run(&self, http: &DiscordHttpClient, tx: &mpsc::Sender<GatewayEvent>) -> Result<()> {
        loop {
            self.connect_and_listen(http, tx).await?;
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    pub async fn connect_and_listen(
        &self,
        http: &DiscordHttpClient,
        tx: &mpsc::Sender<GatewayEvent>,
    ) -> Result<()> {
        let mut commands = self
            .commands
            .try_lock()
            .context("Discord gateway is already connected")?;

        let gateway_url = self.resolve_gateway_url(http).await?;
        let ws_url = build_gateway_ws_url(&gateway_url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .with_context(|| format!("connect Discord gateway websocket: {ws_url}"))?;
        let (mut write, mut read) = ws_stream.split();

        let heartbeat_interval_ms = read_hello_heartbeat_interval(&mut read).await?;
        self.send_identify_or_resume(&mut write).await?;

        let mut heartbeat = interval(Duration::from_millis(heartbeat_interval_ms));
        let heartbeat_acked = AtomicBool::new(true);
        let mut ack_deadline: Option<Instant> = None;
        let mut session_ready = false;
        let mut commands_open = true;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if !self
                        .send_heartbeat_if_healthy(&mut write, &heartbeat_acked, &mut ack_deadline, heartbeat_interval_ms)
                        .await?
                    {
                        tracing::warn!("Discord gateway heartbeat ACK missing; reconnecting");
                        return Ok(());
                    }
                }
                () = wait_for_ack_timeout(ack_deadline) => {
                    if !heartbeat_acked.load(Ordering::SeqCst) {
                        tracing::warn!("Discord gateway heartbeat ACK timeout; reconnecting");
                        return Ok(());
                    }
                    ack_deadline = None;
                }
                command = commands.recv(), if session_ready && commands_open => {
                    let Some(command) = command else {
                        commands_open = false;
                        continue;
                    };
                    write
                        .send(Message::Text(command.payload().to_string().into()))
                        .await
                        .context("send Discord gateway command")?;
                }
                message = read.next() => {
                    let Some(message) = message else {
                        tracing::warn!("Discord gateway socket closed; reconnecting");
                        return Ok(());
                    };

                    let message = message.context("read Discord gateway message")?;
                    match self
                        .handle_gateway_message(message, tx, &mut write, &heartbeat_acked, &mut ack_deadline, heartbeat_interval_ms)
                        .await?
                    {
                        MessageFlow::Continue => {}
                        MessageFlow::SessionReady => session_ready = true,
                        MessageFlow::Reconnect => return Ok(()),
                    }
                }
            }
        }
    }

    async fn resolve_gateway_url(&self, http: &DiscordHttpClient) -> Result<String> {
        if let Some(url) = self.state.resume_gateway_url.lock().await.clone()
            && !url.is_empty()
        {
            return Ok(url);
        }

        let gw_resp = http
            .get_gateway_bot()
            .await
            .context("fetch Discord gateway/bot URL")?;
        let url = gw_resp
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or(DEFAULT_GATEWAY_URL)
            .to_string();
        Ok(url)
    }

    async fn send_identify_or_resume<WsSink>(&self, write: &mut WsSink) -> Result<()>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        if let Some(session_id) = self.state.session_id.lock().await.clone() {
            let payload = json!({
                "op": GatewayOpcode::Resume as u8,
                "d": {
                    "token": self.bot_token,
                    "session_id": session_id,
                    "seq": self.current_sequence_value(),
                }
            });
            write
                .send(Message::Text(payload.to_string().into()))
                .await
                .context("send Discord gateway resume")?;
            return Ok(());
        }

        let mut identify_data = json!({
            "token": self.bot_token,
            "intents": self.intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "glider",
                "device": "glider"
            }
        });

        let presence = self
            .state
            .presence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(presence) = presence {
            identify_data["presence"] = presence;
        }

        let payload = json!({
            "op": GatewayOpcode::Identify as u8,
            "d": identify_data,
        });

        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway identify")
    }

    async fn send_heartbeat_if_healthy<WsSink>(
        &self,
        write: &mut WsSink,
        heartbeat_acked: &AtomicBool,
        ack_deadline: &mut Option<Instant>,
        heartbeat_interval_ms: u64,
    ) -> Result<bool>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        if !heartbeat_acked.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let payload = json!({
            "op": GatewayOpcode::Heartbeat as u8,
            "d": self.current_sequence(),
        });

        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway heartbeat")?;

        heartbeat_acked.store(false, Ordering::SeqCst);
        *ack_deadline = Some(Instant::now() + Duration::from_millis(heartbeat_interval_ms));
        Ok(true)
    }

    async fn handle_gateway_message<WsSink>(
        &self,
        message: Message,
        tx: &mpsc::Sender<GatewayEvent>,
        write: &mut WsSink,
        heartbeat_acked: &AtomicBool,
        ack_deadline: &mut Option<Instant>,
        heartbeat_interval_ms: u64,
    ) -> Result<MessageFlow>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let Some(raw) = websocket_message_to_text(message) else {
            return Ok(MessageFlow::Continue);
        };

        let payload: Value = serde_json::from_str(&raw).context("parse Discord gateway payload")?;

        if let Some(sequence) = payload.get("s").and_then(Value::as_i64) {
            self.state.sequence.store(sequence, Ordering::SeqCst);
        }

        let op = payload
            .get("op")
            .and_then(Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        match op {
            Some(GatewayOpcode::Heartbeat) => {
                let healthy = self
                    .send_heartbeat_if_healthy(
                        write,
                        heartbeat_acked,
                        ack_deadline,
                        heartbeat_interval_ms,
                    )
                    .await?;
                Ok(if healthy {
                    MessageFlow::Continue
                } else {
                    MessageFlow::Reconnect
                })
            }
            Some(GatewayOpcode::HeartbeatAck) => {
                heartbeat_acked.store(true, Ordering::SeqCst);
                *ack_deadline = None;
                Ok(MessageFlow::Continue)
            }
            Some(GatewayOpcode::Reconnect) => {
                tracing::info!("Discord gateway requested reconnect");
                Ok(MessageFlow::Reconnect)
            }
            Some(GatewayOpcode::InvalidSession) => {
                self.handle_invalid_session(&payload).await;
                Ok(MessageFlow::Reconnect)
            }
            Some(GatewayOpcode::Dispatch) => self.handle_dispatch_payload(&payload, tx).await,
            _ => Ok(MessageFlow::Continue),
        }
    }

    async fn handle_dispatch_payload(
        &self,
        payload: &Value,
        tx: &mpsc::Sender<GatewayEvent>,
    ) -> Result<MessageFlow> {
        let event_type = payload.get("t").and_then(Value::as_str).unwrap_or("");
        if event_type == "RESUMED" {
            tracing::info!("Discord gateway session resumed");
            return Ok(MessageFlow::SessionReady);
        }
        let Some(data) = payload.get("d") else {
            return Ok(MessageFlow::Continue);
        };

        let Some(event) = parse_dispatch_event(event_type, data) else {
            return Ok(MessageFlow::Continue);
        };

        let flow = if let GatewayEvent::Ready {
            session_id,
            resume_gateway_url,
            ..
        } = &event
        {
            self.persist_ready_state(session_id, resume_gateway_url)
                .await;
            MessageFlow::SessionReady
        } else {
            MessageFlow::Continue
        };

        tx.send(event)
            .await
            .context("dispatch parsed Discord gateway event")?;
        Ok(flow)
    }

    async fn persist_ready_state(&self, session_id: &str, resume_gateway_url: &str) {
        *self.state.session_id.lock().await = Some(session_id.to_string());
        *self.state.resume_gateway_url.lock().await = Some(resume_gateway_url.to_string());
    }

    async fn handle_invalid_session(&self, payload: &Value) {
        let can_resume = payload.get("d").and_then(Value::as_bool).unwrap_or(false);

        self.state.sequence.store(-1, Ordering::SeqCst);
        *self.state.session_id.lock().await = None;

        if can_resume {
            let wait_secs = invalid_session_backoff_secs();
            tracing::warn!(
                "Discord gateway invalid session (resume allowed), waiting {wait_secs}s before reconnect"
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
            return;
        }

        tracing::warn!("Discord gateway invalid session (resume denied), clearing resume URL");
        *self.state.resume_gateway_url.lock().await = None;
    }

    fn current_sequence(&self) -> Value {
        let sequence = self.current_sequence_value();
        if sequence < 0 {
            Value::Null
        } else {
            json!(sequence)
        }
    }

    fn current_sequence_value(&self) -> i64 {
        self.state.sequence.load(Ordering::SeqCst)
    }
}

pub fn parse_dispatch_event(event_type: &str, d: &Value) -> Option<GatewayEvent> {
    match event_type {
        "READY" => parse_ready_event(d),
        "GUILD_CREATE" => parse_guild_create_event(d),
        "MESSAGE_CREATE" => parse_message_create_event(d),
        "VOICE_STATE_UPDATE" => parse_voice_state(d, None).map(GatewayEvent::VoiceStateUpdate),
        _ => None,
    }
}

fn parse_ready_event(d: &Value) -> Option<GatewayEvent> {
    let session_id = d.get("session_id")?.as_str()?.to_string();
    let resume_gateway_url = d.get("resume_gateway_url")?.as_str()?.to_string();
    let user_id = d.get("user")?.get("id")?.as_str()?.to_string();

    Some(GatewayEvent::Ready {
        session_id,
        resume_gateway_url,
        user_id,
    })
}

fn parse_guild_create_event(d: &Value) -> Option<GatewayEvent> {
    let guild_id = d.get("id")?.as_str()?.to_string();
    let voice_states = d
        .get("voice_states")
        .and_then(Value::as_array)
        .map(|states| {
            states
                .iter()
                .filter_map(|state| parse_voice_state(state, Some(&guild_id)))
                .collect()
        })
        .unwrap_or_default();

    Some(GatewayEvent::GuildCreate {
        guild_id,
        voice_states,
    })
}

/// GUILD_CREATE voice states omit `guild_id`; `fallback_guild` fills it in.
fn parse_voice_state(d: &Value, fallback_guild: Option<&str>) -> Option<VoiceStateSnapshot> {
    let user_id = d.get("user_id")?.as_str()?.to_string();
    let guild_id = d
        .get("guild_id")
        .and_then(Value::as_str)
        .or(fallback_guild)
        .map(str::to_string);
    let channel_id = d
        .get("channel_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(VoiceStateSnapshot {
        guild_id,
        user_id,
        channel_id,
    })
}

fn parse_message_create_event(d: &Value) -> Option<GatewayEvent> {
    let channel_id = d.get("channel_id")?.as_str()?.to_string();
    let author = d.get("author")?;
    let author_id = author.get("id")?.as_str()?.to_string();
    let author_is_bot = author.get("bot").and_then(Value::as_bool).unwrap_or(false);
    let content = d
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let guild_id = d
        .get("guild_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    let message_id = d.get("id")?.as_str()?.to_string();

    Some(GatewayEvent::MessageCreate {
        channel_id,
        author_id,
        author_is_bot,
        content,
        guild_id,
        message_id,
    })
}

async fn wait_for_ack_timeout(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    } else {
        futures_util::future::pending::<()>().await;
    }
}

async fn read_hello_heartbeat_interval<WsRead>(read: &mut WsRead) -> Result<u64>
where
    WsRead:
        Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let message = message.context("read Discord gateway hello payload")?;
        let Some(raw) = websocket_message_to_text(message) else {
            continue;
        };

        let payload: Value =
            serde_json::from_str(&raw).context("parse Discord gateway hello JSON")?;

        let op = payload
            .get("op")
            .and_then(Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        if op == Some(GatewayOpcode::Hello) {
            let interval_ms = payload
                .get("d")
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS);
            return Ok(interval_ms);
        }
    }

    Err(anyhow::anyhow!("Discord gateway closed before Hello"))
}

fn websocket_message_to_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.to_string()),
        Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}

fn build_gateway_ws_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    format!("{trimmed}/?v=10&encoding=json")
}

fn invalid_session_backoff_secs() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.subsec_nanos())
        .unwrap_or(0);
    1 + u64::from(nanos % 5)
}
