use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::gateway::{GatewayEvent, VoiceStateSnapshot};
use super::http_client::DiscordHttpClient;
use super::voice::DiscordVoiceConnector;
use crate::commands::{CommandOutcome, help_card, parse_command};
use crate::presence::PresenceController;
use crate::voice::ConnectionWatchdog;

/// Turns gateway events into calls on the controller and the watchdog.
pub struct EventRouter {
    http: Arc<DiscordHttpClient>,
    controller: Arc<PresenceController>,
    connector: Arc<DiscordVoiceConnector>,
    watchdog: Arc<ConnectionWatchdog>,
    command_channel_id: String,
    username: Option<String>,
    username_applied: AtomicBool,
}

impl EventRouter {
    pub fn new(
        http: Arc<DiscordHttpClient>,
        controller: Arc<PresenceController>,
        connector: Arc<DiscordVoiceConnector>,
        watchdog: Arc<ConnectionWatchdog>,
        command_channel_id: impl Into<String>,
        username: Option<String>,
    ) -> Self {
        Self {
            http,
            controller,
            connector,
            watchdog,
            command_channel_id: command_channel_id.into(),
            username,
            username_applied: AtomicBool::new(false),
        }
    }

    pub async fn run(&self, mut rx: mpsc::Receiver<GatewayEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event).await;
        }
        tracing::warn!("Discord event stream closed");
    }

    pub async fn handle_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { user_id, .. } => self.handle_ready(&user_id).await,
            GatewayEvent::GuildCreate {
                guild_id,
                voice_states,
            } => {
                let mut bot_listed = false;
                for snapshot in &voice_states {
                    bot_listed |= self.handle_voice_state(snapshot);
                }
                if !bot_listed && self.connector.clear_guild(&guild_id) {
                    self.watchdog.on_membership_changed(None);
                }
            }
            GatewayEvent::VoiceStateUpdate(snapshot) => {
                self.handle_voice_state(&snapshot);
            }
            GatewayEvent::MessageCreate {
                channel_id,
                author_id,
                author_is_bot,
                content,
                ..
            } => {
                if self.accepts_message(&channel_id, &author_id, author_is_bot) {
                    self.handle_command_message(&channel_id, &content);
                }
            }
        }
    }

    async fn handle_ready(&self, user_id: &str) {
        self.connector.set_bot_user_id(user_id);
        tracing::info!("Discord: connected as user {user_id}");
        if self.connector.clear_membership() {
            self.watchdog.on_membership_changed(None);
        }

        let Some(username) = self.username.as_deref() else {
            return;
        };
        if self.username_applied.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.http.modify_current_user_username(username).await {
            Ok(()) => tracing::info!("Discord: username set to {username}"),
            Err(error) => tracing::warn!("Discord: failed to set username: {error}"),
        }
    }

    /// Returns whether the snapshot was about the bot.
    fn handle_voice_state(&self, snapshot: &VoiceStateSnapshot) -> bool {
        let Some(channel) = self.connector.record_voice_state(snapshot) else {
            return false;
        };
        self.watchdog.on_membership_changed(channel.as_deref());
        true
    }

    fn accepts_message(&self, channel_id: &str, author_id: &str, author_is_bot: bool) -> bool {
        channel_id == self.command_channel_id
            && !author_is_bot
            && !self.connector.is_bot_user(author_id)
    }

    /// Commands run a reconciliation pass, so they are handled off the
    /// event loop.
    fn handle_command_message(&self, channel_id: &str, content: &str) {
        let Some(command) = parse_command(content) else {
            return;
        };
        tracing::info!("Discord: command {command:?} in channel {channel_id}");

        let controller = Arc::clone(&self.controller);
        let http = Arc::clone(&self.http);
        let channel_id = channel_id.to_string();
        tokio::spawn(async move {
            if controller.on_command(command).await != CommandOutcome::Help {
                return;
            }
            let card = help_card();
            let fields = card
                .fields
                .iter()
                .map(|field| (field.name, field.value))
                .collect::<Vec<_>>();
            if let Err(error) = http
                .send_embed(&channel_id, card.title, card.description, &fields)
                .await
            {
                tracing::warn!("Discord: failed to send help: {error}");
            }
        });
    }
}
