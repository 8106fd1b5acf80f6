use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::gateway::{GatewayCommander, VoiceStateSnapshot};
use super::http_client::DiscordHttpClient;
use super::types::DiscordChannelType;
use crate::error::VoiceError;
use crate::voice::{ResolvedChannel, VoiceConnector, VoiceFuture};

/// Voice membership over the gateway's voice-state command. No voice
/// websocket is opened; the bot only occupies the channel.
pub struct DiscordVoiceConnector {
    http: Arc<DiscordHttpClient>,
    commander: GatewayCommander,
    bot_user_id: Mutex<Option<String>>,
    membership: Mutex<Membership>,
}

/// Where the bot last reported being in voice.
#[derive(Debug, Default)]
struct Membership {
    guild_id: Option<String>,
    channel_id: Option<String>,
}

impl DiscordVoiceConnector {
    pub fn new(http: Arc<DiscordHttpClient>, commander: GatewayCommander) -> Self {
        Self {
            http,
            commander,
            bot_user_id: Mutex::new(None),
            membership: Mutex::new(Membership::default()),
        }
    }

    pub fn set_bot_user_id(&self, user_id: &str) {
        *self
            .bot_user_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(user_id.to_string());
    }

    pub fn is_bot_user(&self, user_id: &str) -> bool {
        self.bot_user_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .is_some_and(|id| id == user_id)
    }

    fn lock_membership(&self) -> MutexGuard<'_, Membership> {
        self.membership.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tracks the bot's own voice state. Returns the new channel when the
    /// snapshot is about the bot, `None` for anyone else.
    pub fn record_voice_state(&self, snapshot: &VoiceStateSnapshot) -> Option<Option<String>> {
        if !self.is_bot_user(&snapshot.user_id) {
            return None;
        }
        let mut membership = self.lock_membership();
        membership.guild_id.clone_from(&snapshot.guild_id);
        membership.channel_id.clone_from(&snapshot.channel_id);
        Some(snapshot.channel_id.clone())
    }

    /// A new session starts with no known membership. Returns whether a
    /// channel was forgotten.
    pub fn clear_membership(&self) -> bool {
        let mut membership = self.lock_membership();
        let had_channel = membership.channel_id.is_some();
        *membership = Membership::default();
        had_channel
    }

    /// Guild snapshot without the bot in it: drop a membership recorded for
    /// that guild. Returns whether a channel was forgotten.
    pub fn clear_guild(&self, guild_id: &str) -> bool {
        let mut membership = self.lock_membership();
        let same_guild = membership
            .guild_id
            .as_deref()
            .is_none_or(|known| known == guild_id);
        if !same_guild || membership.channel_id.is_none() {
            return false;
        }
        *membership = Membership::default();
        true
    }
}

impl VoiceConnector for DiscordVoiceConnector {
    fn current_channel(&self) -> Option<String> {
        self.lock_membership().channel_id.clone()
    }

    fn resolve_channel<'a>(&'a self, channel_id: &'a str) -> VoiceFuture<'a, ResolvedChannel> {
        Box::pin(async move {
            let channel = self.http.get_channel(channel_id).await.map_err(|error| {
                if error.is_not_found() {
                    VoiceError::ChannelNotFound(channel_id.to_string())
                } else {
                    VoiceError::Gateway(error.to_string())
                }
            })?;

            let is_voice = channel
                .get("type")
                .and_then(serde_json::Value::as_u64)
                .and_then(DiscordChannelType::from_u64)
                .is_some_and(DiscordChannelType::is_voice);
            let guild_id = channel.get("guild_id").and_then(serde_json::Value::as_str);

            match guild_id {
                Some(guild_id) if is_voice => Ok(ResolvedChannel {
                    guild_id: guild_id.to_string(),
                    channel_id: channel_id.to_string(),
                }),
                _ => Err(VoiceError::NotVoiceChannel(channel_id.to_string())),
            }
        })
    }

    fn join<'a>(&'a self, channel: &'a ResolvedChannel) -> VoiceFuture<'a, ()> {
        let result = self
            .commander
            .join_voice(&channel.guild_id, &channel.channel_id)
            .map_err(|error| VoiceError::Gateway(error.to_string()));
        Box::pin(async move { result })
    }

    fn leave<'a>(&'a self, guild_id: &'a str) -> VoiceFuture<'a, ()> {
        let result = self
            .commander
            .leave_voice(guild_id)
            .map_err(|error| VoiceError::Gateway(error.to_string()));
        Box::pin(async move { result })
    }
}
