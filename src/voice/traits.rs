use std::future::Future;
use std::pin::Pin;

use crate::error::VoiceError;

pub type VoiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, VoiceError>> + Send + 'a>>;

/// A voice channel confirmed to exist and accept members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub guild_id: String,
    pub channel_id: String,
}

/// Platform side of voice membership. Joining never opens an audio session;
/// the bot only occupies the slot, muted and deafened.
pub trait VoiceConnector: Send + Sync {
    /// Channel the bot currently sits in, as last reported by the platform.
    fn current_channel(&self) -> Option<String>;

    /// Look up `channel_id` and check that it is a voice channel.
    fn resolve_channel<'a>(&'a self, channel_id: &'a str) -> VoiceFuture<'a, ResolvedChannel>;

    fn join<'a>(&'a self, channel: &'a ResolvedChannel) -> VoiceFuture<'a, ()>;

    fn leave<'a>(&'a self, guild_id: &'a str) -> VoiceFuture<'a, ()>;
}
