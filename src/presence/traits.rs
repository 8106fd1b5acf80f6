use std::future::Future;
use std::pin::Pin;

use super::render::Activity;
use crate::error::SinkError;

pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// The three independently updatable parts of the presence surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PresenceField {
    Nickname,
    ChannelName,
    Avatar,
}

/// External presence surface kept in sync with the space state.
///
/// Each call either succeeds, fails with a retryable
/// [`SinkError::RateLimited`], or fails permanently.
pub trait PresenceSink: Send + Sync {
    /// Human-readable sink name for logs
    fn name(&self) -> &str;

    fn set_member_nickname<'a>(&'a self, nickname: &'a str) -> SinkFuture<'a>;

    fn set_channel_name<'a>(&'a self, channel_id: &'a str, name: &'a str) -> SinkFuture<'a>;

    fn set_own_avatar<'a>(&'a self, image: &'a [u8]) -> SinkFuture<'a>;

    /// Activity line shown next to the account. Best effort.
    fn set_activity<'a>(&'a self, _activity: &'a Activity) -> SinkFuture<'a> {
        Box::pin(async move { Ok(()) })
    }
}
