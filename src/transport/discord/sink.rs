use std::sync::Arc;

use tokio::sync::OnceCell;

use super::gateway::GatewayCommander;
use super::http_client::DiscordHttpClient;
use crate::error::SinkError;
use crate::presence::{Activity, PresenceSink, SinkFuture};

/// Presence surface backed by the Discord REST API (nickname, channel name,
/// avatar) and the gateway (activity line).
pub struct DiscordPresenceSink {
    http: Arc<DiscordHttpClient>,
    commander: GatewayCommander,
    status_channel_id: String,
    guild_id: OnceCell<String>,
}

impl DiscordPresenceSink {
    /// Without an explicit `guild_id`, the guild is looked up from the status
    /// channel on first use.
    pub fn new(
        http: Arc<DiscordHttpClient>,
        commander: GatewayCommander,
        status_channel_id: impl Into<String>,
        guild_id: Option<String>,
    ) -> Self {
        Self {
            http,
            commander,
            status_channel_id: status_channel_id.into(),
            guild_id: OnceCell::new_with(guild_id),
        }
    }

    async fn guild_id(&self) -> Result<&str, SinkError> {
        self.guild_id
            .get_or_try_init(|| async {
                let channel = self
                    .http
                    .get_channel(&self.status_channel_id)
                    .await
                    .map_err(|error| error.into_sink_error("get_channel"))?;
                channel
                    .get("guild_id")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| SinkError::Rejected {
                        operation: "get_channel",
                        message: format!(
                            "channel {} does not belong to a guild",
                            self.status_channel_id
                        ),
                    })
            })
            .await
            .map(String::as_str)
    }
}

impl PresenceSink for DiscordPresenceSink {
    fn name(&self) -> &str {
        "discord"
    }

    fn set_member_nickname<'a>(&'a self, nickname: &'a str) -> SinkFuture<'a> {
        Box::pin(async move {
            let guild_id = self.guild_id().await?;
            self.http
                .modify_current_member_nick(guild_id, nickname)
                .await
                .map_err(|error| error.into_sink_error("modify_current_member"))
        })
    }

    fn set_channel_name<'a>(&'a self, channel_id: &'a str, name: &'a str) -> SinkFuture<'a> {
        Box::pin(async move {
            self.http
                .modify_channel_name(channel_id, name)
                .await
                .map_err(|error| error.into_sink_error("modify_channel"))
        })
    }

    fn set_own_avatar<'a>(&'a self, image: &'a [u8]) -> SinkFuture<'a> {
        Box::pin(async move {
            self.http
                .modify_current_user_avatar(image)
                .await
                .map_err(|error| error.into_sink_error("modify_current_user"))
        })
    }

    fn set_activity<'a>(&'a self, activity: &'a Activity) -> SinkFuture<'a> {
        let result = self
            .commander
            .update_presence(activity)
            .map_err(|error| SinkError::Unavailable(error.to_string()));
        Box::pin(async move { result })
    }
}
