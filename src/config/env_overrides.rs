use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) =
            std::env::var("GLIDER_DISCORD_TOKEN").or_else(|_| std::env::var("DISCORD_TOKEN"))
            && !token.is_empty()
        {
            self.discord.bot_token = token;
        }

        if let Ok(endpoint) =
            std::env::var("GLIDER_SPACE_ENDPOINT").or_else(|_| std::env::var("SPACE_ENDPOINT"))
            && !endpoint.is_empty()
        {
            self.status.endpoint = endpoint;
        }

        if let Ok(guild) = std::env::var("GUILD_ID")
            && !guild.is_empty()
        {
            self.discord.guild_id = Some(guild);
        }

        if let Ok(channel) = std::env::var("VOICE_CHANNEL_ID")
            && !channel.is_empty()
        {
            self.discord.voice_channel_id = channel;
        }

        if let Ok(channel) = std::env::var("STATUS_CHANNEL_ID")
            && !channel.is_empty()
        {
            self.discord.status_channel_id = channel;
        }

        if let Ok(channel) = std::env::var("COMMAND_CHANNEL_ID")
            && !channel.is_empty()
        {
            self.discord.command_channel_id = Some(channel);
        }

        if let Ok(dir) = std::env::var("GLIDER_STATE_DIR")
            && !dir.is_empty()
        {
            self.presence.state_dir = dir;
        }

        if let Ok(dir) = std::env::var("GLIDER_AVATAR_DIR")
            && !dir.is_empty()
        {
            self.presence.avatar_dir = dir;
        }

        if let Ok(secs) = std::env::var("GLIDER_POLL_INTERVAL_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.status.poll_interval_secs = secs;
        }
    }
}
