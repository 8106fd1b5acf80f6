//! Discord API constants and type definitions.

/// Discord API base URL (v10).
pub const API_BASE: &str = "https://discord.com/api/v10";

/// Fallback gateway URL when `/gateway/bot` has none.
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// Gateway intents the bot needs.
///
/// GUILDS (1) | `GUILD_VOICE_STATES` (128) | `GUILD_MESSAGES` (512)
/// | `MESSAGE_CONTENT` (32768) = 33409
pub const GLIDER_INTENTS: u64 =
    intents::GUILDS | intents::GUILD_VOICE_STATES | intents::GUILD_MESSAGES | intents::MESSAGE_CONTENT;

/// Default heartbeat interval when server does not provide one (ms).
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Embed accent colour for bot replies.
pub const EMBED_COLOR: u32 = 0x00_99_FF;

/// Gateway opcodes glider sends or handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GatewayOpcode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    PresenceUpdate = 3,
    /// Join, move or leave voice. Glider only ever occupies a slot.
    VoiceStateUpdate = 4,
    Resume = 6,
    Reconnect = 7,
    /// `d` tells whether the session may be resumed.
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

impl GatewayOpcode {
    pub fn from_u64(value: u64) -> Option<Self> {
        Some(match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::PresenceUpdate,
            4 => Self::VoiceStateUpdate,
            6 => Self::Resume,
            7 => Self::Reconnect,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            _ => return None,
        })
    }
}

/// Channel kinds relevant to the watchdog's "is this a voice channel" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscordChannelType {
    GuildText,
    GuildVoice,
    GuildStageVoice,
}

impl DiscordChannelType {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::GuildText),
            2 => Some(Self::GuildVoice),
            13 => Some(Self::GuildStageVoice),
            _ => None,
        }
    }

    pub fn is_voice(self) -> bool {
        matches!(self, Self::GuildVoice | Self::GuildStageVoice)
    }
}

/// Individual intent bit flags.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_VOICE_STATES: u64 = 1 << 7;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;
}
