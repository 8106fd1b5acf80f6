use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was loaded from - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub presence: PresenceConfig,

    #[serde(default)]
    pub watchdog: WatchdogConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

// ── Discord ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Guild owning the status channel. Resolved from the status channel
    /// when absent.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Voice channel the bot keeps occupying.
    #[serde(default)]
    pub voice_channel_id: String,
    /// Channel whose name mirrors the space state.
    #[serde(default)]
    pub status_channel_id: String,
    /// Channel accepting `!glider` commands. Defaults to the voice channel's
    /// text chat.
    #[serde(default)]
    pub command_channel_id: Option<String>,
    /// Account username applied once on READY.
    #[serde(default = "default_username")]
    pub username: Option<String>,
}

fn default_username() -> Option<String> {
    Some("glider".into())
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            guild_id: None,
            voice_channel_id: String::new(),
            status_channel_id: String::new(),
            command_channel_id: None,
            username: default_username(),
        }
    }
}

// ── Status feed ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// SpaceAPI-style endpoint returning `{ "state": { "open": bool } }`.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long a closing observation must persist before it is announced.
    #[serde(default = "default_confirmation_window_secs")]
    pub confirmation_window_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_confirmation_window_secs() -> u64 {
    180
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            confirmation_window_secs: default_confirmation_window_secs(),
        }
    }
}

// ── Presence assets and state ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Directory holding `glider_open.png`, `glider_closed.png` and the
    /// optional `glider_unknown.png`.
    #[serde(default = "default_avatar_dir")]
    pub avatar_dir: String,
    /// Directory holding the durable enabled marker.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

fn default_avatar_dir() -> String {
    "res".into()
}

fn default_state_dir() -> String {
    "~/.glider".into()
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            avatar_dir: default_avatar_dir(),
            state_dir: default_state_dir(),
        }
    }
}

// ── Voice watchdog ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

fn default_check_interval_secs() -> u64 {
    60
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

// ── Reliability ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_component_backoff_secs")]
    pub component_initial_backoff_secs: u64,
    #[serde(default = "default_component_backoff_max_secs")]
    pub component_max_backoff_secs: u64,
    /// 0 = restart forever.
    #[serde(default)]
    pub component_max_restarts: u32,
}

fn default_component_backoff_secs() -> u64 {
    2
}

fn default_component_backoff_max_secs() -> u64 {
    60
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            component_initial_backoff_secs: default_component_backoff_secs(),
            component_max_backoff_secs: default_component_backoff_max_secs(),
            component_max_restarts: 0,
        }
    }
}
