use super::Config;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

impl Config {
    /// `~/.glider/config.toml`.
    pub fn default_config_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".glider").join("config.toml"))
    }

    /// Loads the file (when present), applies environment overrides and
    /// validates. A missing file is not an error: a container deployment
    /// configures everything through the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let mut config = Self::load_file(&config_path)?;
        config.apply_env_overrides();
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(ConfigError::Io)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            toml::from_str::<Self>(&contents)
                .map_err(|e| ConfigError::Load(e.to_string()))
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?
        } else {
            tracing::info!(
                "No config file at {}; using defaults and environment",
                config_path.display()
            );
            Self::default()
        };
        config.config_path = config_path.to_path_buf();
        Ok(config)
    }

    /// Clamps timing values that would break the debounce or the loops.
    pub fn normalize(&mut self) {
        self.status.poll_interval_secs = self.status.poll_interval_secs.max(1);
        self.status.request_timeout_secs = self.status.request_timeout_secs.max(1);
        self.watchdog.check_interval_secs = self.watchdog.check_interval_secs.max(1);

        if self.status.confirmation_window_secs < self.status.poll_interval_secs {
            tracing::warn!(
                "confirmation window ({}s) is shorter than the poll interval ({}s); clamping",
                self.status.confirmation_window_secs,
                self.status.poll_interval_secs
            );
            self.status.confirmation_window_secs = self.status.poll_interval_secs;
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.discord.bot_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.bot_token is required (or set DISCORD_TOKEN)".into(),
            ));
        }
        if self.status.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "status.endpoint is required (or set SPACE_ENDPOINT)".into(),
            ));
        }
        let endpoint = url::Url::parse(&self.status.endpoint).map_err(|e| {
            ConfigError::Validation(format!("status.endpoint is not a valid URL: {e}"))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "status.endpoint must be http(s), got {}",
                endpoint.scheme()
            )));
        }
        if self.discord.voice_channel_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.voice_channel_id is required (or set VOICE_CHANNEL_ID)".into(),
            ));
        }
        if self.discord.status_channel_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "discord.status_channel_id is required (or set STATUS_CHANNEL_ID)".into(),
            ));
        }
        Ok(())
    }

    pub fn command_channel_id(&self) -> &str {
        self.discord
            .command_channel_id
            .as_deref()
            .unwrap_or(&self.discord.voice_channel_id)
    }

    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.presence.state_dir).to_string())
    }

    pub fn avatar_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.presence.avatar_dir).to_string())
    }

    pub fn enabled_marker_path(&self) -> PathBuf {
        self.state_dir().join("enabled")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.status.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.status.request_timeout_secs)
    }

    pub fn confirmation_window(&self) -> Duration {
        Duration::from_secs(self.status.confirmation_window_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog.check_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.watchdog.reconnect_delay_secs)
    }
}
