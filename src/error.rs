use std::time::Duration;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for Glider.
///
/// Each subsystem defines its own error variant. Tick and event boundaries
/// match on these to decide whether a failure is retried next cycle or only
/// logged; wiring code continues to use `anyhow::Result` for context chains.
#[derive(Debug, Error)]
pub enum GliderError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Status feed ─────────────────────────────────────────────────────
    #[error("status feed: {0}")]
    Fetch(#[from] FetchError),

    // ── Presence surface ────────────────────────────────────────────────
    #[error("presence: {0}")]
    Sink(#[from] SinkError),

    // ── Voice membership ────────────────────────────────────────────────
    #[error("voice: {0}")]
    Voice(#[from] VoiceError),

    // ── Transport / Gateway ─────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Status feed errors ──────────────────────────────────────────────────────

/// A poll that produced no observation. Never fatal: the tick is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("endpoint answered with HTTP {0}")]
    Status(u16),

    #[error("malformed status document: {0}")]
    Malformed(String),
}

// ─── Presence sink errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SinkError {
    /// Platform throttling. The affected field is retried on the next cycle.
    #[error("rate-limited (retry after {}s)", retry_after.as_secs_f64())]
    RateLimited { retry_after: Duration },

    /// The platform refused the edit (missing member, missing channel,
    /// permissions). The field stays stale until the next change.
    #[error("{operation} rejected: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

impl SinkError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

// ─── Voice errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("channel {0} not found")]
    ChannelNotFound(String),

    #[error("channel {0} is not a voice channel")]
    NotVoiceChannel(String),

    #[error("gateway: {0}")]
    Gateway(String),
}

// ─── Transport errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("gateway: {0}")]
    Gateway(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GliderError>;
