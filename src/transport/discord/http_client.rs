use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use base64::Engine;
use reqwest::{Method, Response, StatusCode, header::HeaderMap};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::Mutex;

use super::types::{API_BASE, EMBED_COLOR};
use crate::error::SinkError;

#[derive(Debug, Error)]
pub enum DiscordApiError {
    #[error("rate-limited on {route} (retry after {:.1}s)", retry_after.as_secs_f64())]
    RateLimited { route: String, retry_after: Duration },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl DiscordApiError {
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    pub fn into_sink_error(self, operation: &'static str) -> SinkError {
        match self {
            Self::RateLimited { retry_after, .. } => SinkError::RateLimited { retry_after },
            Self::Status { status, body } => SinkError::Rejected {
                operation,
                message: format!("HTTP {status}: {body}"),
            },
            Self::Request(message) | Self::Malformed(message) => SinkError::Unavailable(message),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, DiscordApiError>;

#[derive(Debug, Clone)]
struct RateLimitBucket {
    remaining: u32,
    reset_at: f64,
}

/// Discord REST client with per-route rate-limit tracking.
///
/// Exhausted buckets fail fast with [`DiscordApiError::RateLimited`] rather
/// than sleeping, so callers decide when to retry.
pub struct DiscordHttpClient {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    buckets: Arc<Mutex<HashMap<String, RateLimitBucket>>>,
    global_reset_at: Arc<Mutex<Option<f64>>>,
}

impl DiscordHttpClient {
    pub fn new(bot_token: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build Discord HTTP client")?;
        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            bot_token: bot_token.into(),
            buckets: Arc::new(Mutex::new(HashMap::new())),
            global_reset_at: Arc::new(Mutex::new(None)),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn get_current_user(&self) -> ApiResult<Value> {
        let url = format!("{}/users/@me", self.base_url);
        self.request_json(Method::GET, &url, None).await
    }

    pub async fn get_gateway_bot(&self) -> ApiResult<Value> {
        let url = format!("{}/gateway/bot", self.base_url);
        self.request_json(Method::GET, &url, None).await
    }

    pub async fn get_channel(&self, channel_id: &str) -> ApiResult<Value> {
        let url = format!("{}/channels/{channel_id}", self.base_url);
        self.request_json(Method::GET, &url, None).await
    }

    /// Sets the bot's own nickname in `guild_id`.
    pub async fn modify_current_member_nick(&self, guild_id: &str, nick: &str) -> ApiResult<()> {
        let url = format!("{}/guilds/{guild_id}/members/@me", self.base_url);
        self.request(Method::PATCH, &url, Some(json!({ "nick": nick })))
            .await
            .map(|_| ())
    }

    pub async fn modify_channel_name(&self, channel_id: &str, name: &str) -> ApiResult<()> {
        let url = format!("{}/channels/{channel_id}", self.base_url);
        self.request(Method::PATCH, &url, Some(json!({ "name": name })))
            .await
            .map(|_| ())
    }

    /// Uploads `image` (PNG) as the bot's avatar.
    pub async fn modify_current_user_avatar(&self, image: &[u8]) -> ApiResult<()> {
        let url = format!("{}/users/@me", self.base_url);
        let body = json!({ "avatar": avatar_data_uri(image) });
        self.request(Method::PATCH, &url, Some(body)).await.map(|_| ())
    }

    pub async fn modify_current_user_username(&self, username: &str) -> ApiResult<()> {
        let url = format!("{}/users/@me", self.base_url);
        self.request(Method::PATCH, &url, Some(json!({ "username": username })))
            .await
            .map(|_| ())
    }

    pub async fn send_embed(
        &self,
        channel_id: &str,
        title: &str,
        description: &str,
        fields: &[(&str, &str)],
    ) -> ApiResult<()> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let fields = fields
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value, "inline": false }))
            .collect::<Vec<_>>();
        let embed = json!({
            "title": title,
            "description": description,
            "color": EMBED_COLOR,
            "fields": fields,
        });
        self.request(Method::POST, &url, Some(json!({ "embeds": [embed] })))
            .await
            .map(|_| ())
    }

    async fn request_json(&self, method: Method, url: &str, body: Option<Value>) -> ApiResult<Value> {
        let response = self.request(method, url, body).await?;
        response
            .json()
            .await
            .map_err(|error| DiscordApiError::Malformed(error.to_string()))
    }

    async fn request(&self, method: Method, url: &str, body: Option<Value>) -> ApiResult<Response> {
        let route_key = Self::bucket_key_from_url(url);
        self.check_limits(&route_key).await?;

        let mut request_builder = self
            .client
            .request(method.clone(), url)
            .header("Authorization", format!("Bot {}", self.bot_token));
        if let Some(payload) = body {
            request_builder = request_builder.json(&payload);
        }

        let response = request_builder.send().await.map_err(|error| {
            DiscordApiError::Request(format!("{} {url}: {error}", method.as_str()))
        })?;

        self.update_bucket_from_headers(&route_key, response.headers())
            .await;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let is_global = Self::is_global_limit(response.headers());
            let retry_after = Self::parse_retry_after(response.headers())
                .unwrap_or_else(|| Duration::from_secs(1));
            self.record_429(is_global, retry_after, &route_key).await;
            return Err(DiscordApiError::RateLimited {
                route: route_key,
                retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("<failed to read response body: {error}>"));
            return Err(DiscordApiError::Status { status, body });
        }

        Ok(response)
    }

    fn parse_header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u32>().ok())
    }

    fn parse_header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<f64>().ok())
    }

    fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
        let seconds = Self::parse_header_f64(headers, "Retry-After")?;
        if !seconds.is_finite() || seconds <= 0.0 {
            return Some(Duration::from_secs(0));
        }
        Some(Duration::from_secs_f64(seconds))
    }

    fn is_global_limit(headers: &HeaderMap) -> bool {
        headers
            .get("X-RateLimit-Global")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    fn now_unix_timestamp() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    fn bucket_key_from_url(url: &str) -> String {
        let path = reqwest::Url::parse(url)
            .map_or_else(|_| url.to_string(), |parsed| parsed.path().to_string());
        let path_without_api_prefix = path
            .strip_prefix("/api/v10")
            .map_or(path.as_str(), |stripped| stripped);

        let normalized = path_without_api_prefix
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if segment.chars().all(|character| character.is_ascii_digit()) {
                    "{id}".to_string()
                } else {
                    segment.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("/");

        format!("/{normalized}")
    }

    async fn check_limits(&self, route_key: &str) -> ApiResult<()> {
        let now = Self::now_unix_timestamp();
        let global_wait = {
            let global_guard = self.global_reset_at.lock().await;
            global_guard.and_then(|reset_at| (reset_at > now).then_some(reset_at - now))
        };
        let route_wait = {
            let buckets = self.buckets.lock().await;
            buckets.get(route_key).and_then(|bucket| {
                (bucket.remaining == 0 && bucket.reset_at > now).then_some(bucket.reset_at - now)
            })
        };

        match global_wait.into_iter().chain(route_wait).reduce(f64::max) {
            Some(wait_secs) => Err(DiscordApiError::RateLimited {
                route: route_key.to_string(),
                retry_after: Duration::from_secs_f64(wait_secs),
            }),
            None => Ok(()),
        }
    }

    async fn record_429(&self, is_global: bool, retry_after: Duration, route_key: &str) {
        let reset_at = Self::now_unix_timestamp() + retry_after.as_secs_f64();
        if is_global {
            let mut global = self.global_reset_at.lock().await;
            *global = Some(reset_at);
        } else {
            let mut buckets = self.buckets.lock().await;
            buckets.insert(
                route_key.to_string(),
                RateLimitBucket {
                    remaining: 0,
                    reset_at,
                },
            );
        }
    }

    async fn update_bucket_from_headers(&self, route_key: &str, headers: &HeaderMap) {
        let remaining = Self::parse_header_u32(headers, "X-RateLimit-Remaining");
        let reset_at = Self::parse_header_f64(headers, "X-RateLimit-Reset");

        if let (Some(remaining), Some(reset_at)) = (remaining, reset_at) {
            let mut buckets = self.buckets.lock().await;
            buckets.insert(
                route_key.to_string(),
                RateLimitBucket {
                    remaining,
                    reset_at,
                },
            );
        }
    }
}

fn avatar_data_uri(image: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(image)
    )
}
