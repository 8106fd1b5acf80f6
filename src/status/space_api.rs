use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use super::{Observation, OccupancyState, StatusSource};
use crate::error::FetchError;

/// SpaceAPI-style endpoint:
/// `{ "state": { "open": bool }, "sensors": { "people_now_present": [ { "value": n } ] } }`.
pub struct SpaceApiSource {
    client: reqwest::Client,
    endpoint: String,
}

impl SpaceApiSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build status endpoint HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch(&self) -> std::result::Result<Observation, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(map_request_error)?;
        parse_status_document(&body)
    }
}

impl StatusSource for SpaceApiSource {
    fn name(&self) -> &str {
        "spaceapi"
    }

    fn poll<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<Observation, FetchError>> + Send + 'a>>
    {
        Box::pin(self.fetch())
    }
}

fn map_request_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Request(error.to_string())
    }
}

/// Parses a status document. Only a missing/invalid top level or
/// `state.open` is an error; a missing or garbled occupancy sensor yields a
/// count of zero.
pub fn parse_status_document(raw: &[u8]) -> std::result::Result<Observation, FetchError> {
    let document: Value =
        serde_json::from_slice(raw).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let open_flag = document
        .get("state")
        .and_then(|state| state.get("open"))
        .ok_or_else(|| FetchError::Malformed("missing state.open".into()))?;

    let state = match open_flag {
        Value::Bool(true) => OccupancyState::Open,
        Value::Bool(false) => OccupancyState::Closed,
        Value::Null => OccupancyState::Unknown,
        other => {
            return Err(FetchError::Malformed(format!(
                "state.open is not a boolean: {other}"
            )));
        }
    };

    Ok(Observation::new(state, Some(people_now_present(&document))))
}

fn people_now_present(document: &Value) -> u32 {
    document
        .get("sensors")
        .and_then(|sensors| sensors.get("people_now_present"))
        .and_then(Value::as_array)
        .and_then(|readings| readings.first())
        .and_then(|reading| reading.get("value"))
        .and_then(parse_count)
        .unwrap_or(0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_count(value: &Value) -> Option<u32> {
    let raw = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    Some(raw.trunc().min(f64::from(u32::MAX)) as u32)
}
