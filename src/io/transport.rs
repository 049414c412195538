//! HTTP transport for the themeparks.wiki-shaped API
//!
//! Every request is a GET with a bounded timeout. The transport performs no
//! retries itself - retry policy belongs to the sync scheduler, which uses
//! `TransportError::is_retryable` to decide between backoff and isolation.

use crate::domain::EntityId;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Closed taxonomy of transport failures.
///
/// Only `Timeout`, `Connection` and 5xx `Http` are retryable; 4xx statuses
/// and undecodable payloads are permanent for the cycle that hit them.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP status {0}")]
    Http(u16),

    #[error("invalid JSON payload: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout(_) | TransportError::Connection(_) => true,
            TransportError::Http(status) => *status >= 500,
            TransportError::Decode(_) => false,
        }
    }
}

/// Seam between the scheduler and the network, so tests can drive sync
/// cycles without any HTTP stack behind them.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a relative API path (e.g. `/destinations`) and decode the
    /// response body as JSON.
    async fn fetch(&self, path: &str) -> Result<Value, TransportError>;
}

// Relative path builders for the endpoints the engine uses.

pub fn destinations_path() -> String {
    "/destinations".to_string()
}

pub fn children_path(id: &EntityId) -> String {
    format!("/entity/{}/children", id)
}

pub fn live_path(id: &EntityId) -> String {
    format!("/entity/{}/live", id)
}

/// Production transport backed by a pooled reqwest client
pub struct HttpTransport {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the client once for connection reuse; `base_url` has any
    /// trailing slash stripped so path concatenation stays predictable.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, path: &str) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "api_fetch");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(TransportError::Http(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| {
            // A connection dropped mid-body is transient; only a payload
            // that actually fails to parse is a permanent decode error
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else if e.is_decode() {
                TransportError::Decode(e.to_string())
            } else {
                TransportError::Connection(e.to_string())
            }
        })
    }
}
