//! Payload delivery and the retry loop around it.

pub mod retry;

pub use retry::{send_with_retry, Attempted, Exhausted, RetryContext, RetryPolicy};

use crate::core::config::DeliverySettings;
use crate::core::payload::Payload;
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Transport-level result of one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub status: u16,
    pub status_text: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("{0}")]
    Other(String),
}

impl DeliveryError {
    pub fn code(&self) -> &'static str {
        match self {
            DeliveryError::Transport { .. } => "FR-DELIVERY-001",
            DeliveryError::Timeout { .. } => "FR-DELIVERY-002",
            DeliveryError::Other(_) => "FR-DELIVERY-003",
        }
    }
}

/// Performs one HTTP POST of a JSON payload.
///
/// Any response the server sends back is a success; only transport
/// failures are errors.
#[async_trait]
pub trait DeliveryClient: Send + Sync + 'static {
    async fn post(
        &self,
        url: &str,
        payload: &Payload,
        headers: &IndexMap<String, String>,
    ) -> Result<DeliveryResponse, DeliveryError>;
}

#[derive(Clone)]
pub struct ReqwestDeliveryClient {
    http: reqwest::Client,
    timeout_ms: u64,
}

impl ReqwestDeliveryClient {
    pub fn new(settings: &DeliverySettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(ReqwestDeliveryClient {
            http,
            timeout_ms: settings.timeout_ms,
        })
    }
}

#[async_trait]
impl DeliveryClient for ReqwestDeliveryClient {
    async fn post(
        &self,
        url: &str,
        payload: &Payload,
        headers: &IndexMap<String, String>,
    ) -> Result<DeliveryResponse, DeliveryError> {
        let mut request = self.http.post(url).header(CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                tracing::debug!(url, header = %name, "ignoring endpoint Content-Type header");
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        let resp = request.json(payload).send().await.map_err(|source| {
            if source.is_timeout() {
                DeliveryError::Timeout {
                    url: url.to_string(),
                    timeout_ms: self.timeout_ms,
                }
            } else {
                DeliveryError::Transport {
                    url: url.to_string(),
                    source,
                }
            }
        })?;

        let status = resp.status();
        Ok(DeliveryResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
        })
    }
}
