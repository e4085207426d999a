//! Peer transport: one bounded-timeout JSON POST per call.
//!
//! A call never fails to the caller. Whatever goes wrong (slow peer, refused
//! connection, garbage body) comes back as a [`Sentinel`] in the peer's slot, so an
//! offline node looks the same to the aggregator as a node that answered.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AggregatorConfig;
use crate::error::{AggregatorError, Result};

pub const TIMEOUT_MESSAGE: &str = "Communication timed out";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentinelStatus {
    Timeout,
    Error,
}

/// Stand-in for a reply that could not be obtained: `{"status": ..., "error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentinel {
    pub status: SentinelStatus,
    pub error: String,
}

impl Sentinel {
    pub fn timeout() -> Self {
        Sentinel { status: SentinelStatus::Timeout, error: TIMEOUT_MESSAGE.to_string() }
    }

    /// `kind` names the failure class, e.g. `ConnectError`.
    pub fn error(kind: &str, message: impl std::fmt::Display) -> Self {
        Sentinel { status: SentinelStatus::Error, error: format!("{kind}: {message}") }
    }

    pub fn is_timeout(&self) -> bool {
        self.status == SentinelStatus::Timeout
    }

    /// Recognises a body that is itself a sentinel, e.g. a peer reporting its own error.
    pub fn from_body(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        if !object.contains_key("error") {
            return None;
        }
        serde_json::from_value(body.clone()).ok()
    }
}

/// Either the decoded peer payload or the sentinel that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PeerReply<T> {
    Ok(T),
    Err(Sentinel),
}

impl<T> PeerReply<T> {
    pub fn ok(&self) -> Option<&T> {
        match self {
            PeerReply::Ok(value) => Some(value),
            PeerReply::Err(_) => None,
        }
    }

    pub fn ok_mut(&mut self) -> Option<&mut T> {
        match self {
            PeerReply::Ok(value) => Some(value),
            PeerReply::Err(_) => None,
        }
    }

    pub fn sentinel(&self) -> Option<&Sentinel> {
        match self {
            PeerReply::Ok(_) => None,
            PeerReply::Err(sentinel) => Some(sentinel),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PeerReply::Ok(_))
    }
}

/// Decodes a raw reply into `T`. Sentinel-shaped bodies stay sentinels and bodies that
/// do not fit `T` become `DecodeError` sentinels.
pub fn decode_reply<T: DeserializeOwned>(reply: PeerReply<Value>) -> PeerReply<T> {
    match reply {
        PeerReply::Err(sentinel) => PeerReply::Err(sentinel),
        PeerReply::Ok(body) => {
            if let Some(sentinel) = Sentinel::from_body(&body) {
                return PeerReply::Err(sentinel);
            }
            match serde_json::from_value(body) {
                Ok(decoded) => PeerReply::Ok(decoded),
                Err(e) => PeerReply::Err(Sentinel::error("DecodeError", e)),
            }
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` as JSON to `url`, waiting at most `timeout` for the decoded reply.
    async fn post(&self, url: &str, body: &Value, timeout: Duration) -> PeerReply<Value>;
}

/// Typed decoding on top of [`Transport::post`].
#[async_trait]
pub trait TransportExt: Transport {
    async fn post_as<T: DeserializeOwned + Send>(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> PeerReply<T>;
}

#[async_trait]
impl<R: Transport + ?Sized> TransportExt for R {
    async fn post_as<T: DeserializeOwned + Send>(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> PeerReply<T> {
        decode_reply(self.post(url, body, timeout).await)
    }
}

/// HTTP transport backed by one pooled `reqwest` client. Connections are kept alive and
/// reused across every call made by the aggregator that owns it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(pool_max_idle_per_host: usize, pool_idle_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(pool_max_idle_per_host)
            .pool_idle_timeout(pool_idle_timeout)
            .build()
            .map_err(|e| AggregatorError::TransportError(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &AggregatorConfig) -> Result<Self> {
        Self::new(config.pool_max_idle_per_host, config.pool_idle_timeout())
    }

    async fn send(&self, url: &str, body: &Value) -> std::result::Result<Value, reqwest::Error> {
        self.client.post(url).json(body).send().await?.json::<Value>().await
    }
}

fn classify(e: &reqwest::Error) -> Sentinel {
    if e.is_timeout() {
        Sentinel::timeout()
    } else if e.is_connect() {
        Sentinel::error("ConnectError", e)
    } else if e.is_decode() {
        Sentinel::error("DecodeError", e)
    } else if e.is_body() {
        Sentinel::error("BodyError", e)
    } else if e.is_request() {
        Sentinel::error("RequestError", e)
    } else {
        Sentinel::error("TransportError", e)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: &Value, timeout: Duration) -> PeerReply<Value> {
        match tokio::time::timeout(timeout, self.send(url, body)).await {
            Ok(Ok(reply)) => PeerReply::Ok(reply),
            Ok(Err(e)) => {
                tracing::debug!(url, error = %e, "Peer call failed");
                PeerReply::Err(classify(&e))
            }
            Err(_) => {
                tracing::debug!(url, timeout_ms = timeout.as_millis() as u64, "Peer call timed out");
                PeerReply::Err(Sentinel::timeout())
            }
        }
    }
}
