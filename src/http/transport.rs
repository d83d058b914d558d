//! Transport seam
//!
//! The executor only needs "send this request, give me a response". Tests plug
//! in scripted transports; production uses [`ReqwestTransport`].

use super::request::{RawResponse, RequestSpec};
use crate::error::{Error, Result};
use crate::types::CompletionMode;
use async_trait::async_trait;
use std::time::Duration;

/// Sends one materialized request
///
/// Errors returned here are transport failures. A response with any status,
/// including 4xx and 5xx, is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestSpec, mode: CompletionMode) -> Result<RawResponse>;
}

/// Transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Wrap an existing client
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Build a client with the given user agent
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::new(client, timeout))
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestSpec, mode: CompletionMode) -> Result<RawResponse> {
        let req = request.to_request(&self.client, self.timeout)?;
        let response = self.client.execute(req).await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: request.timeout.unwrap_or(self.timeout).as_millis() as u64,
                }
            } else {
                Error::Transport(e)
            }
        })?;

        match mode {
            CompletionMode::ContentRead => RawResponse::read(response).await,
            CompletionMode::HeadersRead => Ok(RawResponse::deferred(response)),
        }
    }
}
