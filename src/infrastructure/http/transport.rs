//! Reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};

use crate::domain::entities::TransferRequest;
use crate::domain::errors::{FetchError, TransferErrorKind};
use crate::domain::ports::Transport;
use crate::infrastructure::config::FetchConfig;

/// HTTP transport built on a shared `reqwest::Client`.
///
/// Dropping an in-flight `transfer` future aborts the request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport from fetch settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                FetchError::transfer(
                    TransferErrorKind::Connect,
                    format!("Failed to create HTTP client: {e}"),
                )
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(error: &reqwest::Error, fallback: TransferErrorKind) -> TransferErrorKind {
    if error.is_timeout() {
        TransferErrorKind::Timeout
    } else if error.is_connect() {
        TransferErrorKind::Connect
    } else {
        fallback
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn transfer(&self, request: TransferRequest) -> Result<Bytes, FetchError> {
        trace!(url = %request.url, "Sending request");

        let response = self
            .client
            .get(request.url)
            .headers(request.headers)
            .send()
            .await
            .map_err(|e| {
                FetchError::transfer(
                    classify(&e, TransferErrorKind::Connect),
                    format!("Request failed: {e}"),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::transfer(
                TransferErrorKind::Status(status.as_u16()),
                status.canonical_reason().unwrap_or("Unknown"),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            FetchError::transfer(
                classify(&e, TransferErrorKind::Body),
                format!("Failed to read body: {e}"),
            )
        })?;

        debug!(size = bytes.len(), "Transfer complete");
        Ok(bytes)
    }
}
