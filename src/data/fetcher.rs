//! Network retrieval of the weather document
//!
//! A `Fetcher` performs exactly one request per call. It never retries and
//! never looks at the payload; retry policy belongs to the poll loop and
//! payload validation to the presenter.

use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::ResourceKey;

/// Errors that can occur while fetching the weather document
#[derive(Debug, Error)]
pub enum FetchError {
    /// The connect or read timeout elapsed
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server returned status {0}")]
    Status(StatusCode),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e)
        } else {
            FetchError::Request(e)
        }
    }
}

/// Retrieves the raw bytes of the remote document
pub trait Fetcher: Send + Sync + 'static {
    /// Performs a single bounded-time retrieval
    fn fetch(
        &self,
        key: &ResourceKey,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Fetcher backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests give up after the given timeouts
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(FetchError::Request)?;
        Ok(Self { client })
    }

    /// Create a new HttpFetcher with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, key: &ResourceKey) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(&key.endpoint)
            .query(&key.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
