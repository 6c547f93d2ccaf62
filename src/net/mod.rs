//! Network utilities for the content API and image CDN.
//!
//! This module provides the HTTP transport used by content clients:
//!
//! - **HTTP Client**: A configured client with static headers and compression
//! - **Per-call timeouts**: Every request carries the timeout of its operation
//! - **Error normalization**: Transport, status and decode failures all become
//!   [`Error::Remote`](crate::Error::Remote) tagged with the attempted operation
//! - **JSON helpers**: Path-based extraction in [`json`]
//!
//! Requests are attempted exactly once; there is no retry loop here.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mangapack::error::RemoteOperation;
//! use mangapack::net::HttpClient;
//! use std::time::Duration;
//!
//! # async fn example() -> mangapack::Result<()> {
//! let client = HttpClient::new(&[("Referer".to_string(), "https://comick.io/".to_string())])?;
//! let body: serde_json::Value = client
//!     .get_json(
//!         "https://api.comick.io/chapter/abc",
//!         RemoteOperation::PageList,
//!         Duration::from_secs(10),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, RemoteOperation, Result};

pub mod json;

/// HTTP client wrapper with static headers and normalized errors.
///
/// Cloning is cheap; clones share the underlying connection pool.
///
/// # Examples
///
/// ```rust
/// use mangapack::net::HttpClient;
///
/// let client = HttpClient::new(&[("Accept".to_string(), "application/json".to_string())]);
/// assert!(client.is_ok());
///
/// let invalid = HttpClient::new(&[("Bad Header".to_string(), "x".to_string())]);
/// assert!(invalid.is_err());
/// ```
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a client sending `headers` with every request.
    ///
    /// # Errors
    ///
    /// * [`Error::Config`] - If a header name or value is invalid, or the
    ///   underlying client cannot be built
    pub fn new(headers: &[(String, String)]) -> Result<Self> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = name
                .parse::<HeaderName>()
                .map_err(|e| Error::config(format!("Invalid header name {:?}: {}", name, e)))?;
            let value = value
                .parse::<HeaderValue>()
                .map_err(|e| Error::config(format!("Invalid header value for {}: {}", name, e)))?;
            header_map.insert(name, value);
        }

        let inner = Client::builder()
            .default_headers(header_map)
            .pool_max_idle_per_host(10)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { inner })
    }

    /// Performs a single GET request and returns the response body.
    ///
    /// # Errors
    ///
    /// * [`Error::Remote`] - On connection failure, timeout, non-success
    ///   status, or an unreadable body
    pub async fn get(
        &self,
        url: &str,
        operation: RemoteOperation,
        timeout: Duration,
    ) -> Result<Bytes> {
        debug!(%url, %operation, "GET");

        let response = self
            .inner
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::remote(operation, format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::remote(
                operation,
                format!("HTTP {} from {}", status, url),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::remote(operation, format!("Failed to read body of {}: {}", url, e)))
    }

    /// Performs a single GET request and deserializes the response as JSON.
    ///
    /// # Errors
    ///
    /// * All errors from [`get()`](HttpClient::get)
    /// * [`Error::Remote`] - If the body is not valid JSON for `T`
    pub async fn get_json<T>(
        &self,
        url: &str,
        operation: RemoteOperation,
        timeout: Duration,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.get(url, operation, timeout).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::remote(operation, format!("Invalid JSON from {}: {}", url, e)))
    }
}
