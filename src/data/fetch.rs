//! HTTP document fetching.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::{AppError, ExtractError};

/// Extra request headers for one document (cookies, `Accept`, API keys).
pub type RequestHeaders = BTreeMap<String, String>;

/// Retrieves documents by URL.
///
/// Implementations must be shareable across source tasks.
pub trait Fetcher: Send + Sync {
    /// Body decoded as text.
    fn fetch(&self, url: &str, headers: &RequestHeaders) -> Result<String, ExtractError>;

    /// Body as raw bytes (PDFs).
    fn fetch_raw(&self, url: &str, headers: &RequestHeaders) -> Result<Vec<u8>, ExtractError>;
}

/// Blocking `reqwest` client with a fixed user agent and per-request timeout.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn send(&self, url: &str, headers: &RequestHeaders) -> Result<reqwest::blocking::Response, ExtractError> {
        let resp = self
            .client
            .get(url)
            .headers(header_map(url, headers)?)
            .send()
            .map_err(|e| ExtractError::fetch(url, e))?;

        let status = resp.status();
        debug!(url, %status, "fetched");
        if !status.is_success() {
            return Err(ExtractError::fetch(url, format!("status {status}")));
        }
        Ok(resp)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, headers: &RequestHeaders) -> Result<String, ExtractError> {
        self.send(url, headers)?
            .text()
            .map_err(|e| ExtractError::fetch(url, format!("failed to read body: {e}")))
    }

    fn fetch_raw(&self, url: &str, headers: &RequestHeaders) -> Result<Vec<u8>, ExtractError> {
        self.send(url, headers)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ExtractError::fetch(url, format!("failed to read body: {e}")))
    }
}

fn header_map(url: &str, headers: &RequestHeaders) -> Result<HeaderMap, ExtractError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ExtractError::fetch(url, format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ExtractError::fetch(url, format!("invalid header value for '{name}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
