//! Search API client
//!
//! One blocking POST per report. No retries, no pagination.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::types::{ReportError, Result};

/// Anything that can answer an aggregation request
pub trait SearchBackend {
    /// Short description for log lines
    fn describe(&self) -> String;

    /// Run the query.
    ///
    /// `Ok(None)` means the service answered with a non-success status;
    /// the details have already been logged.
    fn search(&self, body: &Value) -> Result<Option<Value>>;
}

/// reqwest-backed client for an Elasticsearch-compatible `_search` endpoint
pub struct HttpSearchClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpSearchClient {
    pub fn new(endpoint: &str, index: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jobhours/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReportError::Http(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            url: search_url(endpoint, index),
        })
    }

    /// Wrap a preconfigured reqwest client
    #[cfg(test)]
    fn with_client(client: reqwest::blocking::Client, url: String) -> Self {
        Self { client, url }
    }

    #[cfg(test)]
    fn url(&self) -> &str {
        &self.url
    }
}

/// `{endpoint}/{index}/_search`, tolerating a trailing slash on the endpoint
pub fn search_url(endpoint: &str, index: &str) -> String {
    format!(
        "{}/{}/_search",
        endpoint.trim_end_matches('/'),
        index.trim_matches('/')
    )
}

impl SearchBackend for HttpSearchClient {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn search(&self, body: &Value) -> Result<Option<Value>> {
        debug!(url = %self.url, "sending search request");

        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .map_err(|e| ReportError::Http(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ReportError::Http(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!(
                url = %self.url,
                status = status.as_u16(),
                body = %text,
                "search request failed"
            );
            return Ok(None);
        }

        info!(url = %self.url, bytes = text.len(), "search request succeeded");
        let value: Value = serde_json::from_str(&text)?;
        Ok(Some(value))
    }
}
