//! Blocking JSON fetch capability.

use std::time::Duration;

use serde_json::Value;

use crate::types::{C2dbError, C2dbResult};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("c2db-crawl/", env!("CARGO_PKG_VERSION"));

/// Something that can fetch and parse a JSON document by URL.
pub trait Fetch {
    /// Fetch the document at `url`.
    ///
    /// Transport failures are reported as [`C2dbError::Transport`] after
    /// the implementation has logged them.
    fn fetch(&self, url: &str) -> C2dbResult<Value>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &str) -> C2dbResult<Value> {
        (**self).fetch(url)
    }
}

/// HTTP fetcher wrapping a blocking reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> C2dbResult<Value> {
        tracing::debug!("GET {url}");

        let resp = self.client.get(url).send().map_err(|e| {
            tracing::error!("Request to {url} failed: {e}");
            C2dbError::Transport {
                url: url.to_string(),
                status: None,
                reason: e.to_string(),
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unknown status");
            tracing::error!("ERROR CODE {} for {url}", status.as_u16());
            tracing::error!("ERROR MESSAGE: {reason}");
            return Err(C2dbError::Transport {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: reason.to_string(),
            });
        }

        let body = resp.text().map_err(|e| {
            tracing::error!("Reading body of {url} failed: {e}");
            C2dbError::Transport {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: e.to_string(),
            }
        })?;

        parse_body(&body)
    }
}

/// Parse a response body. A blank body means "no document" and maps to null.
pub(crate) fn parse_body(body: &str) -> C2dbResult<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}
