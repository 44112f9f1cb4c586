//! Fast acquisition: one plain HTTP GET.
//!
//! # Design Decisions
//! - Separate connect and total timeouts (a slow handshake fails early)
//! - Browser-like headers; many shops serve bots an error page
//! - Every non-2xx status is a retryable network failure
//! - Idle connections pooled per host and reused across requests

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::fetch::strategy::{AcquireFuture, AcquisitionStrategy};
use crate::fetch::{FetchError, StrategyKind};

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Lightweight HTTP strategy backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct FastFetch {
    client: reqwest::Client,
    timeout: Duration,
}

impl FastFetch {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.total_timeout())
            .pool_max_idle_per_host(config.pool_limit)
            .build()?;

        Ok(Self {
            client,
            timeout: config.total_timeout(),
        })
    }

    async fn get(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP {status}")));
        }

        response.text().await.map_err(|e| transport_error(e, timeout))
    }
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Network(error.without_url().to_string())
    }
}

impl AcquisitionStrategy for FastFetch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fast
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn attempt<'a>(&'a self, url: &'a Url, timeout: Duration) -> AcquireFuture<'a> {
        Box::pin(self.get(url, timeout))
    }
}
