// src/utils/http.rs

//! HTTP transport used by both harvesters.
//!
//! Harvesters only see the [`Fetcher`] trait. [`HttpFetcher`] is the
//! reqwest-backed implementation; it follows redirects and retries
//! transient failures so that any response handed back is final.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Request headers as ordered name/value pairs.
pub type Headers = Vec<(String, String)>;

/// Status codes worth another attempt.
const RETRY_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504, 522, 524];

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A response delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    /// Response body, empty for [`Fetcher::resolve`]
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into an error.
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AppError::status(self.url, self.status))
        }
    }
}

/// Page fetching collaborator.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and read the body.
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResponse>;

    /// Follow `url` to its final location without needing the body.
    async fn resolve(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResponse> {
        self.fetch(url, headers).await
    }
}

/// reqwest-backed [`Fetcher`] with retry and backoff.
pub struct HttpFetcher {
    client: Client,
    retry_times: u32,
    retry_backoff: Duration,
}

impl HttpFetcher {
    /// Create a configured fetcher.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        default_headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            retry_times: config.retry_times,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(1 << attempt.min(10))
            .min(MAX_BACKOFF)
    }

    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        read_body: bool,
    ) -> Result<FetchResponse> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if RETRY_STATUSES.contains(&status) && attempt < self.retry_times {
                        let wait = self.backoff(attempt);
                        attempt += 1;
                        log::warn!(
                            "Status {} from {}, retry {}/{} in {:?}",
                            status,
                            url,
                            attempt,
                            self.retry_times,
                            wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    let final_url = response.url().to_string();
                    let body = if read_body {
                        response.text().await?
                    } else {
                        String::new()
                    };
                    return Ok(FetchResponse {
                        url: final_url,
                        status,
                        body,
                    });
                }
                Err(error)
                    if attempt < self.retry_times && (error.is_timeout() || error.is_connect()) =>
                {
                    let wait = self.backoff(attempt);
                    attempt += 1;
                    log::warn!(
                        "Request to {} failed ({}), retry {}/{} in {:?}",
                        url,
                        error,
                        attempt,
                        self.retry_times,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResponse> {
        self.send(url, headers, true).await
    }

    async fn resolve(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResponse> {
        self.send(url, headers, false).await
    }
}
