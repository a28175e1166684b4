// src/utils/http.rs

//! HTTP client utilities.
//!
//! Every request goes through the shared [`RateLimiter`]; transient failures
//! are retried here and never surface past this module unless retries run out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;
use crate::utils::credentials::SessionCookie;
use crate::utils::limiter::RateLimiter;

/// Anything that can return the raw body of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the raw bytes at `url`.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Retry schedule for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// Delay before retry number `retry` (0-based): base * 2^retry, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// How a response status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Transient,
    Forbidden,
    NotFound,
    Unexpected,
}

/// Classify a final (post-redirect) response status.
pub fn classify_status(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        200..=299 => StatusClass::Success,
        401 | 403 => StatusClass::Forbidden,
        408 | 429 => StatusClass::Transient,
        400..=499 => StatusClass::NotFound,
        500..=599 => StatusClass::Transient,
        _ => StatusClass::Unexpected,
    }
}

enum Attempt {
    Done(Vec<u8>),
    Transient(String),
    Fatal(AppError),
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(
    config: &HttpConfig,
    cookie: Option<&SessionCookie>,
) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = cookie {
        let mut value = HeaderValue::from_str(&cookie.header_value())
            .map_err(|e| AppError::config(format!("cookie is not a valid header value: {e}")))?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Rate-limited, retrying HTTP client for the source site.
pub struct HttpClient {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(
        config: &HttpConfig,
        cookie: Option<&SessionCookie>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        Ok(Self::from_client(
            create_async_client(config, cookie)?,
            limiter,
            RetryPolicy::from_config(config),
        ))
    }

    /// Wrap an already configured client.
    pub fn from_client(
        client: reqwest::Client,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            limiter,
            retry,
        }
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) if is_transient(&e) => return Attempt::Transient(e.to_string()),
            Err(e) => return Attempt::Fatal(AppError::unreachable(url.as_str(), e)),
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => match response.bytes().await {
                Ok(bytes) => Attempt::Done(bytes.to_vec()),
                Err(e) => Attempt::Transient(format!("reading body: {e}")),
            },
            StatusClass::Transient => Attempt::Transient(format!("HTTP {status}")),
            StatusClass::Forbidden => Attempt::Fatal(AppError::forbidden(
                url.as_str(),
                format!("HTTP {status}; a session cookie may be required"),
            )),
            StatusClass::NotFound => {
                Attempt::Fatal(AppError::not_found(url.as_str(), format!("HTTP {status}")))
            }
            StatusClass::Unexpected => Attempt::Fatal(AppError::unreachable(
                url.as_str(),
                format!("unexpected HTTP {status}"),
            )),
        }
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let mut retry = 0;
        loop {
            self.limiter.acquire().await;
            match self.attempt(url).await {
                Attempt::Done(bytes) => {
                    log::debug!("Fetched {} ({} bytes)", url, bytes.len());
                    return Ok(bytes);
                }
                Attempt::Fatal(e) => return Err(e),
                Attempt::Transient(message) if retry < self.retry.max_retries => {
                    let delay = self.retry.delay_for(retry);
                    retry += 1;
                    log::debug!(
                        "Transient failure for {} ({}); retry {}/{} in {:?}",
                        url,
                        message,
                        retry,
                        self.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Attempt::Transient(message) => {
                    return Err(AppError::unreachable(
                        url.as_str(),
                        format!("{message} (after {retry} retries)"),
                    ));
                }
            }
        }
    }
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}
