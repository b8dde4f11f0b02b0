//! HTTP retry wrapper shared by every source adapter and the classifier.

use super::HttpClientConfig;
use crate::resilience::{retry_with_policy, RetryConfig, RetryPolicy};
use crate::{Config, Error, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const ERROR_BODY_PREVIEW: usize = 400;

/// Issues requests with a bounded retry policy and maps HTTP statuses onto
/// [`Error`] variants the policy understands.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    service: String,
    policy: RetryPolicy,
    rate_limit_delay: Duration,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(
        service: impl Into<String>,
        http: &HttpClientConfig,
        policy: RetryPolicy,
        rate_limit_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(http.timeout)
            .connect_timeout(http.connect_timeout)
            .user_agent(&http.user_agent)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            service: service.into(),
            policy,
            rate_limit_delay,
            timeout: http.timeout,
        })
    }

    /// Build a fetcher for `service` with `max_attempts` for transient
    /// failures and the configured rate-limit budget.
    ///
    /// `max_attempts <= 1` disables retries entirely, 429 included.
    pub fn from_config(service: impl Into<String>, config: &Config, max_attempts: u32) -> Result<Self> {
        let rate_limit_delay = Duration::from_millis(config.http.rate_limit_delay_ms);
        let policy = if max_attempts <= 1 {
            RetryPolicy::no_retry()
        } else {
            RetryPolicy::new(
                RetryConfig::with_attempts(max_attempts),
                RetryConfig::rate_limited(rate_limit_delay, config.http.rate_limit_max_attempts),
            )
        };

        Self::new(service, &HttpClientConfig::from(config), policy, rate_limit_delay)
    }

    /// GET `url` with query `params`, retrying per policy
    pub async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        params: &[(&str, String)],
    ) -> Result<Response> {
        self.get_with_timeout(url, headers, params, None).await
    }

    /// GET with an explicit per-request timeout
    pub async fn get_with_timeout(
        &self,
        url: &str,
        headers: &HeaderMap,
        params: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> Result<Response> {
        debug!("{} GET {} {:?}", self.service, url, params);
        self.execute(url, || {
            let request = self
                .client
                .get(url)
                .headers(headers.clone())
                .query(params);
            match timeout {
                Some(timeout) => request.timeout(timeout),
                None => request,
            }
        })
        .await
    }

    /// POST a JSON body, retrying per policy
    pub async fn post_json<B: Serialize>(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> Result<Response> {
        debug!("{} POST {}", self.service, url);
        self.execute(url, || {
            self.client
                .post(url)
                .headers(headers.clone())
                .json(body)
        })
        .await
    }

    async fn execute<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let operation_name = format!("{} request", self.service);
        let build = &build;
        retry_with_policy(
            move || async move {
                let response = build().send().await.map_err(|e| self.send_error(url, e))?;
                self.check_status(response).await
            },
            &self.policy,
            &operation_name,
        )
        .await
    }

    fn send_error(&self, url: &str, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::NetworkTimeout {
                timeout: self.timeout,
                message: format!("{} request to {url} timed out", self.service),
            }
        } else {
            Error::Http(error)
        }
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        match code {
            401 => Err(Error::AuthenticationFailed(format!(
                "{} rejected the credentials ({status}): {}",
                self.service,
                body_preview(response).await
            ))),
            403 => Err(Error::AuthorizationDenied {
                resource: format!("{} ({})", self.service, response.url()),
            }),
            429 => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .map_or(self.rate_limit_delay, Duration::from_secs);
                Err(Error::RateLimitExceeded { retry_after })
            }
            500..=599 => Err(Error::ServiceUnavailable {
                service: self.service.clone(),
                reason: format!("HTTP {status}"),
            }),
            _ => Err(Error::Api {
                service: self.service.clone(),
                status: code,
                message: body_preview(response).await,
            }),
        }
    }
}

async fn body_preview(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(ERROR_BODY_PREVIEW)
        .collect()
}
