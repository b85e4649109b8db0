//! Weather provider HTTP client
//!
//! Fetches the current weather document for a city from an
//! OpenWeatherMap-compatible endpoint. Transport failures and `429` responses
//! are retried with exponential backoff (or the provider's `Retry-After`
//! hint); every other status is returned to the caller untouched.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::UpstreamOutcome;
use crate::config::{Config, Units};
use crate::request_log::{RequestLog, RequestRecord};

/// Errors that can occur when setting up the weather client
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Source of upstream weather documents
///
/// Implemented by `WeatherClient`; the resolver only depends on this trait so
/// it can be driven by scripted providers in tests.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, city: &str) -> UpstreamOutcome;
}

/// Client for fetching current weather from the provider
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_url: String,
    api_key: String,
    units: Units,
    lang: String,
    max_retries: u32,
    backoff_base: Duration,
    log: Arc<dyn RequestLog>,
}

impl WeatherClient {
    /// Creates a client from the runtime configuration
    ///
    /// Each HTTP attempt is bounded by `config.request_timeout`.
    pub fn new(config: &Config, log: Arc<dyn RequestLog>) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(client, config, log))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(client: Client, config: &Config, log: Arc<dyn RequestLog>) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            units: config.units,
            lang: config.lang.clone(),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            log,
        }
    }

    /// Delay before the retry that follows attempt number `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Issues one GET for `city`
    async fn send(&self, city: &str) -> Result<Response, reqwest::Error> {
        self.client
            .get(&self.api_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
    }

    /// Turns a non-retryable response into an outcome
    ///
    /// Fails only when the body of a 200 could not be received in full, which
    /// the caller retries like any other transport failure.
    async fn read_response(
        &self,
        city: &str,
        response: Response,
    ) -> Result<UpstreamOutcome, reqwest::Error> {
        let status = response.status();
        if status != StatusCode::OK {
            debug!(city, status = status.as_u16(), "provider returned an error status");
            return Ok(UpstreamOutcome::HttpError(status.as_u16()));
        }

        let body = response.bytes().await?;
        match serde_json::from_slice::<Value>(&body) {
            Ok(payload) => Ok(UpstreamOutcome::Success(payload)),
            Err(e) => {
                warn!(city, error = %e, "provider returned a body that is not JSON");
                Ok(UpstreamOutcome::InvalidPayload(e.to_string()))
            }
        }
    }

    /// Logs a failed attempt and returns the backoff before the next one
    fn transport_failure(&self, city: &str, attempt: u32, error: reqwest::Error) -> Duration {
        let error = error.without_url();
        warn!(city, attempt, error = %error, "weather request failed");
        self.log.record(RequestRecord::new(
            city,
            0,
            "api",
            format!("request failed: {}", error),
        ));
        self.backoff_delay(attempt)
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    /// Fetches the weather document for `city`
    ///
    /// Makes at most `max_retries` attempts. Returns `RateLimited` when the
    /// last attempt was answered with 429 and `Unreachable` when it failed at
    /// the transport level, including a 200 whose body was cut off.
    async fn fetch(&self, city: &str) -> UpstreamOutcome {
        let mut attempt = 0;
        // Some(hint) while the most recent attempt was rate limited
        let mut rate_limit: Option<Option<Duration>> = None;

        while attempt < self.max_retries {
            let delay = match self.send(city).await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let hint = parse_retry_after(response.headers());
                    let raw = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("none");
                    self.log.record(RequestRecord::new(
                        city,
                        429,
                        "api",
                        format!("429 Too Many Requests. Retry-After={}", raw),
                    ));
                    rate_limit = Some(hint);
                    hint.unwrap_or_else(|| self.backoff_delay(attempt))
                }
                Ok(response) => match self.read_response(city, response).await {
                    Ok(outcome) => return outcome,
                    Err(e) => {
                        rate_limit = None;
                        self.transport_failure(city, attempt, e)
                    }
                },
                Err(e) => {
                    rate_limit = None;
                    self.transport_failure(city, attempt, e)
                }
            };

            attempt += 1;
            if attempt < self.max_retries {
                debug!(city, attempt, delay_ms = delay.as_millis() as u64, "retrying weather request");
                tokio::time::sleep(delay).await;
            }
        }

        match rate_limit {
            Some(hint) => UpstreamOutcome::RateLimited(hint),
            None => UpstreamOutcome::Unreachable,
        }
    }
}

/// Reads a `Retry-After` header given in whole seconds
///
/// Zero, negative, non-numeric and HTTP-date values yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    (secs > 0).then(|| Duration::from_secs(secs))
}
