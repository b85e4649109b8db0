//! Core data models for cityweather
//!
//! This module contains the types exchanged between the weather client, the
//! resolver and the presentation layer: what the provider answered, what the
//! resolver decided, and a typed summary of the opaque provider payload.

pub mod weather;

pub use weather::{WeatherClient, WeatherError, WeatherProvider};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Result of asking the provider for a city's weather
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    /// HTTP 200 with a JSON body
    Success(Value),
    /// Any non-200, non-429 status; never retried
    HttpError(u16),
    /// Retries exhausted and the last attempt was answered with 429; carries
    /// that attempt's `Retry-After` hint
    RateLimited(Option<Duration>),
    /// Retries exhausted on transport failures
    Unreachable,
    /// HTTP 200 whose body could not be read as JSON
    InvalidPayload(String),
}

/// How a served report was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Fetched from the provider just now
    Api,
    /// Fresh cache entry; the provider was not called
    Cache,
    /// Stale cache served because the provider was unreachable
    CacheExpired,
    /// Stale cache served because the provider rate-limited us
    CacheRateLimited,
    /// Stale cache served because the provider returned a 5xx
    CacheServerError,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Api => "api",
            Provenance::Cache => "cache",
            Provenance::CacheExpired => "cache_expired",
            Provenance::CacheRateLimited => "cache_rate_limited",
            Provenance::CacheServerError => "cache_server_error",
        }
    }

    /// Whether this report is stale data standing in for a failed fetch
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Provenance::CacheExpired | Provenance::CacheRateLimited | Provenance::CacheServerError
        )
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why no weather could be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoDataReason {
    /// 401 from the provider
    InvalidCredentials,
    /// 404 from the provider
    NotFound,
    /// Retries exhausted on a final 429 and nothing cached
    RateLimited,
    /// Provider unreachable and nothing cached
    Unreachable,
    /// 5xx from the provider and nothing cached
    ServerError(u16),
    /// Any other unexpected status
    Http(u16),
    /// 200 with an unreadable body
    InvalidPayload,
}

impl NoDataReason {
    /// HTTP status recorded in the request log for this reason
    pub fn status(&self) -> u16 {
        match self {
            NoDataReason::InvalidCredentials => 401,
            NoDataReason::NotFound => 404,
            NoDataReason::RateLimited => 429,
            NoDataReason::Unreachable => 0,
            NoDataReason::ServerError(code) | NoDataReason::Http(code) => *code,
            NoDataReason::InvalidPayload => 200,
        }
    }
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::InvalidCredentials => f.write_str("invalid credentials"),
            NoDataReason::NotFound => f.write_str("not found"),
            NoDataReason::RateLimited => f.write_str("rate limited"),
            NoDataReason::Unreachable => f.write_str("unreachable"),
            NoDataReason::ServerError(code) => write!(f, "server error {}", code),
            NoDataReason::Http(code) => write!(f, "http {}", code),
            NoDataReason::InvalidPayload => f.write_str("invalid payload"),
        }
    }
}

/// Weather that can be shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    /// City as the user typed it
    pub city: String,
    pub provenance: Provenance,
    /// Provider document, verbatim
    pub payload: Value,
    /// When the payload was fetched from the provider
    pub fetched_at: DateTime<Utc>,
}

impl WeatherReport {
    pub fn summary(&self) -> WeatherSummary {
        WeatherSummary::from_payload(&self.payload)
    }
}

/// Final answer for one lookup
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Served(WeatherReport),
    NoData { city: String, reason: NoDataReason },
}

impl FetchOutcome {
    pub fn city(&self) -> &str {
        match self {
            FetchOutcome::Served(report) => &report.city,
            FetchOutcome::NoData { city, .. } => city,
        }
    }

    /// Label identifying the outcome, e.g. "api" or "no_data"
    pub fn tag(&self) -> &'static str {
        match self {
            FetchOutcome::Served(report) => report.provenance.as_str(),
            FetchOutcome::NoData { .. } => "no_data",
        }
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        match self {
            FetchOutcome::Served(report) => Some(report),
            FetchOutcome::NoData { .. } => None,
        }
    }

    pub fn provenance(&self) -> Option<Provenance> {
        self.report().map(|r| r.provenance)
    }
}

/// The handful of provider fields the presentation layer shows
///
/// The payload is otherwise opaque; fields missing from it are simply `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSummary {
    /// Provider's canonical location name
    pub name: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PayloadView {
    name: Option<String>,
    #[serde(default)]
    sys: SysView,
    #[serde(default)]
    main: MainView,
    #[serde(default)]
    weather: Vec<ConditionView>,
    #[serde(default)]
    wind: WindView,
}

#[derive(Debug, Default, Deserialize)]
struct SysView {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MainView {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionView {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WindView {
    speed: Option<f64>,
}

impl WeatherSummary {
    /// Extracts the summary fields from a provider document
    ///
    /// A payload with an unexpected shape yields an empty summary.
    pub fn from_payload(payload: &Value) -> Self {
        let view = PayloadView::deserialize(payload).unwrap_or_default();
        Self {
            name: view.name.filter(|n| !n.is_empty()),
            country: view.sys.country,
            description: view.weather.into_iter().find_map(|w| w.description),
            temperature: view.main.temp,
            feels_like: view.main.feels_like,
            humidity: view.main.humidity,
            wind_speed: view.wind.speed,
        }
    }
}
