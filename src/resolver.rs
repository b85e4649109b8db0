//! Cache-or-fetch decision engine
//!
//! `WeatherResolver::resolve` answers one lookup. A fresh cache entry is
//! served as-is. Otherwise the provider is asked, and its answer is combined
//! with whatever stale entry exists:
//!
//! | provider answer | no cache                 | stale cache          |
//! |-----------------|--------------------------|----------------------|
//! | 200 + JSON      | cache it, `Api`          | cache it, `Api`      |
//! | 401             | invalid credentials      | same                 |
//! | 404             | not found                | same                 |
//! | 5xx             | server error N           | `CacheServerError`   |
//! | other status    | http N                   | same                 |
//! | 429 exhausted   | rate limited             | `CacheRateLimited`   |
//! | unreachable     | unreachable              | `CacheExpired`       |
//! | unreadable body | invalid payload          | same                 |
//!
//! Only transient failures fall back to stale data. A credential error or an
//! unknown city served from cache would hide a problem the user has to fix.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{derive_key, CacheEntry, CacheRead, CacheStore};
use crate::data::{
    FetchOutcome, NoDataReason, Provenance, UpstreamOutcome, WeatherProvider, WeatherReport,
};
use crate::request_log::{RequestLog, RequestRecord};

/// Resolves city lookups against the cache and the provider
pub struct WeatherResolver<P> {
    cache: CacheStore,
    provider: P,
    log: Arc<dyn RequestLog>,
}

impl<P: WeatherProvider> WeatherResolver<P> {
    pub fn new(cache: CacheStore, provider: P, log: Arc<dyn RequestLog>) -> Self {
        Self {
            cache,
            provider,
            log,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Produces the outcome for `city`
    ///
    /// Never fails: storage problems degrade to cache misses and provider
    /// problems become fallbacks or `NoData`. Exactly one request record is
    /// logged for the final decision.
    pub async fn resolve(&self, city: &str) -> FetchOutcome {
        let key = derive_key(city);

        let stale = match self.cache.read(&key) {
            CacheRead::Fresh(entry) => {
                self.log
                    .record(RequestRecord::new(city, 200, "cache", "served from cache"));
                return served(city, Provenance::Cache, entry);
            }
            CacheRead::Stale(entry) => Some(entry),
            CacheRead::Absent => None,
        };

        let upstream = self.provider.fetch(city).await;
        debug!(city, key = %key, has_cache = stale.is_some(), ?upstream, "provider answered");

        match upstream {
            UpstreamOutcome::Success(payload) => {
                let fetched_at = Utc::now();
                self.cache.write_at(&key, &payload, fetched_at);
                self.log
                    .record(RequestRecord::new(city, 200, "api", "fetched and cached"));
                FetchOutcome::Served(WeatherReport {
                    city: city.to_string(),
                    provenance: Provenance::Api,
                    payload,
                    fetched_at,
                })
            }
            UpstreamOutcome::HttpError(401) => {
                self.no_data(city, NoDataReason::InvalidCredentials, "invalid api key")
            }
            UpstreamOutcome::HttpError(404) => {
                self.no_data(city, NoDataReason::NotFound, "city not found")
            }
            UpstreamOutcome::HttpError(status) if (500..600).contains(&status) => match stale {
                Some(entry) => self.fallback(
                    city,
                    status,
                    Provenance::CacheServerError,
                    "server error, served expired cache",
                    entry,
                ),
                None => self.no_data(city, NoDataReason::ServerError(status), "server error"),
            },
            UpstreamOutcome::HttpError(status) => {
                self.no_data(city, NoDataReason::Http(status), "other error")
            }
            UpstreamOutcome::RateLimited(_) => match stale {
                Some(entry) => self.fallback(
                    city,
                    429,
                    Provenance::CacheRateLimited,
                    "rate limited, served expired cache",
                    entry,
                ),
                None => self.no_data(city, NoDataReason::RateLimited, "rate limited"),
            },
            UpstreamOutcome::Unreachable => match stale {
                Some(entry) => self.fallback(
                    city,
                    0,
                    Provenance::CacheExpired,
                    "API unreachable, served expired cache",
                    entry,
                ),
                None => self.no_data(city, NoDataReason::Unreachable, "API unreachable"),
            },
            UpstreamOutcome::InvalidPayload(detail) => self.no_data(
                city,
                NoDataReason::InvalidPayload,
                &format!("failed parsing response: {}", detail),
            ),
        }
    }

    fn fallback(
        &self,
        city: &str,
        status: u16,
        provenance: Provenance,
        note: &str,
        entry: CacheEntry,
    ) -> FetchOutcome {
        self.log
            .record(RequestRecord::new(city, status, provenance.as_str(), note));
        served(city, provenance, entry)
    }

    fn no_data(&self, city: &str, reason: NoDataReason, note: &str) -> FetchOutcome {
        self.log
            .record(RequestRecord::new(city, reason.status(), "api", note));
        FetchOutcome::NoData {
            city: city.to_string(),
            reason,
        }
    }
}

fn served(city: &str, provenance: Provenance, entry: CacheEntry) -> FetchOutcome {
    FetchOutcome::Served(WeatherReport {
        city: city.to_string(),
        provenance,
        payload: entry.payload,
        fetched_at: entry.stored_at,
    })
}
