//! Request audit log
//!
//! Every retry and every final decision about a lookup is reported as one
//! `RequestRecord`. Recording is fire-and-forget: sinks cannot fail.

use std::fmt;

/// One audit line about a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// City as the user typed it
    pub city: String,
    /// HTTP status involved, or 0 when no response was received
    pub status: u16,
    /// Where the answer came from, e.g. "api", "cache", "cache_expired"
    pub source: &'static str,
    /// Free-text detail
    pub note: String,
}

impl RequestRecord {
    pub fn new(city: &str, status: u16, source: &'static str, note: impl Into<String>) -> Self {
        Self {
            city: city.to_string(),
            status,
            source,
            note: note.into(),
        }
    }
}

impl fmt::Display for RequestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "City:{} | Status:{} | Source:{} | Note:{}",
            self.city, self.status, self.source, self.note
        )
    }
}

/// Sink for request records
pub trait RequestLog: Send + Sync {
    fn record(&self, record: RequestRecord);
}

/// Emits each record as a `tracing` event in the audit line format
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl RequestLog for TracingLog {
    fn record(&self, record: RequestRecord) {
        tracing::info!(target: "cityweather::request", "{}", record);
    }
}
