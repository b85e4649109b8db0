//! Presentation of lookup outcomes
//!
//! Maps each outcome to user-facing copy and renders it either as plain text
//! or in the full-screen terminal view.

pub mod report_view;

use chrono::{DateTime, Local, Utc};
use std::io::{self, Write};

use crate::config::Units;
use crate::data::{FetchOutcome, NoDataReason, Provenance, WeatherReport};

pub use report_view::render as render_reports;

/// How prominently a notice should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

/// User-facing message for an outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Returns the message shown alongside an outcome
pub fn outcome_notice(outcome: &FetchOutcome) -> Notice {
    match outcome {
        FetchOutcome::Served(report) => match report.provenance {
            Provenance::Api => Notice::new(Severity::Info, "Live data from the weather service."),
            Provenance::Cache => Notice::new(Severity::Info, "Served from cache."),
            Provenance::CacheExpired => Notice::new(
                Severity::Warning,
                "API is unreachable; showing the latest cached data.",
            ),
            Provenance::CacheRateLimited => Notice::new(
                Severity::Warning,
                "Request rate limit reached; showing cached data.",
            ),
            Provenance::CacheServerError => Notice::new(
                Severity::Warning,
                "Server error; showing the latest cached data.",
            ),
        },
        FetchOutcome::NoData { reason, .. } => match reason {
            NoDataReason::InvalidCredentials => Notice::new(
                Severity::Danger,
                "Invalid API key. Please check your configuration.",
            ),
            NoDataReason::NotFound => Notice::new(
                Severity::Warning,
                "City not found. Please check the city name.",
            ),
            NoDataReason::RateLimited => Notice::new(
                Severity::Danger,
                "Rate limit reached and no cached data is available.",
            ),
            NoDataReason::Unreachable => Notice::new(
                Severity::Danger,
                "Service is unreachable and no cached data is available.",
            ),
            NoDataReason::ServerError(_) => Notice::new(
                Severity::Danger,
                "Server error occurred and no cached data is available.",
            ),
            NoDataReason::Http(status) => Notice::new(
                Severity::Danger,
                format!("Error fetching data: HTTP {}", status),
            ),
            NoDataReason::InvalidPayload => {
                Notice::new(Severity::Danger, "Error processing the received data.")
            }
        },
    }
}

/// Formats a timestamp in local time, e.g. "2024-07-15 14:05:09"
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Lines describing a served report: location, conditions and data age
pub fn report_lines(report: &WeatherReport, units: Units) -> Vec<String> {
    let summary = report.summary();
    let mut lines = Vec::new();

    let location = match (&summary.name, &summary.country) {
        (Some(name), Some(country)) => format!("{}, {}", name, country),
        (Some(name), None) => name.clone(),
        _ => report.city.clone(),
    };
    lines.push(location);

    let mut conditions = Vec::new();
    if let Some(description) = &summary.description {
        conditions.push(description.clone());
    }
    if let Some(temp) = summary.temperature {
        let mut temp_text = format!("{:.1}{}", temp, units.temperature_symbol());
        if let Some(feels) = summary.feels_like {
            temp_text.push_str(&format!(" (feels like {:.1}{})", feels, units.temperature_symbol()));
        }
        conditions.push(temp_text);
    }
    if !conditions.is_empty() {
        lines.push(conditions.join(", "));
    }

    let mut details = Vec::new();
    if let Some(humidity) = summary.humidity {
        details.push(format!("humidity {:.0}%", humidity));
    }
    if let Some(wind) = summary.wind_speed {
        details.push(format!("wind {:.1} {}", wind, units.speed_symbol()));
    }
    if !details.is_empty() {
        lines.push(details.join("  "));
    }

    lines.push(format!(
        "source: {}  updated {}",
        report.provenance,
        format_timestamp(report.fetched_at)
    ));
    lines
}

/// Writes one outcome as plain text
///
/// Served reports go to `out`; outcomes without data go to `err` as a single
/// line prefixed with the city.
pub fn write_plain<W: Write, E: Write>(
    out: &mut W,
    err: &mut E,
    outcome: &FetchOutcome,
    units: Units,
) -> io::Result<()> {
    let notice = outcome_notice(outcome);
    match outcome {
        FetchOutcome::Served(report) => {
            let mut lines = report_lines(report, units).into_iter();
            if let Some(headline) = lines.next() {
                writeln!(out, "{}", headline)?;
            }
            for line in lines {
                writeln!(out, "  {}", line)?;
            }
            if report.provenance.is_fallback() {
                writeln!(out, "  warning: {}", notice.message)?;
            }
        }
        FetchOutcome::NoData { city, .. } => {
            writeln!(err, "{}: {}", city, notice.message)?;
        }
    }
    Ok(())
}
