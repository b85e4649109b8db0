//! cityweather library
//!
//! Looks up current weather for a city through a disk cache: fresh entries
//! are served directly, stale ones are refreshed from the provider and kept
//! as a fallback when the provider is unreachable, rate limiting or failing.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod request_log;
pub mod resolver;
pub mod ui;

pub use config::Config;
pub use data::{FetchOutcome, NoDataReason, Provenance, UpstreamOutcome, WeatherReport};
pub use resolver::WeatherResolver;
