//! Configuration loading
//!
//! Builds one immutable `Config` from defaults, an optional TOML file, a
//! `.env` file and environment variables (in increasing priority). The value
//! is then handed to the cache store, the weather client and the resolver.

use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheStore;

/// Default OpenWeatherMap-compatible endpoint
pub const DEFAULT_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "cityweather.toml";

const DEFAULT_CACHE_TTL_SECS: u64 = 1800;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_SECS: f64 = 1.0;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for our schema
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A single setting has a value we cannot use
    #[error("{name} {reason}")]
    InvalidValue { name: String, reason: String },

    /// Validation found one or more problems
    #[error("Invalid config:\n - {}", .0.join("\n - "))]
    Invalid(Vec<String>),
}

/// Measurement system requested from the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    /// Kelvin and metres per second
    Standard,
}

impl Units {
    /// Value sent as the `units` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }

    pub fn speed_symbol(&self) -> &'static str {
        match self {
            Units::Metric | Units::Standard => "m/s",
            Units::Imperial => "mph",
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            other => Err(format!(
                "must be one of: metric, imperial, standard (got '{}')",
                other
            )),
        }
    }
}

/// Runtime configuration shared by every component
#[derive(Clone)]
pub struct Config {
    /// Provider endpoint
    pub api_url: String,
    /// Provider API key (secret)
    pub api_key: String,
    /// Age after which a cache entry is stale
    pub cache_ttl: Duration,
    /// Directory holding one JSON file per city
    pub cache_dir: PathBuf,
    /// Where log events are appended; stderr when unset
    pub log_file: Option<PathBuf>,
    pub units: Units,
    /// Provider locale, e.g. "en" or "fr"
    pub lang: String,
    /// Upper bound on HTTP attempts per lookup
    pub max_retries: u32,
    /// First retry delay; doubled on each further attempt
    pub backoff_base: Duration,
    /// Timeout applied to each HTTP attempt
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_dir: CacheStore::default_dir().unwrap_or_else(|| PathBuf::from("cache")),
            log_file: None,
            units: Units::default(),
            lang: "en".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_secs_f64(DEFAULT_BACKOFF_BASE_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field(
                "api_key",
                &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" },
            )
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_dir", &self.cache_dir)
            .field("log_file", &self.log_file)
            .field("units", &self.units)
            .field("lang", &self.lang)
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Settings accepted in the TOML config file
///
/// The API key is deliberately absent; it only comes from the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_url: Option<String>,
    cache_ttl_secs: Option<u64>,
    cache_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    units: Option<Units>,
    lang: Option<String>,
    max_retries: Option<u32>,
    backoff_base_secs: Option<f64>,
    request_timeout_secs: Option<u64>,
}

impl Config {
    /// Loads configuration from `.env`, the config file and the environment
    ///
    /// `path` names the config file explicitly; without it `cityweather.toml`
    /// in the working directory is used when present. The result is not yet
    /// validated so callers can layer command-line overrides on top first.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        let mut config = Config::default();

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let file_path = match path {
            Some(p) => Some(p),
            None if default_path.exists() => Some(default_path),
            None => None,
        };
        if let Some(file_path) = file_path {
            config.apply_file(file_path)?;
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies the settings found in a TOML file
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_toml(&contents).map_err(|e| match e {
            TomlError::Parse(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            TomlError::Value(e) => e,
        })
    }

    fn apply_toml(&mut self, contents: &str) -> Result<(), TomlError> {
        let file: FileConfig = toml::from_str(contents).map_err(TomlError::Parse)?;

        if let Some(url) = file.api_url {
            self.api_url = url;
        }
        if let Some(ttl) = file.cache_ttl_secs {
            self.cache_ttl = Duration::from_secs(ttl);
        }
        if let Some(dir) = file.cache_dir {
            self.cache_dir = dir;
        }
        if let Some(log_file) = file.log_file {
            self.log_file = Some(log_file);
        }
        if let Some(units) = file.units {
            self.units = units;
        }
        if let Some(lang) = file.lang {
            self.lang = lang;
        }
        if let Some(retries) = file.max_retries {
            self.max_retries = retries;
        }
        if let Some(secs) = file.backoff_base_secs {
            self.backoff_base = secs_to_duration(secs, "backoff_base_secs").map_err(TomlError::Value)?;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Applies environment overrides, reading variables through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("API_KEY") {
            self.api_key = key.trim().to_string();
        }
        if let Some(url) = lookup("WEATHER_API_URL") {
            self.api_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("WEATHER_CACHE_TTL") {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: "WEATHER_CACHE_TTL".into(),
                reason: "must be a whole number of seconds".into(),
            })?;
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(dir) = lookup("WEATHER_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir.trim());
        }
        if let Some(file) = lookup("WEATHER_LOG_FILE") {
            let trimmed = file.trim();
            self.log_file = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
        }
        if let Some(raw) = lookup("WEATHER_UNITS") {
            self.units = raw.parse().map_err(|reason| ConfigError::InvalidValue {
                name: "WEATHER_UNITS".into(),
                reason,
            })?;
        }
        if let Some(lang) = lookup("WEATHER_LANG") {
            self.lang = lang.trim().to_string();
        }
        if let Some(raw) = lookup("WEATHER_MAX_RETRIES") {
            self.max_retries = raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                name: "WEATHER_MAX_RETRIES".into(),
                reason: "must be an integer >= 1".into(),
            })?;
        }
        if let Some(raw) = lookup("WEATHER_BACKOFF_BASE") {
            let secs = raw.trim().parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                name: "WEATHER_BACKOFF_BASE".into(),
                reason: "must be a number of seconds >= 0".into(),
            })?;
            self.backoff_base = secs_to_duration(secs, "WEATHER_BACKOFF_BASE")?;
        }
        Ok(())
    }

    /// Checks the assembled configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues: Vec<String> = Vec::new();

        if self.api_key.trim().is_empty() {
            issues.push("API_KEY is not set. Put your key in .env or the environment".into());
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            issues.push(format!("api_url must be an http(s) URL (got '{}')", self.api_url));
        }
        if self.max_retries == 0 {
            issues.push("max_retries must be >= 1".into());
        }
        if self.request_timeout.is_zero() {
            issues.push("request_timeout_secs must be > 0".into());
        }
        if self.lang.trim().is_empty() {
            issues.push("lang must not be empty".into());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }
}

#[derive(Debug)]
enum TomlError {
    Parse(toml::de::Error),
    Value(ConfigError),
}

fn secs_to_duration(secs: f64, name: &str) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: "must be a number of seconds >= 0".into(),
    })
}
