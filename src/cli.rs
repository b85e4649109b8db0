//! Command-line interface parsing for cityweather
//!
//! Handles the city arguments and the flags that override configuration or
//! switch the output to the terminal UI.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{Config, Units};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// A city argument was empty or only whitespace
    #[error("Please enter a city name.")]
    EmptyCity,
}

/// cityweather - current weather for a city, served from cache when the provider is down
#[derive(Parser, Debug)]
#[command(name = "cityweather")]
#[command(about = "Current weather for one or more cities, with an offline-tolerant cache")]
#[command(version)]
pub struct Cli {
    /// City names to look up
    ///
    /// Examples:
    ///   cityweather Paris
    ///   cityweather "New York" Tokyo --units imperial
    #[arg(required = true, value_name = "CITY")]
    pub cities: Vec<String>,

    /// Config file (defaults to ./cityweather.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Measurement units requested from the provider
    #[arg(long, value_enum)]
    pub units: Option<Units>,

    /// Provider locale, e.g. en, fr, de
    #[arg(long, value_name = "LANG")]
    pub lang: Option<String>,

    /// Directory for cached responses
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Show results in a full-screen terminal view
    #[arg(long)]
    pub tui: bool,
}

/// Trims a city argument, rejecting blank input
pub fn parse_city_arg(s: &str) -> Result<String, CliError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyCity)
    } else {
        Ok(trimmed.to_string())
    }
}

impl Cli {
    /// Returns the trimmed city names
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` with one entry per argument, in order
    /// * `Err(CliError::EmptyCity)` if any argument is blank
    pub fn city_names(&self) -> Result<Vec<String>, CliError> {
        self.cities.iter().map(|c| parse_city_arg(c)).collect()
    }

    /// Applies command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(units) = self.units {
            config.units = units;
        }
        if let Some(lang) = &self.lang {
            config.lang = lang.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_city_arg_trims() {
        assert_eq!(parse_city_arg("  Paris ").unwrap(), "Paris");
    }

    #[test]
    fn test_parse_city_arg_rejects_blank() {
        let err = parse_city_arg("   ").unwrap_err();
        assert_eq!(err.to_string(), "Please enter a city name.");
        assert!(parse_city_arg("").is_err());
    }

    #[test]
    fn test_cli_requires_a_city() {
        assert!(Cli::try_parse_from(["cityweather"]).is_err());
    }

    #[test]
    fn test_cli_parse_multiple_cities() {
        let cli = Cli::parse_from(["cityweather", "Paris", "New York"]);
        assert_eq!(cli.cities, vec!["Paris", "New York"]);
        assert!(!cli.tui);
        assert!(cli.units.is_none());
    }

    #[test]
    fn test_cli_parse_flags() {
        let cli = Cli::parse_from([
            "cityweather",
            "--units",
            "imperial",
            "--lang",
            "fr",
            "--cache-dir",
            "/tmp/cw",
            "--config",
            "cw.toml",
            "--tui",
            "Lyon",
        ]);
        assert_eq!(cli.units, Some(Units::Imperial));
        assert_eq!(cli.lang.as_deref(), Some("fr"));
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/cw")));
        assert_eq!(cli.config, Some(PathBuf::from("cw.toml")));
        assert!(cli.tui);
    }

    #[test]
    fn test_cli_rejects_unknown_units() {
        assert!(Cli::try_parse_from(["cityweather", "--units", "kelvin", "Paris"]).is_err());
    }

    #[test]
    fn test_city_names_rejects_any_blank_argument() {
        let cli = Cli::parse_from(["cityweather", "Paris", " "]);
        assert!(matches!(cli.city_names(), Err(CliError::EmptyCity)));
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from(["cityweather", "--units", "standard", "--lang", "de", "Berlin"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.units, Units::Standard);
        assert_eq!(config.lang, "de");
    }

    #[test]
    fn test_apply_overrides_keeps_unset_values() {
        let cli = Cli::parse_from(["cityweather", "Berlin"]);
        let mut config = Config {
            lang: "es".into(),
            ..Config::default()
        };
        cli.apply_overrides(&mut config);
        assert_eq!(config.lang, "es");
        assert_eq!(config.units, Units::Metric);
    }
}
