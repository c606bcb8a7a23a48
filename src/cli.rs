//! Command-line interface parsing for weatherpoll
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the runtime configuration, rejecting combinations that cannot work.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::ArtifactStore;
use crate::config::{
    WeatherConfig, DEFAULT_ENDPOINT, DEFAULT_LOCALE, DEFAULT_LOCATION, DEFAULT_UNITS,
};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Fetching needs an API key and none was given
    #[error("No API key given. Pass --api-key or set OPENWEATHER_API_KEY")]
    MissingApiKey,

    /// A duration flag was zero
    #[error("--{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// No home directory to derive a cache directory from
    #[error("Could not determine a cache directory. Pass --cache-dir")]
    NoCacheDir,
}

/// weatherpoll - Current weather for one city, cached on disk between refreshes
#[derive(Parser, Debug)]
#[command(name = "weatherpoll")]
#[command(about = "Current weather for one city, cached on disk between refreshes")]
#[command(version)]
pub struct Cli {
    /// City to report on
    #[arg(long, default_value = DEFAULT_LOCATION)]
    pub city: String,

    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Language of the weather description
    #[arg(long, default_value = DEFAULT_LOCALE)]
    pub lang: String,

    /// Unit system for temperatures
    #[arg(long, default_value = DEFAULT_UNITS, value_parser = ["metric", "imperial", "standard"])]
    pub units: String,

    /// Current-weather endpoint URL
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// How long a cached response is reused before refetching
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    pub freshness_ms: u64,

    /// Pause between refresh cycles
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    pub interval_ms: u64,

    /// Connect and read timeout for each request
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Directory for the cached response (defaults to the user cache directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Run a single refresh cycle, print the result and exit
    #[arg(long, conflicts_with_all = ["cache_info", "clear_cache"])]
    pub once: bool,

    /// Print where the cached response lives and how old it is, then exit
    #[arg(long, conflicts_with = "clear_cache")]
    pub cache_info: bool,

    /// Delete the cached response and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Log more detail to stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// What the binary should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Poll until interrupted
    Watch,
    /// One cycle, then exit
    Once,
    /// Report on the cached response
    CacheInfo,
    /// Remove the cached response
    ClearCache,
}

impl Mode {
    /// Whether this mode talks to the network
    pub fn fetches(self) -> bool {
        matches!(self, Mode::Watch | Mode::Once)
    }
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub mode: Mode,
    pub weather: WeatherConfig,
    /// Number of `-v` flags given
    pub verbosity: u8,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a required value is missing or a duration is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mode = if cli.once {
            Mode::Once
        } else if cli.cache_info {
            Mode::CacheInfo
        } else if cli.clear_cache {
            Mode::ClearCache
        } else {
            Mode::Watch
        };

        let credential = cli
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        if mode.fetches() && credential.is_none() {
            return Err(CliError::MissingApiKey);
        }

        let timeout = nonzero_millis(cli.timeout_ms, "timeout-ms")?;
        let weather = WeatherConfig {
            freshness_window: Duration::from_millis(cli.freshness_ms),
            poll_interval: nonzero_millis(cli.interval_ms, "interval-ms")?,
            connect_timeout: timeout,
            read_timeout: timeout,
            endpoint: cli.endpoint.clone(),
            credential: credential.unwrap_or_default(),
            location: cli.city.clone(),
            locale: cli.lang.clone(),
            units: cli.units.clone(),
            cache_dir: cli.cache_dir.clone(),
        };

        Ok(StartupConfig {
            mode,
            weather,
            verbosity: cli.verbose,
        })
    }

    /// Log filter used when `RUST_LOG` is unset: `-v` is info, `-vv` and up is debug
    pub fn default_log_level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Opens the artifact store in the configured or default cache directory
    pub fn open_store(&self) -> Result<ArtifactStore, CliError> {
        match &self.weather.cache_dir {
            Some(dir) => Ok(ArtifactStore::with_dir(dir.clone())),
            None => ArtifactStore::new().ok_or(CliError::NoCacheDir),
        }
    }
}

fn nonzero_millis(value: u64, flag: &'static str) -> Result<Duration, CliError> {
    if value == 0 {
        return Err(CliError::ZeroDuration(flag));
    }
    Ok(Duration::from_millis(value))
}
