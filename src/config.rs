//! Runtime configuration
//!
//! Everything the cache cycle and poll loop need to know about the outside
//! world: where to fetch from, for which location, and how long to wait.

use std::path::PathBuf;
use std::time::Duration;

/// OpenWeatherMap current-weather endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Location queried when none is given
pub const DEFAULT_LOCATION: &str = "Irkutsk";

/// Language for the weather description
pub const DEFAULT_LOCALE: &str = "ru";

/// Unit system requested from the API
pub const DEFAULT_UNITS: &str = "metric";

/// Maximum age of a cached artifact before it is refetched
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_millis(5000);

/// Delay between the end of one cycle and the start of the next
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Connect and read timeout applied to each request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Parameters needed to build the weather request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    /// Base URL of the weather endpoint
    pub endpoint: String,
    /// City name sent as `q`
    pub location: String,
    /// API key sent as `appid`
    pub credential: String,
    /// Unit system sent as `units`
    pub units: String,
    /// Language sent as `lang`
    pub locale: String,
}

impl ResourceKey {
    /// Query pairs in the order the API documents them
    pub fn query_pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("q", self.location.as_str()),
            ("appid", self.credential.as_str()),
            ("units", self.units.as_str()),
            ("lang", self.locale.as_str()),
        ]
    }
}

/// Full configuration for one running instance
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub freshness_window: Duration,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub endpoint: String,
    pub credential: String,
    pub location: String,
    pub locale: String,
    pub units: String,
    /// Overrides the XDG cache directory when set
    pub cache_dir: Option<PathBuf>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: DEFAULT_REQUEST_TIMEOUT,
            read_timeout: DEFAULT_REQUEST_TIMEOUT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credential: String::new(),
            location: DEFAULT_LOCATION.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            units: DEFAULT_UNITS.to_string(),
            cache_dir: None,
        }
    }
}

impl WeatherConfig {
    /// Builds the request parameters for the configured location
    pub fn resource_key(&self) -> ResourceKey {
        ResourceKey {
            endpoint: self.endpoint.clone(),
            location: self.location.clone(),
            credential: self.credential.clone(),
            units: self.units.clone(),
            locale: self.locale.clone(),
        }
    }
}
