//! Remote weather data
//!
//! Fetching the raw document from the weather API and, separately,
//! interpreting a stored copy of it for display.

pub mod fetcher;
pub mod weather;

pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use weather::{parse_current_weather, CurrentWeather, ParseError};
