//! OpenWeatherMap payload parsing
//!
//! The cache layer treats the payload as opaque bytes. This is where it is
//! first interpreted: only `main.temp` and `weather[0].description` matter.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when interpreting a cached payload
#[derive(Debug, Error)]
pub enum ParseError {
    /// Payload is not JSON or lacks the required fields
    #[error("Failed to parse weather payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Temperature is NaN or infinite
    #[error("Temperature is not a finite number")]
    NonFiniteTemperature,
}

/// The part of the weather document worth showing
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    /// Temperature in the requested units
    pub temperature: f64,
    /// Description of the first weather condition, if the API sent one
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    main: MainReadings,
    weather: Vec<WeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

/// Parses the fields the presenter needs out of a raw API response
///
/// # Returns
/// * `Ok(CurrentWeather)` - If `main.temp` and the `weather` array are present
/// * `Err(ParseError)` - If the payload is malformed
pub fn parse_current_weather(payload: &[u8]) -> Result<CurrentWeather, ParseError> {
    let response: OpenWeatherResponse = serde_json::from_slice(payload)?;

    if !response.main.temp.is_finite() {
        return Err(ParseError::NonFiniteTemperature);
    }

    Ok(CurrentWeather {
        temperature: response.main.temp,
        description: response.weather.into_iter().next().map(|w| w.description),
    })
}
