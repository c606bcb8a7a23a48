//! Text rendering of poll events
//!
//! Turns whatever the poll loop reports into the lines shown to the user.
//! Every event produces some text, so the display is never left blank.

use chrono::Local;

use crate::cache::CycleOutcome;
use crate::config::WeatherConfig;
use crate::data::{parse_current_weather, CurrentWeather};
use crate::refresh::PollEvent;

/// Shown while a fetch is in progress
pub const LOADING_TEXT: &str = "Loading...";

/// Shown when neither the network nor the cache had anything
pub const UNAVAILABLE_TEXT: &str = "Could not retrieve weather data";

/// Shown when the cached payload cannot be interpreted
pub const PARSE_ERROR_TEXT: &str = "Error processing weather data";

/// Stand-in when the API sends an empty condition list
pub const NO_DESCRIPTION_TEXT: &str = "no description";

/// Renders poll events for one configured location
#[derive(Debug, Clone)]
pub struct StatusView {
    location: String,
    unit_symbol: &'static str,
}

impl StatusView {
    pub fn new(location: impl Into<String>, units: &str) -> Self {
        Self {
            location: location.into(),
            unit_symbol: unit_symbol(units),
        }
    }

    pub fn from_config(config: &WeatherConfig) -> Self {
        Self::new(config.location.clone(), &config.units)
    }

    /// Text for any event coming off the poll channel
    pub fn render_event(&self, event: &PollEvent) -> String {
        match event {
            PollEvent::Fetching => LOADING_TEXT.to_string(),
            PollEvent::Cycle(outcome) => self.render_outcome(outcome),
        }
    }

    /// Text for a finished cycle
    pub fn render_outcome(&self, outcome: &CycleOutcome) -> String {
        let Some(artifact) = outcome.artifact() else {
            return UNAVAILABLE_TEXT.to_string();
        };

        let weather = match parse_current_weather(&artifact.payload) {
            Ok(weather) => weather,
            Err(e) => {
                tracing::warn!(error = %e, "cannot display weather payload");
                return PARSE_ERROR_TEXT.to_string();
            }
        };

        let mut text = self.render_weather(&weather);
        if let CycleOutcome::FallbackStale { .. } = outcome {
            let updated = artifact.stored_at.with_timezone(&Local);
            text.push_str(&format!(
                "\n(offline, last updated {})",
                updated.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        text
    }

    /// Two-line summary of the current conditions
    pub fn render_weather(&self, weather: &CurrentWeather) -> String {
        format!(
            "Temperature in {}: {}{}\nWeather: {}",
            self.location,
            weather.temperature,
            self.unit_symbol,
            weather.description.as_deref().unwrap_or(NO_DESCRIPTION_TEXT)
        )
    }
}

/// Temperature suffix for an OpenWeatherMap `units` value
fn unit_symbol(units: &str) -> &'static str {
    match units {
        "metric" => "°C",
        "imperial" => "°F",
        _ => " K",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Artifact, CycleError};
    use crate::data::FetchError;
    use chrono::{TimeZone, Utc};
    use reqwest::StatusCode;

    const PAYLOAD: &[u8] =
        br#"{"main":{"temp":-7.5},"weather":[{"description":"clear sky"}]}"#;

    fn artifact(payload: &[u8]) -> Artifact {
        Artifact {
            payload: payload.to_vec(),
            stored_at: Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    fn view() -> StatusView {
        StatusView::new("Irkutsk", "metric")
    }

    #[test]
    fn test_render_fresh_outcome() {
        let text = view().render_outcome(&CycleOutcome::UsedFresh(artifact(PAYLOAD)));

        assert_eq!(text, "Temperature in Irkutsk: -7.5°C\nWeather: clear sky");
    }

    #[test]
    fn test_render_refreshed_outcome_matches_fresh() {
        let fresh = view().render_outcome(&CycleOutcome::UsedFresh(artifact(PAYLOAD)));
        let refreshed = view().render_outcome(&CycleOutcome::Refreshed(artifact(PAYLOAD)));

        assert_eq!(fresh, refreshed);
    }

    #[test]
    fn test_render_stale_outcome_adds_notice() {
        let outcome = CycleOutcome::FallbackStale {
            artifact: artifact(PAYLOAD),
            cause: FetchError::Status(StatusCode::SERVICE_UNAVAILABLE),
        };

        let text = view().render_outcome(&outcome);

        assert!(text.starts_with("Temperature in Irkutsk: -7.5°C\nWeather: clear sky"));
        assert!(text.contains("offline, last updated"));
    }

    #[test]
    fn test_render_unavailable_outcome() {
        let outcome = CycleOutcome::Unavailable(CycleError::Fetch(FetchError::Status(
            StatusCode::UNAUTHORIZED,
        )));

        assert_eq!(view().render_outcome(&outcome), UNAVAILABLE_TEXT);
    }

    #[test]
    fn test_render_malformed_payload_shows_parse_error() {
        let outcome = CycleOutcome::Refreshed(artifact(b"<html>502</html>"));

        assert_eq!(view().render_outcome(&outcome), PARSE_ERROR_TEXT);
    }

    #[test]
    fn test_render_missing_description() {
        let outcome = CycleOutcome::UsedFresh(artifact(br#"{"main":{"temp":3},"weather":[]}"#));

        assert_eq!(
            view().render_outcome(&outcome),
            "Temperature in Irkutsk: 3°C\nWeather: no description"
        );
    }

    #[test]
    fn test_render_fetching_event() {
        assert_eq!(view().render_event(&PollEvent::Fetching), LOADING_TEXT);
    }

    #[test]
    fn test_render_cycle_event_delegates_to_outcome() {
        let event = PollEvent::Cycle(CycleOutcome::UsedFresh(artifact(PAYLOAD)));

        assert!(view().render_event(&event).contains("-7.5°C"));
    }

    #[test]
    fn test_unit_symbols() {
        assert_eq!(unit_symbol("metric"), "°C");
        assert_eq!(unit_symbol("imperial"), "°F");
        assert_eq!(unit_symbol("standard"), " K");
    }

    #[test]
    fn test_from_config_uses_location_and_units() {
        let config = WeatherConfig {
            location: "Baikalsk".to_string(),
            units: "imperial".to_string(),
            ..Default::default()
        };

        let text = StatusView::from_config(&config).render_weather(&CurrentWeather {
            temperature: 20.0,
            description: Some("fog".to_string()),
        });

        assert_eq!(text, "Temperature in Baikalsk: 20°F\nWeather: fog");
    }
}
