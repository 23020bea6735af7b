//! Weather extractor backed by the OpenWeather current-weather API.
//!
//! The full response is reduced to one sentence: today's high and low rounded
//! to whole degrees, a short condition summary, and sunrise/sunset in the
//! location's own UTC offset.

use crate::config::{Units, WeatherConfig};
use crate::error::ExtractionError;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

const ORIGIN: &str = "weather";

/// The subset of the provider's response the sentence is built from.
#[derive(Debug, Deserialize)]
pub struct WeatherResponse {
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub main: MainReadings,
    pub sys: SunTimes,
    /// Offset from UTC in seconds.
    #[serde(default)]
    pub timezone: i32,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct MainReadings {
    pub temp_min: f64,
    pub temp_max: f64,
}

#[derive(Debug, Deserialize)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
}

/// Query the provider for the configured coordinates and describe the day.
#[instrument(level = "info", skip_all, fields(location = %config.location_name))]
pub async fn fetch_weather(
    client: &Client,
    config: &WeatherConfig,
    api_key: &str,
) -> Result<String, ExtractionError> {
    let body = client
        .get(&config.api_url)
        .query(&[
            ("lat", config.latitude.to_string()),
            ("lon", config.longitude.to_string()),
            ("units", config.units.query_value().to_string()),
            ("appid", api_key.to_string()),
        ])
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(ExtractionError::transport(ORIGIN))?
        .text()
        .await
        .map_err(ExtractionError::transport(ORIGIN))?;

    let sentence = parse_weather(&body, &config.location_name, config.units)?;
    info!(%sentence, "Extracted weather");
    Ok(sentence)
}

/// Reduce a raw JSON response to the weather sentence.
pub fn parse_weather(body: &str, location: &str, units: Units) -> Result<String, ExtractionError> {
    if body.trim().is_empty() {
        return Err(ExtractionError::Empty(ORIGIN));
    }
    let response: WeatherResponse = serde_json::from_str(body)
        .map_err(|e| ExtractionError::Shape(ORIGIN, e.to_string()))?;
    describe(&response, location, units)
}

/// Render a parsed response as a sentence.
pub fn describe(
    response: &WeatherResponse,
    location: &str,
    units: Units,
) -> Result<String, ExtractionError> {
    let symbol = units.degree_symbol();
    let high = response.main.temp_max.round() as i64;
    let low = response.main.temp_min.round() as i64;
    let condition = response
        .weather
        .first()
        .map(|c| c.description.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "no conditions reported".to_string());

    let offset = FixedOffset::east_opt(response.timezone).ok_or_else(|| {
        ExtractionError::Shape(ORIGIN, format!("bad timezone offset {}", response.timezone))
    })?;
    let sunrise = local_clock(response.sys.sunrise, &offset)?;
    let sunset = local_clock(response.sys.sunset, &offset)?;

    Ok(format!(
        "{location} weather for today: High {high}{symbol}, low {low}{symbol}, {condition}. Sunrise: {sunrise}. Sunset: {sunset}."
    ))
}

fn local_clock(timestamp: i64, offset: &FixedOffset) -> Result<String, ExtractionError> {
    let utc = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| ExtractionError::Shape(ORIGIN, format!("bad timestamp {timestamp}")))?;
    Ok(utc.with_timezone(offset).format("%H:%M").to_string())
}
