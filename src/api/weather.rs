//! Weather lookup with HomeGenie automation hints.
//!
//! Live data comes from the OpenWeather current-weather endpoint when a
//! `WEATHER_API_KEY` is configured. Any failure is absorbed into the demo
//! fallback; callers always receive a complete record.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::mock;
use crate::core::config::UpstreamConfig;
use crate::core::utils::truncate_body;
use crate::model::{DataSource, HeatingRecommendation, WeatherRecord};

/// Below this temperature (°C) heating should be increased.
pub const HEATING_INCREASE_BELOW: f64 = 18.0;
/// At or above this temperature (°C) heating should be decreased.
pub const HEATING_DECREASE_FROM: f64 = 22.0;
/// Wind speed (m/s) from which windows should stay shut.
pub const STRONG_WIND_MPS: f64 = 10.0;

const DIM_CONDITIONS: &[&str] = &["cloud", "rain", "drizzle", "mist", "fog", "snow", "thunder"];
const PRECIPITATION: &[&str] = &["rain", "drizzle", "snow", "thunder"];

/// Raw conditions before any recommendation is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub location: String,
    pub temperature_c: f64,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub pressure_hpa: u32,
}

impl Observation {
    pub fn into_record(self, source: DataSource) -> WeatherRecord {
        WeatherRecord {
            heating: heating_recommendation(self.temperature_c),
            lighting_note: lighting_note(&self.description),
            ventilation_note: ventilation_note(&self.description, self.wind_speed_mps),
            location: self.location,
            temperature_c: self.temperature_c,
            description: self.description,
            humidity_pct: self.humidity_pct,
            wind_speed_mps: self.wind_speed_mps,
            pressure_hpa: self.pressure_hpa,
            source,
        }
    }
}

pub fn heating_recommendation(temperature_c: f64) -> HeatingRecommendation {
    if temperature_c < HEATING_INCREASE_BELOW {
        HeatingRecommendation::Increase
    } else if temperature_c < HEATING_DECREASE_FROM {
        HeatingRecommendation::Maintain
    } else {
        HeatingRecommendation::Decrease
    }
}

pub fn lighting_note(description: &str) -> &'static str {
    let description = description.to_lowercase();
    if DIM_CONDITIONS.iter().any(|c| description.contains(c)) {
        "Low - consider increasing indoor lighting"
    } else {
        "Good"
    }
}

pub fn ventilation_note(description: &str, wind_speed_mps: f64) -> &'static str {
    let description = description.to_lowercase();
    if PRECIPITATION.iter().any(|c| description.contains(c)) {
        "Close windows"
    } else if wind_speed_mps >= STRONG_WIND_MPS {
        "Close windows - strong wind"
    } else {
        "Consider ventilation"
    }
}

#[derive(Debug, Clone)]
pub struct WeatherApi {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl WeatherApi {
    pub fn new(config: &UpstreamConfig, http: Client) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            http,
        }
    }

    /// Current weather for `location`. Never fails.
    pub async fn get_weather(&self, location: &str) -> WeatherRecord {
        info!(location, "Fetching weather data");

        if let Some(key) = self.api_key.as_deref() {
            match self.fetch_current(key, location).await {
                Ok(observation) => {
                    return observation.into_record(DataSource::Live {
                        provider: "openweather".to_string(),
                    });
                }
                Err(e) => warn!(location, error = %format!("{e:#}"), "Weather API failed, serving demo data"),
            }
        } else {
            debug!(location, "No weather API key configured, serving demo data");
        }

        mock::weather_observation(location, &mut rand::thread_rng()).into_record(DataSource::Demo)
    }

    async fn fetch_current(&self, api_key: &str, location: &str) -> Result<Observation> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("q", location), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather current JSON")?;

        let description = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| anyhow!("OpenWeather response contained no weather conditions"))?;

        Ok(Observation {
            location: parsed.name.filter(|n| !n.is_empty()).unwrap_or_else(|| location.to_string()),
            temperature_c: parsed.main.temp,
            description,
            humidity_pct: parsed.main.humidity,
            wind_speed_mps: parsed.wind.speed,
            pressure_hpa: parsed.main.pressure,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}
