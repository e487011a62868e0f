//! Energy price lookup.
//!
//! Prices come from the configured upstream API when an `ENERGY_API_KEY` is
//! present. Without a key, or when the upstream call fails for any reason, the
//! record is computed from a fixed day-shape tariff so that peak detection is a
//! pure function of the local hour.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local, Timelike};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::mock;
use crate::core::config::UpstreamConfig;
use crate::core::utils::{round_to, truncate_body};
use crate::model::{DataSource, EnergyPriceRecord, ForecastEntry, PricePeriod};

/// Number of hourly entries in a forecast, starting at the current hour.
pub const FORECAST_HOURS: usize = 8;

pub const DEFAULT_REGION: &str = "EU";

const PEAK_MULTIPLIER: f64 = 1.8;
const OFF_PEAK_MULTIPLIER: f64 = 0.7;

const HIGH_COST_THRESHOLD: f64 = 0.35;
const STANDARD_COST_THRESHOLD: f64 = 0.20;

/// Base price and currency for a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    pub base_price: f64,
    pub currency: &'static str,
}

impl Tariff {
    /// Period and rounded price for `hour` (taken modulo 24).
    pub fn price_at(&self, hour: u8) -> (PricePeriod, f64) {
        let period = classify_hour(hour);
        let multiplier = match period {
            PricePeriod::Peak => PEAK_MULTIPLIER,
            PricePeriod::OffPeak => OFF_PEAK_MULTIPLIER,
            PricePeriod::Standard => 1.0,
        };
        (period, round_to(self.base_price * multiplier, 3))
    }

    /// `horizon` consecutive hourly entries beginning at `start_hour`, wrapping past 23.
    pub fn forecast_from(&self, start_hour: u8, horizon: usize) -> Vec<ForecastEntry> {
        (0..horizon)
            .map(|offset| {
                let hour = ((start_hour as usize + offset) % 24) as u8;
                let (period, price) = self.price_at(hour);
                ForecastEntry { hour, price, period }
            })
            .collect()
    }
}

/// Tariff for a region code; unknown codes use the EU pattern.
pub fn tariff_for(region: &str) -> Tariff {
    match region.trim().to_ascii_uppercase().as_str() {
        "UK" | "GB" => Tariff { base_price: 0.28, currency: "GBP" },
        "US" => Tariff { base_price: 0.16, currency: "USD" },
        _ => Tariff { base_price: 0.25, currency: "EUR" },
    }
}

/// Peak 07-09 and 17-20, off-peak 22-06, standard otherwise.
pub fn classify_hour(hour: u8) -> PricePeriod {
    match hour % 24 {
        7..=9 | 17..=20 => PricePeriod::Peak,
        0..=6 | 22..=23 => PricePeriod::OffPeak,
        _ => PricePeriod::Standard,
    }
}

pub fn cost_impact(price: f64) -> &'static str {
    if price > HIGH_COST_THRESHOLD {
        "High cost - consider energy saving"
    } else if price > STANDARD_COST_THRESHOLD {
        "Standard cost"
    } else {
        "Low cost - good time for energy-intensive tasks"
    }
}

pub fn currency_symbol(currency: &str) -> &str {
    match currency {
        "EUR" => "€",
        "GBP" => "£",
        "USD" => "$",
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct EnergyPriceApi {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl EnergyPriceApi {
    pub fn new(config: &UpstreamConfig, http: Client) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            http,
        }
    }

    /// Current prices for `region` at the local clock time. Never fails.
    pub async fn get_energy_prices(&self, region: &str, include_forecast: bool) -> EnergyPriceRecord {
        self.prices_at(region, include_forecast, Local::now()).await
    }

    /// Same as [`get_energy_prices`](Self::get_energy_prices) with an explicit clock.
    pub async fn prices_at(
        &self,
        region: &str,
        include_forecast: bool,
        now: DateTime<Local>,
    ) -> EnergyPriceRecord {
        info!(region, include_forecast, "Fetching energy prices");

        if let Some(key) = self.api_key.as_deref() {
            match self.fetch_live(key, region, include_forecast, now).await {
                Ok(record) => return record,
                Err(e) => warn!(region, error = %format!("{e:#}"), "Energy price API failed, serving demo data"),
            }
        } else {
            debug!(region, "No energy API key configured, serving demo data");
        }

        mock::energy_prices(region, now.hour() as u8, include_forecast, now)
    }

    async fn fetch_live(
        &self,
        api_key: &str,
        region: &str,
        include_forecast: bool,
        now: DateTime<Local>,
    ) -> Result<EnergyPriceRecord> {
        let res = self
            .http
            .get(&self.base_url)
            .bearer_auth(api_key)
            .query(&[("region", region)])
            .send()
            .await
            .context("Failed to send request to energy price API")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read energy price response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Energy price request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: EpResponse =
            serde_json::from_str(&body).context("Failed to parse energy price JSON")?;

        parsed.into_record(region, include_forecast, now)
    }
}

#[derive(Debug, Deserialize)]
struct EpCurrent {
    price_per_kwh: f64,
    currency: Option<String>,
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpForecastEntry {
    hour: Option<u8>,
    /// "HH:MM"
    time: Option<String>,
    price_per_kwh: f64,
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpResponse {
    current_price: EpCurrent,
    #[serde(default)]
    price_forecast: Vec<EpForecastEntry>,
}

impl EpResponse {
    fn into_record(
        self,
        region: &str,
        include_forecast: bool,
        now: DateTime<Local>,
    ) -> Result<EnergyPriceRecord> {
        let current_hour = now.hour() as u8;
        let period = resolve_period(self.current_price.period.as_deref(), current_hour)?;
        let current_price = round_to(self.current_price.price_per_kwh, 3);

        let forecast = if include_forecast {
            if self.price_forecast.len() < FORECAST_HOURS {
                return Err(anyhow!(
                    "Energy price forecast has {} entries, expected at least {}",
                    self.price_forecast.len(),
                    FORECAST_HOURS
                ));
            }
            let entries = self
                .price_forecast
                .into_iter()
                .take(FORECAST_HOURS)
                .enumerate()
                .map(|(offset, entry)| -> Result<ForecastEntry> {
                    let hour = entry_hour(&entry)?;
                    let expected = ((current_hour as usize + offset) % 24) as u8;
                    if hour != expected {
                        return Err(anyhow!(
                            "Energy price forecast entry {offset} is for hour {hour}, expected {expected}"
                        ));
                    }
                    Ok(ForecastEntry {
                        hour,
                        price: round_to(entry.price_per_kwh, 3),
                        period: resolve_period(entry.period.as_deref(), hour)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Some(entries)
        } else {
            None
        };

        let currency = self
            .current_price
            .currency
            .unwrap_or_else(|| tariff_for(region).currency.to_string());

        Ok(EnergyPriceRecord {
            region: region.to_string(),
            currency,
            current_price,
            period,
            cost_impact_note: cost_impact(current_price),
            smart_action: period.smart_action(),
            forecast,
            timestamp: now,
            source: DataSource::Live { provider: "energy-api".to_string() },
        })
    }
}

fn resolve_period(label: Option<&str>, hour: u8) -> Result<PricePeriod> {
    match label {
        Some(label) => PricePeriod::parse(label)
            .ok_or_else(|| anyhow!("Unknown price period '{label}' in energy price response")),
        None => Ok(classify_hour(hour)),
    }
}

fn entry_hour(entry: &EpForecastEntry) -> Result<u8> {
    let hour = match (entry.hour, entry.time.as_deref()) {
        (Some(hour), _) => hour,
        (None, Some(time)) => time
            .split(':')
            .next()
            .and_then(|h| h.trim().parse::<u8>().ok())
            .ok_or_else(|| anyhow!("Invalid forecast time '{time}'"))?,
        (None, None) => return Err(anyhow!("Forecast entry has neither hour nor time")),
    };
    if hour > 23 {
        return Err(anyhow!("Forecast hour {hour} out of range"));
    }
    Ok(hour)
}
