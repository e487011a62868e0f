//! Records returned by the weather and energy components.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// Where a record's values came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// Successful response from the named upstream provider
    Live { provider: String },
    /// Generated locally because no key is configured or the upstream call failed
    Demo,
}

impl DataSource {
    pub fn is_demo(&self) -> bool {
        matches!(self, DataSource::Demo)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Live { provider } => write!(f, "live ({provider})"),
            DataSource::Demo => f.write_str("demo data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatingRecommendation {
    Increase,
    Maintain,
    Decrease,
}

impl HeatingRecommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatingRecommendation::Increase => "Increase",
            HeatingRecommendation::Maintain => "Maintain",
            HeatingRecommendation::Decrease => "Decrease",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherRecord {
    pub location: String,
    pub temperature_c: f64,
    pub description: String,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub pressure_hpa: u32,
    pub heating: HeatingRecommendation,
    pub lighting_note: &'static str,
    pub ventilation_note: &'static str,
    pub source: DataSource,
}

/// Tariff period for an hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePeriod {
    Peak,
    Standard,
    OffPeak,
}

impl PricePeriod {
    /// Wire name, as used by upstream payloads ("off_peak").
    pub fn as_str(&self) -> &'static str {
        match self {
            PricePeriod::Peak => "peak",
            PricePeriod::Standard => "standard",
            PricePeriod::OffPeak => "off_peak",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PricePeriod::Peak => "Peak",
            PricePeriod::Standard => "Standard",
            PricePeriod::OffPeak => "Off Peak",
        }
    }

    pub fn smart_action(&self) -> &'static str {
        match self {
            PricePeriod::Peak => "Delay washing/heating",
            PricePeriod::OffPeak => "Good time for appliances",
            PricePeriod::Standard => "Normal usage",
        }
    }

    /// Parse an upstream period label; accepts "off_peak", "off-peak" and "offpeak".
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "peak" => Some(PricePeriod::Peak),
            "standard" => Some(PricePeriod::Standard),
            "off_peak" | "offpeak" => Some(PricePeriod::OffPeak),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub hour: u8,
    pub price: f64,
    pub period: PricePeriod,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnergyPriceRecord {
    pub region: String,
    pub currency: String,
    pub current_price: f64,
    pub period: PricePeriod,
    pub cost_impact_note: &'static str,
    pub smart_action: &'static str,
    pub forecast: Option<Vec<ForecastEntry>>,
    pub timestamp: DateTime<Local>,
    pub source: DataSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_labels_parse_in_common_spellings() {
        assert_eq!(PricePeriod::parse("off_peak"), Some(PricePeriod::OffPeak));
        assert_eq!(PricePeriod::parse("Off-Peak"), Some(PricePeriod::OffPeak));
        assert_eq!(PricePeriod::parse("PEAK"), Some(PricePeriod::Peak));
        assert_eq!(PricePeriod::parse("shoulder"), None);
    }

    #[test]
    fn data_source_renders_mode() {
        assert_eq!(DataSource::Demo.to_string(), "demo data");
        let live = DataSource::Live { provider: "openweather".to_string() };
        assert_eq!(live.to_string(), "live (openweather)");
        assert!(!live.is_demo());
    }
}
