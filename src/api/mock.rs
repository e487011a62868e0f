//! Demo data served when no API key is configured or an upstream call fails.

use chrono::{DateTime, Local};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::api::energy::{self, FORECAST_HOURS};
use crate::api::weather::Observation;
use crate::core::utils::round_to;
use crate::model::{DataSource, EnergyPriceRecord};

const CONDITIONS: &[&str] = &["clear sky", "few clouds", "scattered clouds", "light rain"];

/// Bounded-random weather observation for `location`.
pub fn weather_observation<R: Rng + ?Sized>(location: &str, rng: &mut R) -> Observation {
    let description = CONDITIONS.choose(rng).copied().unwrap_or("clear sky");

    Observation {
        location: location.to_string(),
        temperature_c: round_to(rng.gen_range(15.0..=25.0), 1),
        description: description.to_string(),
        humidity_pct: rng.gen_range(40..=80),
        wind_speed_mps: round_to(rng.gen_range(1.0..=10.0), 1),
        pressure_hpa: rng.gen_range(1000..=1020),
    }
}

/// Energy prices for `region` as seen at local `hour`.
///
/// Fully determined by `region` and `hour`; `now` only stamps the record.
pub fn energy_prices(
    region: &str,
    hour: u8,
    include_forecast: bool,
    now: DateTime<Local>,
) -> EnergyPriceRecord {
    let tariff = energy::tariff_for(region);
    let (period, current_price) = tariff.price_at(hour);

    EnergyPriceRecord {
        region: region.to_string(),
        currency: tariff.currency.to_string(),
        current_price,
        period,
        cost_impact_note: energy::cost_impact(current_price),
        smart_action: period.smart_action(),
        forecast: include_forecast.then(|| tariff.forecast_from(hour, FORECAST_HOURS)),
        timestamp: now,
        source: DataSource::Demo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PricePeriod;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn weather_values_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let obs = weather_observation("London", &mut rng);
            assert_eq!(obs.location, "London");
            assert!((15.0..=25.0).contains(&obs.temperature_c));
            assert!((40..=80).contains(&obs.humidity_pct));
            assert!((1.0..=10.0).contains(&obs.wind_speed_mps));
            assert!((1000..=1020).contains(&obs.pressure_hpa));
            assert!(CONDITIONS.contains(&obs.description.as_str()));
        }
    }

    #[test]
    fn same_seed_gives_same_weather() {
        let a = weather_observation("Oslo", &mut StdRng::seed_from_u64(42));
        let b = weather_observation("Oslo", &mut StdRng::seed_from_u64(42));
        assert_eq!(a.temperature_c, b.temperature_c);
        assert_eq!(a.description, b.description);
    }

    #[test]
    fn energy_prices_at_evening_peak() {
        let record = energy_prices("EU", 18, false, Local::now());
        assert_eq!(record.period, PricePeriod::Peak);
        assert_eq!(record.current_price, 0.45);
        assert_eq!(record.currency, "EUR");
        assert_eq!(record.cost_impact_note, "High cost - consider energy saving");
        assert_eq!(record.smart_action, "Delay washing/heating");
        assert!(record.forecast.is_none());
        assert!(record.source.is_demo());
    }

    #[test]
    fn energy_forecast_is_included_on_request() {
        let record = energy_prices("EU", 22, true, Local::now());
        let hours: Vec<u8> = record.forecast.unwrap().iter().map(|e| e.hour).collect();
        assert_eq!(hours, vec![22, 23, 0, 1, 2, 3, 4, 5]);
    }
}
