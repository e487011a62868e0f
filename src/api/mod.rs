/// Data components behind the MCP tools.
///
/// - weather.rs: `WeatherApi`, OpenWeather lookup plus automation hints
/// - energy.rs: `EnergyPriceApi`, tariff day-shape and upstream price lookup
/// - mock.rs: demo data used without credentials or after upstream failures
///
/// Both components share one `reqwest::Client` carrying the configured timeout.

pub mod energy;
pub mod mock;
pub mod weather;

use crate::core::config::Config;

/// Build the HTTP client used for all upstream calls.
pub fn http_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}
