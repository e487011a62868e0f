/// Energy Price Tool Implementation
///
/// `get_energy_prices` returns the current price per kWh for a region, the
/// tariff period, and optionally the next hours of prices.

use futures_util::FutureExt;
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;

use crate::api::energy::{DEFAULT_REGION, EnergyPriceApi, FORECAST_HOURS, currency_symbol};
use crate::core::error::ToolError;
use crate::core::server::{MCPTool, ToolHandler, ToolRegistry};
use crate::model::EnergyPriceRecord;

pub const TOOL_NAME: &str = "get_energy_prices";

/// Register the energy price tool with the tool registry.
pub fn register(registry: &mut ToolRegistry, api: EnergyPriceApi) {
    let tool = MCPTool {
        name: TOOL_NAME.to_string(),
        description: "Fetch current energy prices per kWh with smart home optimization \
                      recommendations and an optional hourly forecast."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "region": {
                    "type": "string",
                    "description": "Region code (EU, US, UK)",
                    "default": DEFAULT_REGION
                },
                "include_forecast": {
                    "type": "boolean",
                    "description": format!("Include the next {FORECAST_HOURS} hours of prices"),
                    "default": false
                }
            }
        }),
    };

    let api = Arc::new(api);
    let handler: ToolHandler = Box::new(move |args: Value| {
        let api = Arc::clone(&api);
        async move {
            let (region, include_forecast) = parse_arguments(&args)?;
            let record = api.get_energy_prices(&region, include_forecast).await;
            Ok::<_, ToolError>(render(&record))
        }
        .boxed()
    });

    registry.register(tool, handler);
}

/// Region (defaulting to EU) and forecast flag (defaulting to false).
fn parse_arguments(args: &Value) -> Result<(String, bool), ToolError> {
    let region = super::optional_str(args, "region")?
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_REGION)
        .to_string();
    let include_forecast = super::optional_bool(args, "include_forecast")?.unwrap_or(false);
    Ok((region, include_forecast))
}

/// Render an energy price record as the tool's text result.
pub fn render(record: &EnergyPriceRecord) -> String {
    let symbol = currency_symbol(&record.currency);
    let mut out = String::with_capacity(768);

    let _ = writeln!(out, "⚡ Energy Prices for {}:", record.region);
    let _ = writeln!(out);
    let _ = writeln!(out, "💰 Current Price:");
    let _ = writeln!(out, "• Price: {symbol}{:.3}/kWh", record.current_price);
    let _ = writeln!(out, "• Period: {}", record.period.label());
    let _ = writeln!(out, "• Currency: {}", record.currency);
    let _ = writeln!(out, "• Last Updated: {}", record.timestamp.format("%Y-%m-%dT%H:%M:%S"));
    let _ = writeln!(out);
    let _ = writeln!(out, "🏠 HomeGenie Recommendations:");
    let _ = writeln!(out, "• Period Type: {}", record.period.label());
    let _ = writeln!(out, "• Cost Impact: {}", record.cost_impact_note);
    let _ = writeln!(out, "• Smart Actions: {}", record.smart_action);

    if let Some(forecast) = &record.forecast {
        let _ = writeln!(out);
        let _ = writeln!(out, "📈 Next {} Hours Forecast:", forecast.len());
        for entry in forecast {
            let _ = writeln!(
                out,
                "• {:02}:00: {symbol}{:.3}/kWh ({})",
                entry.hour,
                entry.price,
                entry.period.as_str()
            );
        }
    }

    let _ = writeln!(out);
    if record.source.is_demo() {
        let _ = write!(out, "ℹ️ Data source: {} (set ENERGY_API_KEY for live data)", record.source);
    } else {
        let _ = write!(out, "ℹ️ Data source: {}", record.source);
    }

    if let Ok(raw) = serde_json::to_string_pretty(record) {
        let _ = write!(out, "\n\n📱 Raw Data:\n{raw}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock;
    use crate::core::config::UpstreamConfig;
    use chrono::Local;
    use serde_json::json;

    #[test]
    fn arguments_default_to_eu_without_forecast() {
        assert_eq!(parse_arguments(&json!({})).unwrap(), ("EU".to_string(), false));
        assert_eq!(parse_arguments(&json!({ "region": "" })).unwrap(), ("EU".to_string(), false));
        assert_eq!(
            parse_arguments(&json!({ "region": "US", "include_forecast": true })).unwrap(),
            ("US".to_string(), true)
        );
        assert!(parse_arguments(&json!({ "include_forecast": "yes" })).is_err());
    }

    #[test]
    fn render_peak_hour_with_forecast() {
        let text = render(&mock::energy_prices("EU", 17, true, Local::now()));

        assert!(text.starts_with("⚡ Energy Prices for EU:"));
        assert!(text.contains("• Price: €0.450/kWh"));
        assert!(text.contains("• Period: Peak"));
        assert!(text.contains("• Cost Impact: High cost - consider energy saving"));
        assert!(text.contains("• Smart Actions: Delay washing/heating"));
        assert!(text.contains("📈 Next 8 Hours Forecast:"));
        assert!(text.contains("• 17:00: €0.450/kWh (peak)"));
        assert!(text.contains("• 00:00: €0.175/kWh (off_peak)"));
        assert!(text.contains("Data source: demo data"));
    }

    #[test]
    fn render_without_forecast_omits_section() {
        let text = render(&mock::energy_prices("US", 12, false, Local::now()));

        assert!(text.contains("• Price: $0.160/kWh"));
        assert!(text.contains("• Cost Impact: Low cost - good time for energy-intensive tasks"));
        assert!(!text.contains("Forecast"));
    }

    #[test]
    fn render_appends_raw_record_json() {
        let text = render(&mock::energy_prices("EU", 17, true, Local::now()));

        let (_, raw) = text.split_once("📱 Raw Data:\n").expect("raw data section");
        let parsed: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed["current_price"], json!(0.45));
        assert_eq!(parsed["period"], json!("peak"));
        assert_eq!(parsed["smart_action"], json!("Delay washing/heating"));
        assert_eq!(parsed["forecast"][7]["hour"], json!(0));
        assert_eq!(parsed["source"], json!({ "kind": "demo" }));
    }

    #[tokio::test]
    async fn demo_call_never_fails() {
        let config = UpstreamConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9/unused".to_string(),
        };
        let mut registry = ToolRegistry::new();
        register(&mut registry, EnergyPriceApi::new(&config, reqwest::Client::new()));

        let text = registry
            .handle_tool_call(TOOL_NAME, json!({ "region": "MARS", "include_forecast": true }))
            .await
            .unwrap();
        assert!(text.contains("Energy Prices for MARS"));
        assert!(text.contains("Currency: EUR"));
        assert!(text.contains("demo data"));
    }
}
