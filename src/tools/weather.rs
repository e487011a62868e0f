/// Weather Tool Implementation
///
/// `get_weather_data` returns current conditions for a location together with
/// HomeGenie heating, lighting and window recommendations.

use futures_util::FutureExt;
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;

use crate::api::weather::WeatherApi;
use crate::core::error::ToolError;
use crate::core::server::{MCPTool, ToolHandler, ToolRegistry};
use crate::core::utils::title_case;
use crate::model::WeatherRecord;

pub const TOOL_NAME: &str = "get_weather_data";

/// Register the weather tool with the tool registry.
pub fn register(registry: &mut ToolRegistry, api: WeatherApi) {
    let tool = MCPTool {
        name: TOOL_NAME.to_string(),
        description: "Fetch current weather data for a location, with HomeGenie automation \
                      recommendations for heating, lighting and ventilation."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name or location"
                }
            },
            "required": ["location"]
        }),
    };

    let api = Arc::new(api);
    let handler: ToolHandler = Box::new(move |args: Value| {
        let api = Arc::clone(&api);
        async move {
            // Validate before any outbound call
            let location = required_location(&args)?;
            let record = api.get_weather(&location).await;
            Ok::<_, ToolError>(render(&record))
        }
        .boxed()
    });

    registry.register(tool, handler);
}

fn required_location(args: &Value) -> Result<String, ToolError> {
    super::optional_str(args, "location")?
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidArguments("Missing required parameter: location".to_string()))
}

/// Render a weather record as the tool's text result.
pub fn render(record: &WeatherRecord) -> String {
    let mut out = String::with_capacity(512);

    let _ = writeln!(out, "🌤️ Weather Data for {}:", record.location);
    let _ = writeln!(out);
    let _ = writeln!(out, "📊 Current Conditions:");
    let _ = writeln!(out, "• Temperature: {:.1}°C", record.temperature_c);
    let _ = writeln!(out, "• Description: {}", title_case(&record.description));
    let _ = writeln!(out, "• Humidity: {}%", record.humidity_pct);
    let _ = writeln!(out, "• Wind Speed: {:.1} m/s", record.wind_speed_mps);
    let _ = writeln!(out, "• Pressure: {} hPa", record.pressure_hpa);
    let _ = writeln!(out);
    let _ = writeln!(out, "🏠 HomeGenie Impact:");
    let _ = writeln!(out, "• Heating recommendation: {}", record.heating.as_str());
    let _ = writeln!(out, "• Natural lighting: {}", record.lighting_note);
    let _ = writeln!(out, "• Window management: {}", record.ventilation_note);
    let _ = writeln!(out);
    if record.source.is_demo() {
        let _ = write!(out, "ℹ️ Data source: {} (set WEATHER_API_KEY for live data)", record.source);
    } else {
        let _ = write!(out, "ℹ️ Data source: {}", record.source);
    }

    if let Ok(raw) = serde_json::to_string_pretty(record) {
        let _ = write!(out, "\n\n📱 Raw Data:\n{raw}");
    }

    out
}
