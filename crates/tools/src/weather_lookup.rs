//! Weather lookup tool backed by the weatherstack current-conditions API.

use async_trait::async_trait;
use scout_config::{WEATHER_TOOL, WeatherConfig};
use scout_core::error::ToolError;
use scout_core::tool::{Tool, ToolResult, required_str};
use serde::Deserialize;
use tracing::{debug, warn};

/// Returned whenever the lookup cannot produce a reading.
pub const WEATHER_FALLBACK: &str = "Could not retrieve weather data.";

pub struct WeatherLookupTool {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    units: String,
}

impl WeatherLookupTool {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            units: units.into(),
        }
    }

    pub fn from_config(config: &WeatherConfig) -> Self {
        Self::new(
            &config.api_url,
            config.api_key.clone().unwrap_or_default(),
            &config.units,
        )
    }

    /// The request URL carries the access key, so errors are stripped of it.
    async fn fetch(&self, location: &str) -> Result<WeatherResponse, reqwest::Error> {
        self.request(location)
            .await
            .map_err(reqwest::Error::without_url)
    }

    async fn request(&self, location: &str) -> Result<WeatherResponse, reqwest::Error> {
        self.client
            .get(format!("{}/current", self.base_url))
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("query", location),
                ("units", self.units.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    current: Option<CurrentConditions>,
    #[serde(default)]
    error: Option<WeatherApiError>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature: f64,
    #[serde(default)]
    weather_descriptions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WeatherApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    info: Option<String>,
}

fn unit_symbol(units: &str) -> &'static str {
    match units {
        "f" => "°F",
        "s" => "K",
        _ => "°C",
    }
}

#[async_trait]
impl Tool for WeatherLookupTool {
    fn name(&self) -> &str {
        WEATHER_TOOL
    }

    fn description(&self) -> &str {
        "Fetches the current weather conditions (description and temperature) for a specific city or location."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city name or location to look up weather for"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let location = required_str(&arguments, "location")?;

        let response = match self.fetch(location).await {
            Ok(response) => response,
            Err(e) => {
                warn!(location, error = %e, "Weather request failed");
                return Ok(ToolResult::fallback(WEATHER_FALLBACK));
            }
        };

        if let Some(err) = &response.error {
            warn!(location, code = ?err.code, info = ?err.info, "Weather API returned an error");
        }

        let Some(current) = response.current else {
            return Ok(ToolResult::fallback(WEATHER_FALLBACK));
        };
        let Some(description) = current
            .weather_descriptions
            .first()
            .filter(|d| !d.trim().is_empty())
        else {
            return Ok(ToolResult::fallback(WEATHER_FALLBACK));
        };

        let unit = unit_symbol(&self.units);
        debug!(location, temperature = current.temperature, "Weather lookup succeeded");

        Ok(ToolResult::ok(format!(
            "The current weather in {location} is {description} with a temperature of {}{unit}.",
            current.temperature
        ))
        .with_data(serde_json::json!({
            "location": location,
            "description": description,
            "temperature": current.temperature,
            "unit": unit,
        })))
    }
}
