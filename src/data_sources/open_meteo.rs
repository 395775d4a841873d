//! Open-Meteo air quality client.
//!
//! Open-Meteo returns hourly raw pollutant concentrations for a coordinate.
//! There is no index in the response, so the AQI is derived from PM2.5 with
//! [`aqi_from_pm25`].
//!
//! # API Reference
//!
//! See: <https://open-meteo.com/en/docs/air-quality-api>

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::aqi::aqi_from_pm25;
use crate::error::{KaraError, Result};
use crate::geocode::Coordinates;
use crate::model::{AqiReading, Pollutant};

/// Client for the Open-Meteo air quality API.
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    /// Create a client against `base_url` (`KARA_OPEN_METEO_BASE_URL`).
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the latest hourly concentrations at `at` and label them `city`.
    pub async fn fetch(&self, city: &str, at: Coordinates) -> Result<AqiReading> {
        let url = format!(
            "{}/v1/air-quality?latitude={}&longitude={}&hourly=pm10,pm2_5,ozone",
            self.base_url, at.lat, at.lon
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Open-Meteo responded with an error");
            return Err(KaraError::UpstreamApi(format!(
                "Open-Meteo returned status {status}"
            )));
        }

        let body = response.text().await?;
        let reading = parse_hourly(city, &body)?;
        debug!(city = %reading.city, aqi = reading.aqi, "Open-Meteo reading fetched");
        Ok(reading)
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
    #[serde(default)]
    hourly: Option<HourlySeries>,
}

/// Hourly series. Entries can be `null` for hours without data.
#[derive(Debug, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    pm2_5: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pm10: Option<Vec<Option<f64>>>,
    #[serde(default)]
    ozone: Option<Vec<Option<f64>>>,
}

fn first_value(series: &Option<Vec<Option<f64>>>) -> Option<f64> {
    series.as_ref().and_then(|values| values.first().copied().flatten())
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Validate and convert a raw response body.
pub(crate) fn parse_hourly(city: &str, body: &str) -> Result<AqiReading> {
    let response: AirQualityResponse = serde_json::from_str(body)
        .map_err(|e| KaraError::Parse(format!("Open-Meteo response: {e}")))?;

    let hourly = response
        .hourly
        .ok_or_else(|| KaraError::UpstreamApi("No AQI data found in the response.".to_string()))?;

    let pm25 = first_value(&hourly.pm2_5)
        .ok_or_else(|| KaraError::UpstreamApi("No AQI data found in the response.".to_string()))?;

    let mut pollutants = BTreeMap::new();
    pollutants.insert(
        "pm25".to_string(),
        Pollutant {
            value: one_decimal(pm25),
            name: "PM2.5".to_string(),
        },
    );
    if let Some(pm10) = first_value(&hourly.pm10) {
        pollutants.insert(
            "pm10".to_string(),
            Pollutant {
                value: one_decimal(pm10),
                name: "PM10".to_string(),
            },
        );
    }
    if let Some(ozone) = first_value(&hourly.ozone) {
        pollutants.insert(
            "o3".to_string(),
            Pollutant {
                value: one_decimal(ozone),
                name: "Ozone".to_string(),
            },
        );
    }

    Ok(AqiReading {
        city: city.to_string(),
        aqi: aqi_from_pm25(pm25),
        pollutants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::{Json, Router, routing::get};
    use serde_json::json;

    use crate::testing::spawn_stub;

    #[test]
    fn test_parse_hourly_derives_aqi() {
        let body = r#"{
            "latitude": 12.97,
            "longitude": 77.59,
            "hourly": {
                "time": ["2024-01-15T00:00", "2024-01-15T01:00"],
                "pm2_5": [38.26, 40.1],
                "pm10": [61.04, 62.0],
                "ozone": [22.0, 25.0]
            }
        }"#;

        let reading = parse_hourly("Bengaluru", body).unwrap();
        assert_eq!(reading.city, "Bengaluru");
        assert_eq!(reading.aqi, 101);
        assert_eq!(reading.pollutant("pm25"), Some(38.3));
        assert_eq!(reading.pollutant("pm10"), Some(61.0));
        assert_eq!(reading.pollutant("o3"), Some(22.0));
    }

    #[test]
    fn test_parse_hourly_without_pm25_is_upstream_error() {
        let body = r#"{"hourly": {"pm10": [10.0]}}"#;
        assert!(matches!(
            parse_hourly("Bengaluru", body),
            Err(KaraError::UpstreamApi(_))
        ));

        let body = r#"{"hourly": {"pm2_5": [null]}}"#;
        assert!(matches!(
            parse_hourly("Bengaluru", body),
            Err(KaraError::UpstreamApi(_))
        ));

        assert!(matches!(
            parse_hourly("Bengaluru", "{}"),
            Err(KaraError::UpstreamApi(_))
        ));
    }

    #[test]
    fn test_parse_hourly_optional_series() {
        let body = r#"{"hourly": {"pm2_5": [5.0]}}"#;
        let reading = parse_hourly("Bengaluru", body).unwrap();
        assert_eq!(reading.aqi, 25);
        assert_eq!(reading.pollutants.len(), 1);
    }

    #[test]
    fn test_parse_hourly_malformed() {
        assert!(matches!(
            parse_hourly("Bengaluru", "not json"),
            Err(KaraError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_over_http() {
        let app = Router::new().route(
            "/v1/air-quality",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["latitude"], "12.9716");
                assert_eq!(params["hourly"], "pm10,pm2_5,ozone");
                Json(json!({"hourly": {"pm2_5": [20.0], "pm10": [20.0]}}))
            }),
        );
        let base = spawn_stub(app).await;

        let client = OpenMeteoClient::with_base_url(reqwest::Client::new(), &base);
        let at = Coordinates {
            lat: 12.9716,
            lon: 77.5946,
        };
        let reading = client.fetch("Bengaluru", at).await.unwrap();
        assert_eq!(reading.aqi, 51);
        assert_eq!(reading.pollutant("pm10"), Some(20.0));
    }
}
