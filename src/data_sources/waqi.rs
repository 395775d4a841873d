//! World Air Quality Index (WAQI) client.
//!
//! WAQI publishes a pre-aggregated AQI per monitoring city along with
//! individual pollutant sub-indices.
//!
//! # API Reference
//!
//! See: <https://aqicn.org/json-api/doc/>

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{KaraError, Result};
use crate::model::{AqiReading, Pollutant};

/// Client for the WAQI city feed.
#[derive(Clone)]
pub struct WaqiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl WaqiClient {
    /// Create a client against `base_url` (`KARA_WAQI_BASE_URL`).
    pub fn with_base_url(client: reqwest::Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Fetch the current reading for `city`.
    ///
    /// # Errors
    ///
    /// - `UpstreamApi` if the request fails, returns a non-success status, or
    ///   the feed reports a status other than `"ok"`.
    /// - `Parse` if the body does not match the feed schema.
    pub async fn fetch_city(&self, city: &str) -> Result<AqiReading> {
        let url = format!(
            "{}/feed/{}/?token={}",
            self.base_url,
            urlencoding::encode(&city.to_lowercase()),
            urlencoding::encode(&self.token)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "WAQI responded with an error");
            return Err(KaraError::UpstreamApi(format!("WAQI returned status {status}")));
        }

        let body = response.text().await?;
        let reading = parse_feed(&body)?;
        debug!(city = %reading.city, aqi = reading.aqi, "WAQI reading fetched");
        Ok(reading)
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Envelope returned by `/feed/{city}/`.
///
/// On failure `data` is a plain error string, so it is kept untyped until
/// `status` has been checked.
#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    status: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    aqi: i64,
    city: FeedCity,
    #[serde(default)]
    iaqi: BTreeMap<String, FeedValue>,
}

#[derive(Debug, Deserialize)]
struct FeedCity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FeedValue {
    v: f64,
}

/// Pollutants surfaced in the reading, by WAQI code.
const POLLUTANTS: [(&str, &str); 3] = [("pm25", "PM2.5"), ("pm10", "PM10"), ("o3", "Ozone")];

/// Validate and convert a raw feed body.
pub(crate) fn parse_feed(body: &str) -> Result<AqiReading> {
    let envelope: FeedEnvelope = serde_json::from_str(body)
        .map_err(|e| KaraError::Parse(format!("WAQI envelope: {e}")))?;

    if envelope.status != "ok" {
        let detail = envelope
            .data
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| envelope.data.to_string());
        return Err(KaraError::UpstreamApi(format!("WAQI status '{}': {detail}", envelope.status)));
    }

    let data: FeedData = serde_json::from_value(envelope.data)
        .map_err(|e| KaraError::Parse(format!("WAQI data: {e}")))?;

    let pollutants = POLLUTANTS
        .iter()
        .filter_map(|(code, name)| {
            data.iaqi.get(*code).map(|value| {
                (
                    code.to_string(),
                    Pollutant {
                        value: value.v,
                        name: name.to_string(),
                    },
                )
            })
        })
        .collect();

    Ok(AqiReading {
        city: data.city.name,
        aqi: data.aqi,
        pollutants,
    })
}
