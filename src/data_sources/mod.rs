//! External AQI data sources.
//!
//! Readings always describe the single configured city; there is no
//! user-selectable location, no caching and no staleness policy. Every call
//! hits the upstream.
//!
//! # Data Sources
//!
//! - [`waqi`]: World Air Quality Index, a pre-aggregated index per city
//! - [`open_meteo`]: Open-Meteo raw concentrations, converted locally
//!
//! [`gemini`] is the generative text endpoint used by [`crate::assistant`].

pub mod gemini;
pub mod open_meteo;
pub mod waqi;

pub use gemini::GeminiClient;
pub use open_meteo::OpenMeteoClient;
pub use waqi::WaqiClient;

use crate::config::{AqiSourceKind, Config};
use crate::error::Result;
use crate::geocode::Coordinates;
use crate::model::AqiReading;

/// The configured AQI upstream.
#[derive(Clone)]
pub enum AqiSource {
    Waqi { client: WaqiClient, city: String },
    OpenMeteo {
        client: OpenMeteoClient,
        city: String,
        at: Coordinates,
    },
}

impl AqiSource {
    pub fn from_config(config: &Config) -> Self {
        let http = config.http_client();
        match config.aqi_source {
            AqiSourceKind::Waqi => AqiSource::Waqi {
                client: WaqiClient::with_base_url(http, &config.waqi_base_url, &config.waqi_token),
                city: config.city.clone(),
            },
            AqiSourceKind::OpenMeteo => AqiSource::OpenMeteo {
                client: OpenMeteoClient::with_base_url(http, &config.open_meteo_base_url),
                city: config.city.clone(),
                at: config.center,
            },
        }
    }

    /// Fetch a fresh reading.
    pub async fn fetch_reading(&self) -> Result<AqiReading> {
        match self {
            AqiSource::Waqi { client, city } => client.fetch_city(city).await,
            AqiSource::OpenMeteo { client, city, at } => client.fetch(city, *at).await,
        }
    }
}
