//! Runtime configuration.
//!
//! Built once at startup and handed to every component that talks to the
//! store or an external API. Nothing reads the environment after that.

use std::env;
use std::time::Duration;

use tracing::{info, warn};

use crate::geocode::{BENGALURU, Coordinates};

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:kara.db?mode=rwc";

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_WAQI_BASE_URL: &str = "https://api.waqi.info";
pub const DEFAULT_OPEN_METEO_BASE_URL: &str = "https://air-quality-api.open-meteo.com";

/// Upper bound on any single outbound HTTP request.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Which upstream provides AQI readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiSourceKind {
    /// Pre-aggregated index from the World Air Quality Index project.
    Waqi,
    /// Raw pollutant concentrations from Open-Meteo; AQI is derived locally.
    OpenMeteo,
}

impl AqiSourceKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "waqi" => Some(AqiSourceKind::Waqi),
            "open-meteo" | "open_meteo" | "openmeteo" => Some(AqiSourceKind::OpenMeteo),
            _ => None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,

    /// Key for the generative text API. Requests fail upstream when empty.
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,

    pub aqi_source: AqiSourceKind,
    pub waqi_base_url: String,
    pub waqi_token: String,
    pub open_meteo_base_url: String,

    /// City whose air quality is shown. Not user-selectable.
    pub city: String,
    /// Reference point for readings and map pins.
    pub center: Coordinates,

    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DB_PATH.to_string(),
            gemini_api_key: String::new(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            aqi_source: AqiSourceKind::Waqi,
            waqi_base_url: DEFAULT_WAQI_BASE_URL.to_string(),
            waqi_token: "demo".to_string(),
            open_meteo_base_url: DEFAULT_OPEN_METEO_BASE_URL.to_string(),
            city: "Bengaluru".to_string(),
            center: BENGALURU,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from `KARA_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to defaults; unparsable values are logged and
    /// also fall back.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_or("KARA_PORT", lookup("KARA_PORT"), defaults.port);

        let aqi_source = match lookup("KARA_AQI_SOURCE") {
            Some(value) => AqiSourceKind::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "Unknown KARA_AQI_SOURCE, using waqi");
                defaults.aqi_source
            }),
            None => defaults.aqi_source,
        };

        let center = Coordinates {
            lat: parse_or("KARA_CENTER_LAT", lookup("KARA_CENTER_LAT"), defaults.center.lat),
            lon: parse_or("KARA_CENTER_LON", lookup("KARA_CENTER_LON"), defaults.center.lon),
        };

        let timeout_secs = parse_or(
            "KARA_HTTP_TIMEOUT_SECS",
            lookup("KARA_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        );

        let gemini_api_key = lookup("KARA_GEMINI_API_KEY").unwrap_or_else(|| {
            warn!("KARA_GEMINI_API_KEY not set, AI features will be unavailable");
            String::new()
        });

        Self {
            port,
            database_url: lookup("KARA_DATABASE_URL").unwrap_or_else(|| {
                info!("KARA_DATABASE_URL not set, using default: {DEFAULT_DB_PATH}");
                defaults.database_url
            }),
            gemini_api_key,
            gemini_base_url: lookup("KARA_GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            gemini_model: lookup("KARA_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            aqi_source,
            waqi_base_url: lookup("KARA_WAQI_BASE_URL").unwrap_or(defaults.waqi_base_url),
            waqi_token: lookup("KARA_WAQI_TOKEN").unwrap_or(defaults.waqi_token),
            open_meteo_base_url: lookup("KARA_OPEN_METEO_BASE_URL")
                .unwrap_or(defaults.open_meteo_base_url),
            city: lookup("KARA_CITY").unwrap_or(defaults.city),
            center,
            http_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Shared HTTP client with the configured timeout.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
                reqwest::Client::new()
            })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default");
            default
        }),
        None => default,
    }
}
