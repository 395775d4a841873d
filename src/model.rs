//! Data models for Kara.
//!
//! Complaints are owned by the document store; this crate only creates them,
//! bumps their upvote counter and reads them back. AQI readings are ephemeral
//! and fetched fresh for every view.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aqi::{AqiCategory, AqiDisplay};
use crate::error::{KaraError, Result};

/// A user-submitted pollution report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    /// Opaque identifier assigned by the store on creation.
    pub id: String,

    /// Anonymous session that created the complaint. Never changes.
    pub user_id: String,

    pub description: String,

    pub location: String,

    /// Free text, usually one of [`KNOWN_CATEGORIES`].
    pub category: String,

    /// Processing status. Only moderators change it after creation.
    pub status: ComplaintStatus,

    /// Endorsement counter. Starts at 0 and only ever grows by 1.
    pub upvotes: i64,

    /// Store-assigned creation time; the feed sort key.
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle status of a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComplaintStatus {
    #[default]
    #[serde(rename = "Received")]
    Received,

    #[serde(rename = "In Review")]
    InReview,

    #[serde(rename = "Action Taken")]
    ActionTaken,
}

impl ComplaintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintStatus::Received => "Received",
            ComplaintStatus::InReview => "In Review",
            ComplaintStatus::ActionTaken => "Action Taken",
        }
    }

    /// Parse the stored string form. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Received" => Some(ComplaintStatus::Received),
            "In Review" => Some(ComplaintStatus::InReview),
            "Action Taken" => Some(ComplaintStatus::ActionTaken),
            _ => None,
        }
    }

    /// Badge display token for the feed.
    pub fn badge(self) -> &'static str {
        match self {
            ComplaintStatus::Received => "bg-blue-500/20 text-blue-300",
            ComplaintStatus::InReview => "bg-yellow-500/20 text-yellow-300",
            ComplaintStatus::ActionTaken => "bg-green-500/20 text-green-300",
        }
    }
}

/// Categories offered by the report form.
pub const KNOWN_CATEGORIES: [&str; 4] = [
    "Waste Burning",
    "Industrial Emissions",
    "Vehicular Smoke",
    "Construction Dust",
];

/// Map marker styling for a complaint category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryStyle {
    pub color: &'static str,
    pub icon: &'static str,
}

impl CategoryStyle {
    pub fn for_category(category: &str) -> Self {
        let (color, icon) = match category {
            "Waste Burning" => ("#ef4444", "🔥"),
            "Industrial Emissions" => ("#a855f7", "🏭"),
            "Vehicular Smoke" => ("#f97316", "🚗"),
            "Construction Dust" => ("#eab308", "🏗️"),
            _ => ("#64748b", "❓"),
        };
        Self { color, icon }
    }
}

/// Fields supplied by the report form.
///
/// `user_id` is optional here because the form can be submitted before the
/// anonymous session exists; [`NewComplaint::validate`] rejects that case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewComplaint {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
}

impl NewComplaint {
    pub fn new(
        user_id: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            user_id: Some(user_id.into()),
            description: description.into(),
            location: location.into(),
            category: category.into(),
        }
    }

    /// Check required fields, returning the author id on success.
    pub fn validate(&self) -> Result<&str> {
        let author = self
            .user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty());

        match author {
            Some(author) if self.has_report_fields() => Ok(author),
            _ => Err(KaraError::Validation("Please fill in all fields.".to_string())),
        }
    }

    /// True when description, location and category are all non-blank.
    pub fn has_report_fields(&self) -> bool {
        !self.description.trim().is_empty()
            && !self.location.trim().is_empty()
            && !self.category.trim().is_empty()
    }
}

/// A single pollutant measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pollutant {
    pub value: f64,
    pub name: String,
}

/// Current air quality for the configured city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiReading {
    pub city: String,
    pub aqi: i64,
    /// Keyed by pollutant code (`pm25`, `pm10`, `o3`).
    #[serde(default)]
    pub pollutants: BTreeMap<String, Pollutant>,
}

impl AqiReading {
    pub fn category(&self) -> AqiCategory {
        AqiCategory::from_aqi(self.aqi)
    }

    pub fn pollutant(&self, code: &str) -> Option<f64> {
        self.pollutants.get(code).map(|p| p.value)
    }
}

/// Response for GET /aqi.
#[derive(Debug, Clone, Serialize)]
pub struct AqiResponse {
    #[serde(flatten)]
    pub reading: AqiReading,
    pub category: AqiCategory,
    pub level: &'static str,
    pub display: AqiDisplay,
}

impl From<AqiReading> for AqiResponse {
    fn from(reading: AqiReading) -> Self {
        let category = reading.category();
        Self {
            reading,
            category,
            level: category.label(),
            display: category.display(),
        }
    }
}

/// An anonymous identity, created once per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymousSession {
    pub user_id: String,
}

/// Response for POST /complaints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Query parameters for GET /complaints.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Restrict the feed to one author ("My Reports").
    pub user_id: Option<String>,
}

/// Request body for PUT /complaints/{id}/status.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ComplaintStatus,
}

/// Filter a feed snapshot down to one author, preserving order.
pub fn my_reports(feed: &[Complaint], user_id: &str) -> Vec<Complaint> {
    feed.iter()
        .filter(|c| c.user_id == user_id)
        .cloned()
        .collect()
}
