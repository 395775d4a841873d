//! Placeholder geocoding for complaint map pins.
//!
//! There is no real geocoder. A free-text location is hashed and the hash
//! nudges a fixed city center by a fraction of a degree, so the same text
//! always lands on the same spot and every pin stays inside the city.

use serde::{Deserialize, Serialize};

use crate::model::{CategoryStyle, Complaint, ComplaintStatus};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Default map center.
pub const BENGALURU: Coordinates = Coordinates {
    lat: 12.9716,
    lon: 77.5946,
};

/// Largest offset, in degrees, that [`pseudo_coordinates`] adds on either axis.
pub const MAX_OFFSET_DEGREES: f64 = 999.0 / 20000.0;

/// 32-bit rolling hash (`h * 31 + c`) over UTF-16 code units.
///
/// Wrapping arithmetic keeps the value stable across platforms and runs.
pub fn location_hash(location: &str) -> i32 {
    location
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        })
}

/// Derive a stable pseudo-coordinate for `location` near `center`.
///
/// Collisions are possible and harmless.
pub fn pseudo_coordinates(location: &str, center: Coordinates) -> Coordinates {
    let hash = location_hash(location);
    // Signed remainder keeps each offset within (-1000, 1000) / 20000
    let lat_offset = f64::from(hash % 1000) / 20000.0;
    let lon_offset = f64::from((hash >> 8) % 1000) / 20000.0;

    Coordinates {
        lat: center.lat + lat_offset,
        lon: center.lon + lon_offset,
    }
}

/// A complaint pin for the hotspot map.
#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub position: Coordinates,
    pub style: CategoryStyle,
    pub category: String,
    pub description: String,
    pub location: String,
    pub status: ComplaintStatus,
    /// Popup badge classes for `status`.
    pub status_badge: &'static str,
}

/// Build a marker for every complaint in a feed snapshot.
pub fn map_markers(complaints: &[Complaint], center: Coordinates) -> Vec<MapMarker> {
    complaints
        .iter()
        .map(|c| MapMarker {
            id: c.id.clone(),
            position: pseudo_coordinates(&c.location, center),
            style: CategoryStyle::for_category(&c.category),
            category: c.category.clone(),
            description: c.description.clone(),
            location: c.location.clone(),
            status: c.status,
            status_badge: c.status.badge(),
        })
        .collect()
}
