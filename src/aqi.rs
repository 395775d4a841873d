//! AQI classification.
//!
//! Maps a numeric Air Quality Index onto one of six ordered severity tiers
//! and derives an approximate index from a raw PM2.5 concentration.

use serde::{Deserialize, Serialize};

/// Severity tier of an AQI value, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    /// 50 and below.
    Good,
    /// 51 to 100.
    Moderate,
    /// 101 to 150.
    UnhealthySensitive,
    /// 151 to 200.
    Unhealthy,
    /// 201 to 300.
    VeryUnhealthy,
    /// Above 300.
    Hazardous,
}

/// Display tokens for rendering a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiDisplay {
    /// Background color token for the index badge.
    pub color: &'static str,
    /// Text color token for the tier label.
    pub text_color: &'static str,
    /// Glow color token used by the pulsing badge.
    pub pulse_color: &'static str,
}

impl AqiCategory {
    /// Classify an AQI value.
    ///
    /// Total over all integers: values below zero are not rejected and fall
    /// into `Good`.
    pub fn from_aqi(aqi: i64) -> Self {
        if aqi <= 50 {
            AqiCategory::Good
        } else if aqi <= 100 {
            AqiCategory::Moderate
        } else if aqi <= 150 {
            AqiCategory::UnhealthySensitive
        } else if aqi <= 200 {
            AqiCategory::Unhealthy
        } else if aqi <= 300 {
            AqiCategory::VeryUnhealthy
        } else {
            AqiCategory::Hazardous
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    pub fn display(self) -> AqiDisplay {
        let (color, text_color, pulse_color) = match self {
            AqiCategory::Good => ("bg-green-500", "text-green-500", "shadow-green-500/50"),
            AqiCategory::Moderate => ("bg-yellow-500", "text-yellow-500", "shadow-yellow-500/50"),
            AqiCategory::UnhealthySensitive => {
                ("bg-orange-500", "text-orange-500", "shadow-orange-500/50")
            }
            AqiCategory::Unhealthy => ("bg-red-500", "text-red-500", "shadow-red-500/50"),
            AqiCategory::VeryUnhealthy => {
                ("bg-purple-500", "text-purple-500", "shadow-purple-500/50")
            }
            AqiCategory::Hazardous => ("bg-red-700", "text-red-700", "shadow-red-700/50"),
        };

        AqiDisplay {
            color,
            text_color,
            pulse_color,
        }
    }
}

/// PM2.5 breakpoints (µg/m³) and the AQI floor reported at or above each.
///
/// Checked from the top down; anything under the lowest breakpoint is 25.
const PM25_STEPS: [(f64, i64); 6] = [
    (350.5, 401),
    (250.5, 301),
    (150.5, 201),
    (55.5, 151),
    (35.5, 101),
    (12.1, 51),
];

/// AQI reported for concentrations below every breakpoint.
const PM25_BASE_AQI: i64 = 25;

/// Approximate an AQI from a PM2.5 concentration in µg/m³.
///
/// This is a coarse step function, **not** the EPA piecewise-linear
/// interpolation: every concentration inside a band maps to the same floor
/// value. The table is kept as-is so readings match what users have always
/// seen for a given concentration.
///
/// Breakpoints are inclusive lower bounds, so `12.1` yields `51`. `NaN`
/// falls through to the base value.
pub fn aqi_from_pm25(pm25: f64) -> i64 {
    PM25_STEPS
        .iter()
        .find(|(breakpoint, _)| pm25 >= *breakpoint)
        .map(|(_, aqi)| *aqi)
        .unwrap_or(PM25_BASE_AQI)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        let cases = [
            (50, AqiCategory::Good),
            (51, AqiCategory::Moderate),
            (100, AqiCategory::Moderate),
            (101, AqiCategory::UnhealthySensitive),
            (150, AqiCategory::UnhealthySensitive),
            (151, AqiCategory::Unhealthy),
            (200, AqiCategory::Unhealthy),
            (201, AqiCategory::VeryUnhealthy),
            (300, AqiCategory::VeryUnhealthy),
            (301, AqiCategory::Hazardous),
        ];

        for (aqi, expected) in cases {
            assert_eq!(AqiCategory::from_aqi(aqi), expected, "aqi = {aqi}");
        }
    }

    #[test]
    fn test_negative_and_extreme_values() {
        assert_eq!(AqiCategory::from_aqi(-20), AqiCategory::Good);
        assert_eq!(AqiCategory::from_aqi(i64::MIN), AqiCategory::Good);
        assert_eq!(AqiCategory::from_aqi(i64::MAX), AqiCategory::Hazardous);
    }

    #[test]
    fn test_tiers_are_ordered() {
        let mut previous = AqiCategory::from_aqi(-1);
        for aqi in 0..600 {
            let current = AqiCategory::from_aqi(aqi);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_labels_and_tokens() {
        assert_eq!(
            AqiCategory::UnhealthySensitive.label(),
            "Unhealthy for Sensitive Groups"
        );
        assert_eq!(AqiCategory::Good.display().color, "bg-green-500");
        assert_eq!(AqiCategory::Hazardous.display().text_color, "text-red-700");
    }

    #[test]
    fn test_pm25_steps() {
        assert_eq!(aqi_from_pm25(0.0), 25);
        assert_eq!(aqi_from_pm25(12.0), 25);
        assert_eq!(aqi_from_pm25(12.1), 51);
        assert_eq!(aqi_from_pm25(35.4), 51);
        assert_eq!(aqi_from_pm25(35.5), 101);
        assert_eq!(aqi_from_pm25(60.0), 151);
        assert_eq!(aqi_from_pm25(200.0), 201);
        assert_eq!(aqi_from_pm25(300.0), 301);
        assert_eq!(aqi_from_pm25(400.0), 401);
    }

    #[test]
    fn test_pm25_monotonic() {
        let mut previous = aqi_from_pm25(-5.0);
        let mut pm = -5.0;
        while pm < 500.0 {
            let current = aqi_from_pm25(pm);
            assert!(current >= previous, "dropped at {pm}");
            previous = current;
            pm += 0.25;
        }
    }

    #[test]
    fn test_pm25_nan_is_base() {
        assert_eq!(aqi_from_pm25(f64::NAN), 25);
    }
}
