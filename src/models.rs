//! Canonical data model for normalized BMKG earthquake records.
//!
//! The raw feed fields are string-typed and partially missing; everything
//! downstream of normalization works with `EarthquakeEvent` only.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single earthquake event after normalization.
///
/// Invariant: `occurred_at`, `latitude`, `longitude`, and `magnitude` were
/// all present and parseable in the raw record, and the coordinates lie in
/// geographic range. Records failing any of that are dropped during
/// normalization. There is no identifier field and no deduplication; the
/// feed order is preserved until an explicit sort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthquakeEvent {
    /// Event time (UTC)
    pub occurred_at: DateTime<Utc>,

    /// Latitude in degrees, within [-90, 90]
    pub latitude: f64,

    /// Longitude in degrees, within [-180, 180]
    pub longitude: f64,

    /// Magnitude value
    pub magnitude: f64,

    /// Depth in kilometers, 0.0 when the feed's free-text depth was
    /// absent or unparsable
    pub depth_km: f64,

    /// Human-readable region description
    pub region: String,

    /// "Dirasakan" felt-report summary, when the source supplies one
    pub felt_reports: Option<String>,

    /// Fully-qualified shakemap image URL, when the source supplies one
    pub shakemap_url: Option<String>,

    /// Tsunami-potential advisory text, when the source supplies one
    pub potential: Option<String>,
}

/// Geographic range check applied when parsing coordinates.
#[must_use]
pub fn in_geographic_range(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geographic_range() {
        assert!(in_geographic_range(-6.12, 130.23));
        assert!(in_geographic_range(90.0, 180.0));
        assert!(!in_geographic_range(91.0, 0.0));
        assert!(!in_geographic_range(0.0, -180.5));
    }
}
