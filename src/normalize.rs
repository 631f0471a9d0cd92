//! Feed normalization: raw BMKG JSON into canonical events.
//!
//! The upstream payloads are loosely typed: numeric fields arrive as strings,
//! coordinates as a single "lat,lon" text field, depth as free text, and the
//! record container under `Infogempa.gempa` is an array for the multi-event
//! feeds but a bare object for the real-time feed. Everything irregular is
//! resolved here, once, so the rest of the crate only sees
//! [`EarthquakeEvent`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::models::{EarthquakeEvent, in_geographic_range};

/// Extensions accepted when a shakemap reference is a bare filename.
const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Convert a decoded feed payload into an ordered event sequence.
///
/// Records that are missing a parseable timestamp, coordinates, or magnitude
/// are dropped individually; a payload whose top-level shape is unrecognized
/// yields an empty sequence. This function never fails: downstream code
/// always sees "no data" instead of a crash.
#[must_use]
pub fn normalize_feed(payload: &Value, asset_base_url: &str) -> Vec<EarthquakeEvent> {
    let records = coalesce_records(payload);
    let total = records.len();

    let events: Vec<EarthquakeEvent> = records
        .into_iter()
        .filter_map(|record| normalize_record(record, asset_base_url))
        .collect();

    if events.len() < total {
        debug!("dropped {} of {} records during normalization", total - events.len(), total);
    }

    events
}

/// Coalesce the `Infogempa.gempa` payload into a record sequence.
///
/// A bare object (single-event source) becomes a one-element sequence; an
/// unrecognized shape becomes an empty one.
fn coalesce_records(payload: &Value) -> Vec<&Value> {
    match payload.get("Infogempa").and_then(|info| info.get("gempa")) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(record @ Value::Object(_)) => vec![record],
        _ => Vec::new(),
    }
}

/// Convert one raw record, or `None` if a required field is unusable.
fn normalize_record(record: &Value, asset_base_url: &str) -> Option<EarthquakeEvent> {
    let fields = record.as_object()?;

    let occurred_at = parse_timestamp(fields.get("DateTime")?)?;
    let (latitude, longitude) = parse_coordinates(fields.get("Coordinates")?)?;
    let magnitude = parse_float(fields.get("Magnitude")?)?;

    // Depth is fail-soft: a missing or unparsable value keeps the record
    // with depth 0.0, unlike the required fields above.
    let depth_km = fields.get("Kedalaman").map_or(0.0, parse_depth_km);

    Some(EarthquakeEvent {
        occurred_at,
        latitude,
        longitude,
        magnitude,
        depth_km,
        region: optional_text(fields.get("Wilayah")).unwrap_or_default(),
        felt_reports: optional_text(fields.get("Dirasakan")),
        shakemap_url: fields
            .get("Shakemap")
            .and_then(|value| normalize_image_ref(value, asset_base_url)),
        potential: optional_text(fields.get("Potensi")),
    })
}

/// Parse the feed timestamp. BMKG emits RFC 3339; older snapshots used a
/// naive "YYYY-MM-DD HH:MM:SS" form, taken as UTC.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a combined "lat,lon" text field, splitting on the first comma.
/// Both halves must be finite floats within geographic range.
fn parse_coordinates(value: &Value) -> Option<(f64, f64)> {
    let (lat_text, lon_text) = value.as_str()?.split_once(',')?;

    let latitude: f64 = lat_text.trim().parse().ok()?;
    let longitude: f64 = lon_text.trim().parse().ok()?;

    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    if !in_geographic_range(latitude, longitude) {
        return None;
    }

    Some((latitude, longitude))
}

/// Parse a float that arrives as either a JSON number or a numeric string.
fn parse_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Extract depth in kilometers from free text such as "10 km".
///
/// Takes the first digit run in the string, matching how the feed formats
/// depth. Anything without digits falls back to 0.0.
fn parse_depth_km(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => first_digit_run(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// First run of ASCII digits in `text`, parsed as a float.
fn first_digit_run(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Normalize a shakemap reference to one optional URL.
///
/// The feeds have carried three shapes over time: a bare filename relative
/// to the asset base, an already-qualified URL, and an object wrapping the
/// filename in an image field. Everything else is treated as "no image".
fn normalize_image_ref(value: &Value, asset_base_url: &str) -> Option<String> {
    match value {
        Value::String(name) => normalize_image_name(name, asset_base_url),
        Value::Object(fields) => fields
            .get("image")
            .or_else(|| fields.get("url"))
            .and_then(|inner| normalize_image_ref(inner, asset_base_url)),
        _ => None,
    }
}

fn normalize_image_name(name: &str, asset_base_url: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    if name.starts_with("http://") || name.starts_with("https://") {
        return Some(name.to_string());
    }

    // Bare filenames are only accepted when they look like an image.
    let lower = name.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Some(format!("{asset_base_url}/{name}"))
    } else {
        None
    }
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
