//! Summary metrics over the filtered event set.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::EarthquakeEvent;

/// Magnitude at or above which the dashboard shows a warning banner.
const STRONG_EVENT_THRESHOLD: f64 = 6.0;

/// Summary metrics for one filtered set.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub count: usize,
    pub max_magnitude: f64,
    pub mean_magnitude: f64,
    pub min_depth_km: f64,
    pub max_depth_km: f64,
    pub latest: DateTime<Utc>,
    /// Event counts per magnitude band: `< 4.0`, `4.0..6.0`, `>= 6.0`
    pub magnitude_bands: [usize; 3],
    /// Event counts per depth class: shallow `< 70`, intermediate
    /// `70..=300`, deep `> 300` km
    pub depth_classes: [usize; 3],
}

impl Stats {
    /// Warning text when the filtered set contains a strong event.
    #[must_use]
    pub fn strong_event_warning(&self) -> Option<String> {
        (self.max_magnitude >= STRONG_EVENT_THRESHOLD)
            .then(|| format!("Strong earthquake in view: M {:.1}", self.max_magnitude))
    }
}

/// Compute stats over a filtered set. Returns `None` for an empty set so
/// no reduction ever runs over an empty collection; callers surface that
/// as "no matching events" rather than a row of zeros.
#[must_use]
pub fn compute_stats(events: &[EarthquakeEvent]) -> Option<Stats> {
    let first = events.first()?;

    let mut max_magnitude = first.magnitude;
    let mut magnitude_sum = 0.0;
    let mut min_depth_km = first.depth_km;
    let mut max_depth_km = first.depth_km;
    let mut latest = first.occurred_at;
    let mut magnitude_bands = [0usize; 3];
    let mut depth_classes = [0usize; 3];

    for event in events {
        max_magnitude = max_magnitude.max(event.magnitude);
        magnitude_sum += event.magnitude;
        min_depth_km = min_depth_km.min(event.depth_km);
        max_depth_km = max_depth_km.max(event.depth_km);
        latest = latest.max(event.occurred_at);

        let band = if event.magnitude >= 6.0 {
            2
        } else if event.magnitude >= 4.0 {
            1
        } else {
            0
        };
        magnitude_bands[band] += 1;

        let class = if event.depth_km > 300.0 {
            2
        } else if event.depth_km >= 70.0 {
            1
        } else {
            0
        };
        depth_classes[class] += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean_magnitude = magnitude_sum / events.len() as f64;

    Some(Stats {
        count: events.len(),
        max_magnitude,
        mean_magnitude,
        min_depth_km,
        max_depth_km,
        latest,
        magnitude_bands,
        depth_classes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(minute: u32, magnitude: f64, depth_km: f64) -> EarthquakeEvent {
        EarthquakeEvent {
            occurred_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
            latitude: -6.0,
            longitude: 130.0,
            magnitude,
            depth_km,
            region: "Laut Banda".into(),
            felt_reports: None,
            shakemap_url: None,
            potential: None,
        }
    }

    #[test]
    fn test_empty_set_has_no_stats() {
        assert!(compute_stats(&[]).is_none());
    }

    #[test]
    fn test_summary_metrics() {
        let events = vec![
            event(5, 3.5, 12.0),
            event(30, 6.4, 95.0),
            event(12, 5.1, 340.0),
        ];
        let stats = compute_stats(&events).unwrap();

        assert_eq!(stats.count, 3);
        assert!((stats.max_magnitude - 6.4).abs() < 1e-9);
        assert!((stats.mean_magnitude - 5.0).abs() < 1e-9);
        assert!((stats.min_depth_km - 12.0).abs() < 1e-9);
        assert!((stats.max_depth_km - 340.0).abs() < 1e-9);
        assert_eq!(stats.latest, Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_band_and_class_counts() {
        let events = vec![
            event(0, 3.9, 69.9),
            event(1, 4.0, 70.0),
            event(2, 5.9, 300.0),
            event(3, 6.0, 300.1),
        ];
        let stats = compute_stats(&events).unwrap();

        assert_eq!(stats.magnitude_bands, [1, 2, 1]);
        assert_eq!(stats.depth_classes, [1, 2, 1]);
    }

    #[test]
    fn test_strong_event_warning() {
        let calm = compute_stats(&[event(0, 5.9, 10.0)]).unwrap();
        assert!(calm.strong_event_warning().is_none());

        let strong = compute_stats(&[event(0, 6.0, 10.0)]).unwrap();
        let warning = strong.strong_event_warning().unwrap();
        assert!(warning.contains("6.0"));
    }
}
