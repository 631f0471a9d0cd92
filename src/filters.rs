//! Filter state and event filtering/sorting logic.
//!
//! [`FilterState`] is the explicitly-owned value behind the dashboard's
//! filter panel. Its transitions encode three rules: ranges are rebuilt
//! from the dataset whenever the source changes, a degenerate dimension
//! (min == max) never yields an inverted range, and stored bounds are
//! clamped back in when a feed refresh narrows the extrema.

use serde::Serialize;

use crate::client::FeedSource;
use crate::models::EarthquakeEvent;

/// Placeholder magnitude span shown while a feed has no data.
const EMPTY_MAGNITUDE_SPAN: (f64, f64) = (0.0, 10.0);

/// Placeholder depth span (km) shown while a feed has no data.
const EMPTY_DEPTH_SPAN: (f64, f64) = (0.0, 700.0);

/// Sort order for the event table and map popups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Descending event time
    #[default]
    Newest,
    /// Descending magnitude
    StrongestFirst,
    /// Ascending depth
    ShallowestFirst,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::StrongestFirst => "strongest",
            Self::ShallowestFirst => "shallowest",
        }
    }
}

impl serde::Serialize for SortKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" | "time" => Ok(Self::Newest),
            "strongest" | "magnitude" => Ok(Self::StrongestFirst),
            "shallowest" | "depth" => Ok(Self::ShallowestFirst),
            _ => Err(format!("unknown sort key: {s} (expected: newest, strongest, shallowest)")),
        }
    }
}

/// A closed selection interval tied to the extrema of its dataset.
///
/// `lo`/`hi` are what the user selected; `min`/`max` are the dataset
/// bounds the selection lives in. All four always satisfy
/// `min <= lo <= hi <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundedRange {
    pub lo: f64,
    pub hi: f64,
    pub min: f64,
    pub max: f64,
}

impl BoundedRange {
    /// Full-extent range over a dataset span.
    #[must_use]
    pub fn from_extent(min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { lo: min, hi: max, min, max }
    }

    /// Whether the control for this range is adjustable. A degenerate
    /// dataset (min == max) pins the range to that single value.
    #[must_use]
    pub fn is_adjustable(&self) -> bool {
        self.min < self.max
    }

    /// Select a sub-interval, clamped into the dataset bounds. An inverted
    /// request is normalized rather than constructed.
    pub fn select(&mut self, lo: f64, hi: f64) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.lo = lo.clamp(self.min, self.max);
        self.hi = hi.clamp(self.min, self.max);
    }

    /// Re-anchor to new dataset extrema, clamping the stored selection
    /// back into bounds instead of letting it silently match nothing.
    pub fn rebind(&mut self, min: f64, max: f64) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.min = min;
        self.max = max;
        self.lo = self.lo.clamp(min, max);
        self.hi = self.hi.clamp(min, max);
    }

    /// Closed-interval membership: both bounds inclusive.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

/// Current filter selections for one viewing session.
///
/// Created fresh whenever the source changes, mutated only by user
/// interaction, and never persisted across sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    pub source: FeedSource,
    pub magnitude: BoundedRange,
    pub depth: BoundedRange,
    pub sort_key: SortKey,
}

impl FilterState {
    /// Build a full-extent state from a dataset.
    ///
    /// An empty dataset gets the placeholder spans the dashboard shows
    /// with its controls disabled.
    #[must_use]
    pub fn for_events(source: FeedSource, events: &[EarthquakeEvent]) -> Self {
        let (magnitude, depth) = match dataset_extrema(events) {
            Some((mag, depth)) => (
                BoundedRange::from_extent(mag.0, mag.1),
                BoundedRange::from_extent(depth.0, depth.1),
            ),
            None => (
                BoundedRange::from_extent(EMPTY_MAGNITUDE_SPAN.0, EMPTY_MAGNITUDE_SPAN.1),
                BoundedRange::from_extent(EMPTY_DEPTH_SPAN.0, EMPTY_DEPTH_SPAN.1),
            ),
        };

        Self {
            source,
            magnitude,
            depth,
            sort_key: SortKey::default(),
        }
    }

    /// Reconcile the state with the dataset for `source`.
    ///
    /// Switching sources discards every stored range and rebuilds from the
    /// new dataset's extrema; values are never carried over. Staying on the
    /// same source only re-anchors the bounds, so a refresh that narrowed
    /// the extrema clamps the stored selection instead of stranding it.
    pub fn sync(&mut self, source: FeedSource, events: &[EarthquakeEvent]) {
        if self.source != source {
            let sort_key = self.sort_key;
            *self = Self::for_events(source, events);
            self.sort_key = sort_key;
            return;
        }

        if let Some((mag, depth)) = dataset_extrema(events) {
            self.magnitude.rebind(mag.0, mag.1);
            self.depth.rebind(depth.0, depth.1);
        }
    }

    /// Reset both ranges to the full extent of the current dataset.
    pub fn reset_ranges(&mut self, events: &[EarthquakeEvent]) {
        let sort_key = self.sort_key;
        *self = Self::for_events(self.source, events);
        self.sort_key = sort_key;
    }

    fn matches(&self, event: &EarthquakeEvent) -> bool {
        self.magnitude.contains(event.magnitude) && self.depth.contains(event.depth_km)
    }
}

/// Magnitude and depth extrema of a dataset, or `None` when it is empty.
fn dataset_extrema(events: &[EarthquakeEvent]) -> Option<((f64, f64), (f64, f64))> {
    let first = events.first()?;
    let mut mag = (first.magnitude, first.magnitude);
    let mut depth = (first.depth_km, first.depth_km);

    for event in &events[1..] {
        mag.0 = mag.0.min(event.magnitude);
        mag.1 = mag.1.max(event.magnitude);
        depth.0 = depth.0.min(event.depth_km);
        depth.1 = depth.1.max(event.depth_km);
    }

    Some((mag, depth))
}

/// Keep the events whose magnitude and depth lie inside the state's closed
/// intervals, preserving feed order.
#[must_use]
pub fn filter_events(events: &[EarthquakeEvent], state: &FilterState) -> Vec<EarthquakeEvent> {
    events
        .iter()
        .filter(|event| state.matches(event))
        .cloned()
        .collect()
}

/// Sort events in place. The sort is stable, so ties keep feed order.
pub fn sort_events(events: &mut [EarthquakeEvent], key: SortKey) {
    match key {
        SortKey::Newest => events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at)),
        SortKey::StrongestFirst => {
            events.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
        }
        SortKey::ShallowestFirst => {
            events.sort_by(|a, b| a.depth_km.total_cmp(&b.depth_km));
        }
    }
}

/// Apply the state's range predicates and sort order in one step.
///
/// An empty result here means "filtered to zero", which stays distinct
/// from a fetch-level failure: that surfaces as an `Err` upstream before
/// this function ever runs.
#[must_use]
pub fn apply_filters(events: &[EarthquakeEvent], state: &FilterState) -> Vec<EarthquakeEvent> {
    let mut filtered = filter_events(events, state);
    sort_events(&mut filtered, state.sort_key);
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

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
    fn test_identity_filter_keeps_everything() {
        let events = vec![event(0, 3.0, 5.0), event(1, 7.0, 80.0), event(2, 4.5, 33.0)];
        let state = FilterState::for_events(FeedSource::RecentM5, &events);

        let filtered = filter_events(&events, &state);
        assert_eq!(filtered, events);
    }

    #[test]
    fn test_closed_intervals_include_bounds() {
        let events = vec![event(0, 4.0, 10.0), event(1, 6.0, 50.0), event(2, 5.0, 30.0)];
        let mut state = FilterState::for_events(FeedSource::RecentM5, &events);
        state.magnitude.select(4.0, 6.0);
        state.depth.select(10.0, 50.0);

        assert_eq!(filter_events(&events, &state).len(), 3);

        state.magnitude.select(4.0, 5.0);
        let filtered = filter_events(&events, &state);
        assert_eq!(filtered.len(), 2);
        assert!((filtered[0].magnitude - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_source_switch_resets_ranges() {
        // Dataset A spans magnitudes [3.0, 7.0]; the user narrows to (5.0, 6.0).
        let dataset_a = vec![event(0, 3.0, 10.0), event(1, 7.0, 100.0)];
        let mut state = FilterState::for_events(FeedSource::FeltReports, &dataset_a);
        state.magnitude.select(5.0, 6.0);

        // Switching to dataset B with magnitudes [1.0, 4.0] resets to the new
        // extrema, not a clamp of the stale selection.
        let dataset_b = vec![event(0, 1.0, 5.0), event(1, 4.0, 60.0)];
        state.sync(FeedSource::RecentM5, &dataset_b);

        assert_eq!(state.source, FeedSource::RecentM5);
        assert!((state.magnitude.lo - 1.0).abs() < 1e-9);
        assert!((state.magnitude.hi - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_refresh_on_same_source_clamps() {
        let before = vec![event(0, 2.0, 10.0), event(1, 8.0, 200.0)];
        let mut state = FilterState::for_events(FeedSource::FeltReports, &before);
        state.magnitude.select(6.0, 8.0);

        // A refresh narrowed the extrema; the stored selection is pulled
        // back into bounds rather than matching nothing forever.
        let after = vec![event(0, 3.0, 20.0), event(1, 5.0, 90.0)];
        state.sync(FeedSource::FeltReports, &after);

        assert!((state.magnitude.lo - 5.0).abs() < 1e-9);
        assert!((state.magnitude.hi - 5.0).abs() < 1e-9);
        assert!(!filter_events(&after, &state).is_empty());
    }

    #[test]
    fn test_degenerate_dataset_disables_control() {
        let events = vec![event(0, 5.0, 10.0), event(1, 5.0, 25.0)];
        let state = FilterState::for_events(FeedSource::Realtime, &events);

        assert!(!state.magnitude.is_adjustable());
        assert!(state.depth.is_adjustable());
        assert!(state.magnitude.contains(5.0));
        assert!(state.magnitude.lo <= state.magnitude.hi);
    }

    #[test]
    fn test_inverted_selection_is_normalized() {
        let events = vec![event(0, 2.0, 10.0), event(1, 8.0, 200.0)];
        let mut state = FilterState::for_events(FeedSource::RecentM5, &events);

        state.magnitude.select(7.0, 3.0);
        assert!(state.magnitude.lo <= state.magnitude.hi);
        assert!((state.magnitude.lo - 3.0).abs() < 1e-9);
        assert!((state.magnitude.hi - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_dataset_placeholder_spans() {
        let state = FilterState::for_events(FeedSource::Realtime, &[]);
        assert!((state.magnitude.min - 0.0).abs() < 1e-9);
        assert!((state.magnitude.max - 10.0).abs() < 1e-9);
        assert!((state.depth.max - 700.0).abs() < 1e-9);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut events = vec![event(0, 5.0, 10.0), event(2, 4.0, 20.0), event(1, 6.0, 30.0)];
        sort_events(&mut events, SortKey::Newest);

        assert!(events[0].occurred_at > events[1].occurred_at);
        assert!(events[1].occurred_at > events[2].occurred_at);
    }

    #[test]
    fn test_sort_strongest_and_shallowest() {
        let mut events = vec![event(0, 5.0, 30.0), event(1, 6.5, 10.0), event(2, 4.2, 90.0)];

        sort_events(&mut events, SortKey::StrongestFirst);
        assert!((events[0].magnitude - 6.5).abs() < 1e-9);

        sort_events(&mut events, SortKey::ShallowestFirst);
        assert!((events[0].depth_km - 10.0).abs() < 1e-9);
        assert!((events[2].depth_km - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_resort_by_same_key_is_noop() {
        // Equal magnitudes everywhere: a stable re-sort keeps feed order.
        let mut events = vec![event(0, 5.0, 40.0), event(1, 5.0, 10.0), event(2, 5.0, 25.0)];
        let feed_order = events.clone();

        sort_events(&mut events, SortKey::StrongestFirst);
        assert_eq!(events, feed_order);

        let once = {
            let mut v = feed_order.clone();
            sort_events(&mut v, SortKey::ShallowestFirst);
            v
        };
        let twice = {
            let mut v = once.clone();
            sort_events(&mut v, SortKey::ShallowestFirst);
            v
        };
        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_filters_filters_then_sorts() {
        let events = vec![
            event(0, 3.0, 5.0),
            event(1, 5.5, 70.0),
            event(2, 6.8, 15.0),
            event(3, 4.9, 40.0),
        ];
        let mut state = FilterState::for_events(FeedSource::FeltReports, &events);
        state.magnitude.select(4.5, 7.0);
        state.sort_key = SortKey::StrongestFirst;

        let result = apply_filters(&events, &state);
        assert_eq!(result.len(), 3);
        assert!((result[0].magnitude - 6.8).abs() < 1e-9);
        assert!((result[2].magnitude - 4.9).abs() < 1e-9);
    }

    #[test]
    fn test_filtered_to_zero_is_a_valid_state() {
        let events = vec![event(0, 4.0, 10.0), event(1, 5.0, 20.0)];
        let mut state = FilterState::for_events(FeedSource::RecentM5, &events);
        state.depth.select(15.0, 15.0);

        let filtered = apply_filters(&events, &state);
        assert!(filtered.is_empty());
    }
}
