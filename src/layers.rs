//! Map layer composition.
//!
//! Derives the marker, heatmap, and shakemap-overlay layers the dashboard
//! paints from a filtered event set and the user's layer toggles. This is
//! pure data: the presentation layer turns it into Leaflet calls.

use serde::Serialize;

use crate::models::EarthquakeEvent;

/// Magnitude band used for marker coloring.
///
/// Bands are closed-open: `< 4.0` low, `[4.0, 6.0)` moderate, `>= 6.0` high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    #[must_use]
    pub fn from_magnitude(magnitude: f64) -> Self {
        if magnitude >= 6.0 {
            Self::High
        } else if magnitude >= 4.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Marker color the dashboard uses for this band.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Moderate => "orange",
            Self::High => "red",
        }
    }
}

/// Which layers the user has switched on.
#[derive(Debug, Clone, Copy)]
pub struct LayerToggles {
    /// Group markers into a spatial cluster container
    pub clustering: bool,
    /// Build the heat-intensity layer
    pub heatmap: bool,
    /// Build the shakemap image overlay
    pub image_overlay: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self {
            clustering: true,
            heatmap: false,
            image_overlay: false,
        }
    }
}

/// One map marker.
#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub depth_km: f64,
    pub region: String,
    pub severity: Severity,
}

/// The marker layer. `clustered` selects the container the markers attach
/// to; it never changes which markers exist.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerLayer {
    pub clustered: bool,
    pub markers: Vec<Marker>,
}

/// One heat-intensity point, weighted by magnitude.
#[derive(Debug, Clone, Serialize)]
pub struct HeatPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub weight: f64,
}

/// Bounding box for the shakemap image, as Leaflet corner pairs.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OverlayBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl OverlayBounds {
    /// Half the box's latitude extent.
    #[must_use]
    pub fn half_extent(&self) -> f64 {
        (self.north - self.south) / 2.0
    }
}

/// The shakemap image overlay layer.
#[derive(Debug, Clone, Serialize)]
pub struct ImageOverlay {
    pub url: String,
    pub bounds: OverlayBounds,
    pub opacity: f64,
    pub magnitude: f64,
}

/// Tunable constants for the overlay footprint heuristic.
///
/// The half-extent grows exponentially with magnitude:
/// `delta = base * growth^magnitude`. This sizes the image to roughly
/// match perceived shaking area; it is not a geophysical model.
#[derive(Debug, Clone, Copy)]
pub struct OverlayScaling {
    pub base: f64,
    pub growth: f64,
}

impl Default for OverlayScaling {
    fn default() -> Self {
        Self { base: 0.05, growth: 1.8 }
    }
}

impl OverlayScaling {
    /// Half-extent in degrees for an event of the given magnitude.
    #[must_use]
    pub fn half_extent(&self, magnitude: f64) -> f64 {
        self.base * self.growth.powf(magnitude)
    }
}

/// Everything the map needs for one render.
#[derive(Debug, Clone, Serialize)]
pub struct LayerSet {
    pub markers: MarkerLayer,
    pub heatmap: Option<Vec<HeatPoint>>,
    pub overlay: Option<ImageOverlay>,
}

/// Default opacity for the shakemap overlay.
const OVERLAY_OPACITY: f64 = 0.7;

/// Compose all map layers from filtered events and toggles.
#[must_use]
pub fn compose_layers(
    events: &[EarthquakeEvent],
    toggles: LayerToggles,
    scaling: OverlayScaling,
) -> LayerSet {
    let markers = MarkerLayer {
        clustered: toggles.clustering,
        markers: events.iter().map(marker_for).collect(),
    };

    let heatmap = toggles.heatmap.then(|| {
        events
            .iter()
            .map(|event| HeatPoint {
                latitude: event.latitude,
                longitude: event.longitude,
                weight: event.magnitude,
            })
            .collect()
    });

    let overlay = if toggles.image_overlay {
        compose_overlay(events, scaling)
    } else {
        None
    };

    LayerSet { markers, heatmap, overlay }
}

fn marker_for(event: &EarthquakeEvent) -> Marker {
    Marker {
        latitude: event.latitude,
        longitude: event.longitude,
        magnitude: event.magnitude,
        depth_km: event.depth_km,
        region: event.region.clone(),
        severity: Severity::from_magnitude(event.magnitude),
    }
}

/// Pick the strongest event that carries an image reference and size the
/// overlay box around it. No qualifying event means no layer.
fn compose_overlay(events: &[EarthquakeEvent], scaling: OverlayScaling) -> Option<ImageOverlay> {
    let strongest = events
        .iter()
        .filter(|event| event.shakemap_url.is_some())
        .max_by(|a, b| a.magnitude.total_cmp(&b.magnitude))?;

    let url = strongest.shakemap_url.clone()?;
    let delta = scaling.half_extent(strongest.magnitude);

    Some(ImageOverlay {
        url,
        bounds: OverlayBounds {
            south: strongest.latitude - delta,
            west: strongest.longitude - delta,
            north: strongest.latitude + delta,
            east: strongest.longitude + delta,
        },
        opacity: OVERLAY_OPACITY,
        magnitude: strongest.magnitude,
    })
}
